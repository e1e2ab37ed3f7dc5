use crate::{
    configuration::AppConfig,
    error::{Result, ShutterError},
    gpio::{GpioError, GpioLine},
    shutter::{Shutter, ShutterStatus},
};
use crossbeam_channel::{unbounded, Sender};
use std::collections::HashMap;
use tokio::sync::oneshot;

type ActionReply = std::result::Result<ShutterStatus, GpioError>;

enum ShutterCommand {
    Move {
        position: f32,
        reply: oneshot::Sender<ActionReply>,
    },
    Flip {
        angle: f32,
        reply: oneshot::Sender<ActionReply>,
    },
    Reset {
        reply: oneshot::Sender<ActionReply>,
    },
    Status {
        reply: oneshot::Sender<ShutterStatus>,
    },
}

/// Cloneable handle to a shutter worker.
///
/// All commands sent through handles of one shutter are drained in order by
/// the single worker thread that owns it, so concurrent requests cannot
/// interleave pulses or race on position and angle. A command that has been
/// picked up runs to completion even if the requesting side went away, a
/// started pulse cannot be stopped halfway.
#[derive(Debug, Clone)]
pub struct ShutterHandle {
    sender: Sender<ShutterCommand>,
}

impl ShutterHandle {
    pub async fn move_to(&self, position: f32) -> Result<ShutterStatus> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(ShutterCommand::Move { position, reply })
            .map_err(|_| ShutterError::WorkerGone)?;
        Ok(receiver.await.map_err(|_| ShutterError::WorkerGone)??)
    }

    pub async fn flip(&self, angle: f32) -> Result<ShutterStatus> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(ShutterCommand::Flip { angle, reply })
            .map_err(|_| ShutterError::WorkerGone)?;
        Ok(receiver.await.map_err(|_| ShutterError::WorkerGone)??)
    }

    pub async fn reset(&self) -> Result<ShutterStatus> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(ShutterCommand::Reset { reply })
            .map_err(|_| ShutterError::WorkerGone)?;
        Ok(receiver.await.map_err(|_| ShutterError::WorkerGone)??)
    }

    pub async fn status(&self) -> Result<ShutterStatus> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(ShutterCommand::Status { reply })
            .map_err(|_| ShutterError::WorkerGone)?;
        receiver.await.map_err(|_| ShutterError::WorkerGone)
    }
}

fn start_shutter_worker(mut shutter: Shutter) -> Result<ShutterHandle> {
    let (sender, receiver) = unbounded::<ShutterCommand>();
    std::thread::Builder::new()
        .name(format!("shutter-{}", shutter.name()))
        .spawn(move || {
            for command in receiver {
                match command {
                    ShutterCommand::Move { position, reply } => {
                        let result = shutter.move_to(position).map(|()| shutter.status());
                        let _ = reply.send(result);
                    }
                    ShutterCommand::Flip { angle, reply } => {
                        let result = shutter.flip(angle).map(|()| shutter.status());
                        let _ = reply.send(result);
                    }
                    ShutterCommand::Reset { reply } => {
                        let result = shutter.reset().map(|()| shutter.status());
                        let _ = reply.send(result);
                    }
                    ShutterCommand::Status { reply } => {
                        let _ = reply.send(shutter.status());
                    }
                }
            }
        })
        .map_err(ShutterError::WorkerSpawn)?;
    Ok(ShutterHandle { sender })
}

/// Immutable-after-construction mapping from shutter name to worker handle.
pub struct ShutterRegistry {
    shutters: HashMap<String, ShutterHandle>,
}

impl ShutterRegistry {
    /// Builds one shutter per configuration entry and spawns its worker.
    ///
    /// The line resolver is injectable so the registry can be built against
    /// simulated lines in tests. Construction fails fast on duplicate names,
    /// on any line that cannot be resolved or initialized, and on a worker
    /// thread that cannot be spawned.
    pub fn build<F>(config: &AppConfig, mut resolve_line: F) -> Result<Self>
    where
        F: FnMut(&str) -> std::result::Result<Box<dyn GpioLine>, GpioError>,
    {
        let calibration = config.calibration();
        let mut shutters = HashMap::new();
        for entry in &config.shutters {
            if shutters.contains_key(&entry.name) {
                return Err(ShutterError::DuplicateShutterName(entry.name.clone()));
            }
            let up = resolve_line(&entry.gpio_up)?;
            let down = resolve_line(&entry.gpio_down)?;
            let mut shutter = Shutter::new(entry.name.clone(), up, down, calibration);
            shutter.init()?;
            shutters.insert(entry.name.clone(), start_shutter_worker(shutter)?);
        }
        Ok(Self { shutters })
    }

    pub fn get(&self, name: &str) -> Option<&ShutterHandle> {
        self.shutters.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ShutterHandle)> {
        self.shutters.iter()
    }

    pub fn len(&self) -> usize {
        self.shutters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shutters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ShutterConfig;
    use crate::gpio::testing::{transitions, LineRecorder};

    fn test_config(shutters: &[(&str, &str, &str)]) -> AppConfig {
        AppConfig {
            listen: String::from("127.0.0.1:0"),
            up_time: 0,
            down_time: 0,
            flip_time: 0,
            shutters: shutters
                .iter()
                .map(|(name, gpio_up, gpio_down)| ShutterConfig {
                    name: (*name).to_owned(),
                    gpio_up: (*gpio_up).to_owned(),
                    gpio_down: (*gpio_down).to_owned(),
                })
                .collect(),
        }
    }

    fn recording_registry(
        recorder: &LineRecorder,
        shutters: &[(&str, &str, &str)],
    ) -> ShutterRegistry {
        let registry = ShutterRegistry::build(&test_config(shutters), |spec| {
            Ok(Box::new(recorder.line(spec)))
        })
        .unwrap();
        // drop the init transitions
        recorder.clear();
        registry
    }

    #[test]
    fn duplicate_shutter_names_abort_construction() {
        let recorder = LineRecorder::default();
        let config = test_config(&[("living", "17", "27"), ("living", "22", "23")]);
        let result = ShutterRegistry::build(&config, |spec| Ok(Box::new(recorder.line(spec))));
        assert!(
            matches!(result, Err(ShutterError::DuplicateShutterName(name)) if name == "living")
        );
    }

    #[test]
    fn unresolvable_line_spec_aborts_construction() {
        let config = test_config(&[("living", "not-a-line", "27")]);
        let result = ShutterRegistry::build(&config, |spec| {
            Err(GpioError::InvalidLineSpec(spec.to_owned()))
        });
        assert!(matches!(
            result,
            Err(ShutterError::Gpio(GpioError::InvalidLineSpec(_)))
        ));
    }

    #[tokio::test]
    async fn handles_report_status_after_commands() {
        let recorder = LineRecorder::default();
        let registry = recording_registry(&recorder, &[("living", "up", "down")]);
        let handle = registry.get("living").unwrap();

        let status = handle.move_to(50.0).await.unwrap();
        assert_eq!(status.position, 50.0);
        let status = handle.flip(0.4).await.unwrap();
        assert_eq!(status.angle, 0.4);
        assert_eq!(status.position, 50.0);
        let status = handle.reset().await.unwrap();
        assert_eq!(status.position, 0.0);
        assert_eq!(status.angle, 0.0);
    }

    #[tokio::test]
    async fn worker_survives_non_finite_targets() {
        let recorder = LineRecorder::default();
        let registry = recording_registry(&recorder, &[("living", "up", "down")]);
        let handle = registry.get("living").unwrap();

        // an unvalidated target must never unwind the worker, one crafted
        // request would otherwise disable the shutter until restart
        let status = handle.move_to(f32::INFINITY).await.unwrap();
        assert_eq!(status.position, f32::INFINITY);
        let status = handle.flip(f32::INFINITY).await.unwrap();
        assert_eq!(status.angle, f32::INFINITY);

        let status = handle.status().await.unwrap();
        assert_eq!(status.position, f32::INFINITY);
    }

    #[tokio::test]
    async fn concurrent_commands_on_one_shutter_do_not_interleave() {
        let recorder = LineRecorder::default();
        let registry = recording_registry(&recorder, &[("living", "up", "down")]);
        let handle = registry.get("living").unwrap();

        // both requests race for the same shutter, the worker queue forces
        // one complete pulse sequence after the other
        let (first, second) = tokio::join!(handle.move_to(100.0), handle.move_to(0.0));
        assert_eq!(first.unwrap().position, 100.0);
        assert_eq!(second.unwrap().position, 0.0);
        assert_eq!(
            recorder.transitions(),
            transitions(&[
                // full travel down
                ("up", false),
                ("down", true),
                ("down", false),
                // full travel back up
                ("down", false),
                ("up", true),
                ("up", false),
            ])
        );

        let status = handle.status().await.unwrap();
        assert_eq!(status.position, 0.0);
        assert_eq!(status.angle, 0.0);
    }

    #[test]
    fn unknown_names_are_absent() {
        let recorder = LineRecorder::default();
        let registry = recording_registry(&recorder, &[("living", "up", "down")]);
        assert!(registry.get("kitchen").is_none());
        assert_eq!(registry.len(), 1);
    }
}
