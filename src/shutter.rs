use crate::gpio::{GpioError, GpioLine};
use serde::Serialize;
use std::time::Duration;
use tracing::*;

/// Position units of one full travel, top to bottom.
pub const FULL_TRAVEL: f32 = 100.0;

/// Open loop timing constants shared by all shutters of one installation.
///
/// There is no position feedback, travel time is a linear estimate from
/// these durations.
#[derive(Debug, Clone, Copy)]
pub struct ShutterCalibration {
    /// Time of a full bottom-to-top travel.
    pub up_travel: Duration,
    /// Time of a full top-to-bottom travel.
    pub down_travel: Duration,
    /// Fixed raise phase before the slats are tilted.
    pub flip_raise: Duration,
    /// Lowering time per 1.0 of tilt angle.
    pub flip_tilt: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShutterStatus {
    pub name: String,
    pub position: f32,
    pub angle: f32,
}

/// One motorized roller shutter driven through two output lines.
///
/// Position runs from 0 (fully open) to 100 (fully closed) and the slat tilt
/// angle from 0 to 1. Neither is clamped or validated, the model trusts its
/// caller and the physical end stops.
pub struct Shutter {
    name: String,
    up: Box<dyn GpioLine>,
    down: Box<dyn GpioLine>,
    calibration: ShutterCalibration,
    position: f32,
    angle: f32,
}

/// Bounds a pulse scale factor to [0, 1].
///
/// Targets are only checked for parseability, so the factor can be out of
/// range, huge or non finite. `Duration::mul_f32` panics on a non finite or
/// overflowing product, and a worker must never die on a crafted request.
/// A pulse longer than one full travel is pointless anyway, the end stop
/// bounds it physically.
fn pulse_factor(factor: f32) -> f32 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Travel time for a displacement of `units` out of the full 100.
fn travel_duration(full_travel: Duration, units: f32) -> Duration {
    full_travel.mul_f32(pulse_factor(units / FULL_TRAVEL))
}

impl Shutter {
    pub fn new(
        name: String,
        up: Box<dyn GpioLine>,
        down: Box<dyn GpioLine>,
        calibration: ShutterCalibration,
    ) -> Self {
        Self {
            name,
            up,
            down,
            calibration,
            position: 0.0,
            angle: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ShutterStatus {
        ShutterStatus {
            name: self.name.clone(),
            position: self.position,
            angle: self.angle,
        }
    }

    /// Configures both lines as outputs and drives them low.
    pub fn init(&mut self) -> Result<(), GpioError> {
        info!("Initializing GPIO lines of shutter {}", self.name);
        self.up.init()?;
        self.up.set(false)?;
        self.down.init()?;
        self.down.set(false)?;
        Ok(())
    }

    /// Drives the shutter all the way up and zeroes position and angle.
    /// Runs for the full up travel time no matter where the shutter was.
    pub fn reset(&mut self) -> Result<(), GpioError> {
        info!("Moving shutter {} to position 0", self.name);
        self.pulse_up(self.calibration.up_travel)?;
        self.position = 0.0;
        self.angle = 0.0;
        Ok(())
    }

    /// Moves the shutter to the target position, blocking for the whole
    /// travel time. Moving also straightens the slats, so the angle goes
    /// back to 0. A target equal to the current position touches no line
    /// and succeeds with unchanged state.
    ///
    /// Any GPIO failure aborts the remaining phases and leaves position and
    /// angle unchanged. The lines stay wherever they were last commanded,
    /// there is no fail safe return without position feedback.
    pub fn move_to(&mut self, position: f32) -> Result<(), GpioError> {
        if position > self.position {
            info!("Moving shutter {} down to position {}", self.name, position);
            let duration =
                travel_duration(self.calibration.down_travel, position - self.position);
            self.pulse_down(duration)?;
            self.position = position;
            self.angle = 0.0;
        } else if position < self.position {
            info!("Moving shutter {} up to position {}", self.name, position);
            let duration = travel_duration(self.calibration.up_travel, self.position - position);
            self.pulse_up(duration)?;
            self.position = position;
            self.angle = 0.0;
        } else {
            debug!("Not moving shutter {}, already at {}", self.name, position);
        }
        Ok(())
    }

    /// Tilts the slats: a fixed raise phase followed by a lowering phase
    /// proportional to the requested angle, always the full two phase pulse
    /// regardless of the current angle. The stored position is left
    /// untouched, tilting is treated as position neutral.
    // TODO: track the small position change the raise phase causes
    pub fn flip(&mut self, angle: f32) -> Result<(), GpioError> {
        info!("Flipping shutter {} to angle {}", self.name, angle);
        self.down.set(false)?;
        self.up.set(true)?;
        std::thread::sleep(self.calibration.flip_raise);
        self.up.set(false)?;
        self.down.set(true)?;
        // the angle is not validated, only the tilt pulse is bounded
        std::thread::sleep(self.calibration.flip_tilt.mul_f32(pulse_factor(angle)));
        self.down.set(false)?;
        self.angle = angle;
        Ok(())
    }

    fn pulse_up(&mut self, duration: Duration) -> Result<(), GpioError> {
        self.down.set(false)?;
        self.up.set(true)?;
        std::thread::sleep(duration);
        self.up.set(false)
    }

    fn pulse_down(&mut self, duration: Duration) -> Result<(), GpioError> {
        self.up.set(false)?;
        self.down.set(true)?;
        std::thread::sleep(duration);
        self.down.set(false)
    }
}
