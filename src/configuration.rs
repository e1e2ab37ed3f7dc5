use crate::{error::Result, shutter::ShutterCalibration};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use tracing::*;

/// Use the default config location if no path is provided
pub fn get_configuration(config: Option<PathBuf>) -> Result<AppConfig> {
    let mut settings = config::Config::builder();

    if let Some(config) = config {
        info!("Using configuration from {:?}", config);
        settings = settings.add_source(config::File::from(config));
    } else {
        info!("Using default configuration");
        settings = settings.add_source(config::File::with_name("configuration/settings"));
    }

    settings = settings.add_source(config::Environment::with_prefix("SHUTTER"));

    Ok(settings.build()?.try_deserialize()?)
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to, for example "0.0.0.0:8080".
    pub listen: String,
    /// Seconds for a full bottom-to-top travel.
    pub up_time: u64,
    /// Seconds for a full top-to-bottom travel.
    pub down_time: u64,
    /// Seconds of the flip raise phase, also the lowering seconds per 1.0
    /// of tilt angle.
    pub flip_time: u64,
    pub shutters: Vec<ShutterConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ShutterConfig {
    pub name: String,
    /// Platform specific line spec, a line number string on sysfs platforms.
    pub gpio_up: String,
    pub gpio_down: String,
}

impl AppConfig {
    pub fn calibration(&self) -> ShutterCalibration {
        ShutterCalibration {
            up_travel: Duration::from_secs(self.up_time),
            down_travel: Duration::from_secs(self.down_time),
            flip_raise: Duration::from_secs(self.flip_time),
            flip_tilt: Duration::from_secs(self.flip_time),
        }
    }
}
