use crate::gpio::GpioError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShutterError>;

#[derive(Error, Debug)]
pub enum ShutterError {
    #[error("configuration error")]
    Config(#[from] config::ConfigError),
    #[error("duplicate shutter name {0:?}")]
    DuplicateShutterName(String),
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("failed to spawn shutter worker")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("shutter worker is gone")]
    WorkerGone,
}
