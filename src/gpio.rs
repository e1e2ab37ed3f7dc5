use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug)]
pub enum GpioError {
    #[error("gpio io error")]
    Io(#[from] std::io::Error),
    #[error("invalid gpio line spec {0:?}")]
    InvalidLineSpec(String),
    #[error("unexpected gpio line value {0:?}")]
    UnexpectedValue(char),
    #[error("empty read from gpio value file")]
    EmptyRead,
}

/// A single digital I/O line.
///
/// Implementations are platform specific. The shutter model only relies on
/// this contract, so it can run against a simulated line in tests.
pub trait GpioLine: Send {
    /// Sets up the line for input or output.
    /// Must be called before `set` or `get` are meaningful.
    fn init(&mut self) -> Result<(), GpioError>;
    /// Drives the line to logical high (`true`) or low (`false`).
    /// May cause unexpected results if the line is configured for input.
    fn set(&mut self, state: bool) -> Result<(), GpioError>;
    /// Reads back the logical state of the line.
    fn get(&mut self) -> Result<bool, GpioError>;
}

const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Linux sysfs GPIO line.
///
/// Linux uses a flat interface model with continuous numbering, so the line
/// spec is an unsigned integer referring to a device under /sys/class/gpio/.
/// Which physical pin that is depends on the hardware configuration, usually
/// a system specific block such as ACPI or DeviceTree.
#[derive(Debug)]
pub struct SysfsGpio {
    line: u32,
    output: bool,
}

impl SysfsGpio {
    pub fn new(spec: &str, output: bool) -> Result<Self, GpioError> {
        let line = spec
            .parse::<u32>()
            .map_err(|_| GpioError::InvalidLineSpec(spec.to_owned()))?;
        Ok(Self { line, output })
    }

    fn attribute_path(&self, attribute: &str) -> PathBuf {
        PathBuf::from(format!("{}/gpio{}/{}", SYSFS_GPIO_ROOT, self.line, attribute))
    }
}

impl GpioLine for SysfsGpio {
    fn init(&mut self) -> Result<(), GpioError> {
        debug!(
            "Enabling GPIO line {} as {}",
            self.line,
            if self.output { "output" } else { "input" }
        );
        // exporting an already exported line fails, so best effort only
        let _ = fs::write(format!("{}/export", SYSFS_GPIO_ROOT), self.line.to_string());
        fs::write(
            self.attribute_path("direction"),
            if self.output { "out" } else { "in" },
        )?;
        Ok(())
    }

    fn set(&mut self, state: bool) -> Result<(), GpioError> {
        trace!("Setting GPIO line {} to {}", self.line, u8::from(state));
        fs::write(self.attribute_path("value"), if state { "1" } else { "0" })?;
        Ok(())
    }

    fn get(&mut self) -> Result<bool, GpioError> {
        let raw = fs::read_to_string(self.attribute_path("value"))?;
        match raw.chars().next() {
            Some('0') => Ok(false),
            Some('1') => Ok(true),
            Some(other) => Err(GpioError::UnexpectedValue(other)),
            None => Err(GpioError::EmptyRead),
        }
    }
}
