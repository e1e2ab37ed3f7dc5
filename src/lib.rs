pub mod configuration;
pub mod error;
pub mod gpio;
pub mod logging;
pub mod registry;
pub mod router;
pub mod server;
pub mod shutter;
