use clap::Parser;
use home_shutter::{
    configuration::get_configuration,
    gpio::{GpioLine, SysfsGpio},
    logging::setup_tracing,
    registry::ShutterRegistry,
};
use std::path::PathBuf;
use tracing::*;

/// Drives every configured shutter all the way up.
///
/// Handy after a power cut, when the stored positions are gone and the only
/// known reference is the top end stop. Run it while the server is stopped,
/// the two processes would otherwise fight over the lines.
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Path to a settings file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    setup_tracing(opts.verbose);

    let app_config = get_configuration(opts.config)?;
    let registry = ShutterRegistry::build(&app_config, |spec| {
        Ok(Box::new(SysfsGpio::new(spec, true)?) as Box<dyn GpioLine>)
    })?;

    for (name, handle) in registry.iter() {
        match handle.reset().await {
            Ok(status) => info!("Shutter {} is back at position {}", name, status.position),
            Err(err) => error!("Failed to reset shutter {}: {}", name, err),
        }
    }
    Ok(())
}
