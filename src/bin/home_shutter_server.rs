use clap::Parser;
use home_shutter::{
    configuration::get_configuration,
    gpio::{GpioLine, SysfsGpio},
    logging::setup_tracing,
    registry::ShutterRegistry,
    router::Router,
    server::run_server,
};
use std::path::PathBuf;
use tracing::*;

#[derive(Parser, Debug)]
#[command(version, about = "REST controlled roller shutter node")]
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
    info!(
        "Serving {} shutters on {}",
        registry.len(),
        app_config.listen
    );

    let router = Router::new(&registry);
    run_server(&app_config.listen, router).await?;
    Ok(())
}
