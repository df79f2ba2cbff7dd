use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result};
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use seawatch_server::{Cli, Config, Feed, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    info!("SeaWatch server {} starting", VERSION);

    let mut config = Config::load(args.config.as_deref()).into_diagnostic()?;
    config.apply_cli(&args);
    log::debug!("Configuration: {:?}", config);

    let feed = Feed::new(&config, args.clock, args.output);
    let input = args.input.clone();

    Toplevel::new(|s| async move {
        s.start(SubsystemBuilder::new("Feed", move |subsys| {
            feed.run(subsys, input)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(1))
    .await
    .into_diagnostic()
}
