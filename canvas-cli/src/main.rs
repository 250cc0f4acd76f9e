//! Garden CLI entry point.

use clap::Parser;
use garden_cli::{run, CliArgs, CliConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "garden_cli=info,garden_core=info,garden_renderer=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let config = CliConfig::from(args);
    tracing::info!(plan = %config.plan.display(), format = %config.format, "Starting export");

    let summary = run(&config)?;
    tracing::info!(
        elements = summary.elements,
        events = summary.events,
        bytes = summary.bytes,
        pending_sync = ?summary.pending_sync,
        "Done"
    );
    Ok(())
}
