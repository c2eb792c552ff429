//! `send` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SendArgs;
use crate::routing;

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let context = routing::build(&blueprint).await?;
    let signal = context.signals.get(&args.signal)?.clone();

    if args.query {
        let count = context
            .handle
            .send_query(signal.clone(), args.alias.clone())
            .await?;
        info!(signal = %signal.name, count, "Queries sent");
        println!("{} queries sent for {}", count, signal.name);
    } else {
        let vector = context.signals.vector(&signal, &args.values)?;
        let report = context.handle.dispatch(signal.clone(), vector).await?;
        info!(
            signal = %signal.name,
            sent = report.sent,
            aborted = report.aborted,
            "Value dispatched"
        );
        println!(
            "{}: {} messages sent, {} mappings aborted",
            signal.name, report.sent, report.aborted
        );
    }

    context.shutdown().await?;
    Ok(())
}
