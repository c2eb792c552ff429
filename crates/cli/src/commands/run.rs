//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::routing::{self, InputLine, RoutingContext, RunStats};

/// Execute the `run` command
pub async fn run_router(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        info!(port, "Overriding bind port from CLI");
        blueprint.device.port = port;
    }
    if let Some(capacity) = args.queue_capacity {
        info!(capacity, "Overriding queue capacity from CLI");
        blueprint.device.queue_capacity = capacity;
    }

    info!(
        device = %blueprint.device.name,
        signals = blueprint.signals.len(),
        destinations = blueprint.destinations.len(),
        mappings = blueprint.mappings.len(),
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let context = routing::build(&blueprint).await?;

    if args.dry_run {
        info!("Dry run mode - routing table built, exiting");
        println!(
            "Routing table ready on {}: {} routers, {} mappings",
            context.local_addr, context.router_count, context.mapping_count
        );
        context.shutdown().await?;
        return Ok(());
    }

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let stats = route_stdin(context, timeout).await?;
    stats.print_summary();

    info!("sigroute finished");
    Ok(())
}

/// Dispatch stdin lines until EOF, Ctrl+C or the timeout.
async fn route_stdin(context: RoutingContext, timeout: Option<Duration>) -> Result<RunStats> {
    let start = Instant::now();
    let mut stats = RunStats::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    info!(local_addr = %context.local_addr, "Reading signal values from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        stats.lines_read += 1;
                        if let Err(e) = handle_line(&context, &line, &mut stats).await {
                            stats.lines_rejected += 1;
                            warn!(error = %e, line = %line, "Input line rejected");
                        }
                    }
                    None => {
                        info!("End of input");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping...");
                break;
            }
            _ = &mut deadline => {
                info!("Run timeout reached");
                break;
            }
        }
    }

    stats.routers = context.shutdown().await?;
    stats.duration = start.elapsed();
    Ok(stats)
}

async fn handle_line(context: &RoutingContext, line: &str, stats: &mut RunStats) -> Result<()> {
    match routing::parse_line(line)? {
        InputLine::Blank => {}
        InputLine::Value { signal, values } => {
            let signal = context.signals.get(&signal)?;
            let vector = context.signals.vector(signal, &values)?;

            let started = Instant::now();
            let report = context.handle.dispatch(signal.clone(), vector).await?;
            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

            stats.dispatch.update(report.sent, report.aborted, latency_ms);
            debug!(
                signal = %signal.name,
                sent = report.sent,
                aborted = report.aborted,
                "Value dispatched"
            );
        }
        InputLine::Query { signal, alias } => {
            let signal = context.signals.get(&signal)?;
            let count = context.handle.send_query(signal.clone(), alias).await?;
            stats.dispatch.record_queries(count);
            println!("{} queries sent for {}", count, signal.name);
        }
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
