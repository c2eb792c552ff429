//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ClipPolicy, RoutingBlueprint, IDENTITY_EXPRESSION};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    device: DeviceInfo,
    signals: Vec<SignalInfo>,
    destinations: Vec<DestinationInfo>,
}

#[derive(Serialize)]
struct DeviceInfo {
    name: String,
    bind_host: String,
    port: u16,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct SignalInfo {
    name: String,
    element_type: String,
    length: usize,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    host: String,
    port: u16,
    mappings: Vec<MappingInfo>,
}

#[derive(Serialize)]
struct MappingInfo {
    source: String,
    destination: String,
    element_type: String,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clip_min: Option<ClipPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clip_max: Option<ClipPolicy>,
    muted: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RoutingBlueprint, args: &InfoArgs) -> ConfigInfo {
    let signals = blueprint
        .signals
        .iter()
        .map(|s| SignalInfo {
            name: s.name.to_string(),
            element_type: s.element_type.to_string(),
            length: s.length,
        })
        .collect();

    let destinations = blueprint
        .destinations
        .iter()
        .map(|d| {
            let key = d.name.destination_key();
            let mappings = blueprint
                .mappings
                .iter()
                .filter(|m| m.destination.destination_key() == key)
                .map(|m| MappingInfo {
                    source: m.source.to_string(),
                    destination: m.destination.to_string(),
                    element_type: m.element_type.to_string(),
                    length: m.length,
                    expression: args.mappings.then(|| {
                        m.expression
                            .clone()
                            .unwrap_or_else(|| IDENTITY_EXPRESSION.to_string())
                    }),
                    clip_min: m.clip_min.filter(|_| args.mappings),
                    clip_max: m.clip_max.filter(|_| args.mappings),
                    muted: m.muted.unwrap_or(false),
                })
                .collect();

            DestinationInfo {
                name: d.name.to_string(),
                host: d.host.clone(),
                port: d.port,
                mappings,
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        device: DeviceInfo {
            name: blueprint.device.name.clone(),
            bind_host: blueprint.device.bind_host.clone(),
            port: blueprint.device.port,
            queue_capacity: blueprint.device.queue_capacity,
        },
        signals,
        destinations,
    }
}

fn describe_clip(policy: Option<ClipPolicy>) -> String {
    match policy.unwrap_or_default() {
        ClipPolicy::None => "none".to_string(),
        ClipPolicy::Bound(b) => format!("bound({b})"),
    }
}

fn print_config_info(blueprint: &RoutingBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  sigroute Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let device = &blueprint.device;
    println!("📍 Device");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", device.name);
    println!("   ├─ Bind: {}:{}", device.bind_host, device.port);
    println!("   └─ Queue capacity: {}", device.queue_capacity);

    println!("\n📶 Signals ({})", blueprint.signals.len());
    for (i, signal) in blueprint.signals.iter().enumerate() {
        let prefix = if i == blueprint.signals.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} ({}, length {})",
            prefix, signal.name, signal.element_type, signal.length
        );
    }

    println!("\n📤 Destinations ({})", blueprint.destinations.len());
    for (i, dest) in blueprint.destinations.iter().enumerate() {
        let is_last = i == blueprint.destinations.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({}:{})", prefix, dest.name, dest.host, dest.port);

        let key = dest.name.destination_key();
        let mappings: Vec<_> = blueprint
            .mappings
            .iter()
            .filter(|m| m.destination.destination_key() == key)
            .collect();

        for (j, m) in mappings.iter().enumerate() {
            let map_prefix = if j == mappings.len() - 1 { "└─" } else { "├─" };
            let muted = if m.muted == Some(true) { " [muted]" } else { "" };
            println!(
                "   {}  {} {} -> {} ({}, length {}){}",
                child_prefix, map_prefix, m.source, m.destination, m.element_type, m.length, muted
            );
            if args.mappings {
                println!(
                    "   {}     expression: {}, clip: [{}, {}]",
                    child_prefix,
                    m.expression.as_deref().unwrap_or(IDENTITY_EXPRESSION),
                    describe_clip(m.clip_min),
                    describe_clip(m.clip_max)
                );
            }
        }
        if mappings.is_empty() {
            println!("   {}  └─ no mappings", child_prefix);
        }
    }

    println!();
}
