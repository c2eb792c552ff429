//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RoutingBlueprint, IDENTITY_EXPRESSION};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    device: String,
    signal_count: usize,
    destination_count: usize,
    mapping_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        let error = CliError::config_not_found(config_path.clone()).to_string();
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(error),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    device: blueprint.device.name.clone(),
                    signal_count: blueprint.signals.len(),
                    destination_count: blueprint.destinations.len(),
                    mapping_count: blueprint.mappings.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RoutingBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.mappings.is_empty() {
        warnings.push("No mappings configured - values will not be routed".to_string());
    }

    for signal in &blueprint.signals {
        if !blueprint.mappings.iter().any(|m| m.source == signal.name) {
            warnings.push(format!("Signal '{}' is not mapped", signal.name));
        }
    }

    for dest in &blueprint.destinations {
        let key = dest.name.destination_key();
        if !blueprint
            .mappings
            .iter()
            .any(|m| m.destination.destination_key() == key)
        {
            warnings.push(format!("Destination '{}' has no mappings", dest.name));
        }
    }

    for mapping in &blueprint.mappings {
        let target = format!("{} -> {}", mapping.source, mapping.destination);
        if mapping.muted == Some(true) {
            warnings.push(format!("Mapping {target} is muted and will not send"));
        }
        if let Some(expr) = &mapping.expression {
            let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
            if compact != IDENTITY_EXPRESSION {
                warnings.push(format!(
                    "Mapping {target} uses expression '{expr}', only '{IDENTITY_EXPRESSION}' is evaluated"
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Device: {}", summary.device);
            println!("  Signals: {}", summary.signal_count);
            println!("  Destinations: {}", summary.destination_count);
            println!("  Mappings: {}", summary.mapping_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
