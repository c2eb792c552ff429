//! Blueprint validation
//!
//! Rules:
//! - device name is non-empty
//! - signal names are unique, non-empty and start with `/`
//! - signal and mapping lengths are > 0
//! - destination names are unique, and their hosts non-empty
//! - every mapping names an existing source signal of the same length
//! - every mapping's destination belongs to a configured destination
//! - clip bounds are finite and not inverted

use std::collections::HashSet;

use contracts::{ClipPolicy, ContractError, RoutingBlueprint, SignalName};

/// Validate a RoutingBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    validate_device(blueprint)?;
    validate_signals(blueprint)?;
    validate_destinations(blueprint)?;
    validate_mappings(blueprint)?;
    Ok(())
}

fn validate_device(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    if blueprint.device.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "device.name",
            "device name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_path(field: String, name: &SignalName) -> Result<(), ContractError> {
    if name.is_empty() {
        return Err(ContractError::config_validation(field, "name cannot be empty"));
    }
    if !name.starts_with('/') {
        return Err(ContractError::config_validation(
            field,
            format!("name '{name}' must start with '/'"),
        ));
    }
    Ok(())
}

fn validate_signals(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, signal) in blueprint.signals.iter().enumerate() {
        validate_path(format!("signals[{idx}].name"), &signal.name)?;
        if !seen.insert(&signal.name) {
            return Err(ContractError::config_validation(
                format!("signals[name={}]", signal.name),
                "duplicate signal name",
            ));
        }
        if signal.length == 0 {
            return Err(ContractError::config_validation(
                format!("signals[{}].length", signal.name),
                "length must be > 0",
            ));
        }
    }
    Ok(())
}

fn validate_destinations(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, dest) in blueprint.destinations.iter().enumerate() {
        validate_path(format!("destinations[{idx}].name"), &dest.name)?;
        if !seen.insert(&dest.name) {
            return Err(ContractError::config_validation(
                format!("destinations[name={}]", dest.name),
                "duplicate destination name",
            ));
        }
        if dest.host.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].host", dest.name),
                "host cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_mappings(blueprint: &RoutingBlueprint) -> Result<(), ContractError> {
    let keys: HashSet<_> = blueprint
        .destinations
        .iter()
        .map(|d| d.name.destination_key())
        .collect();

    for (idx, mapping) in blueprint.mappings.iter().enumerate() {
        validate_path(format!("mappings[{idx}].destination"), &mapping.destination)?;

        let source = blueprint.signal(&mapping.source).ok_or_else(|| {
            ContractError::config_validation(
                format!("mappings[{idx}].source"),
                format!("source signal '{}' not found", mapping.source),
            )
        })?;

        if !keys.contains(&mapping.destination.destination_key()) {
            return Err(ContractError::config_validation(
                format!("mappings[{idx}].destination"),
                format!(
                    "no destination configured for '{}'",
                    mapping.destination
                ),
            ));
        }

        if mapping.length == 0 {
            return Err(ContractError::config_validation(
                format!("mappings[{idx}].length"),
                "length must be > 0",
            ));
        }
        if mapping.length != source.length {
            return Err(ContractError::config_validation(
                format!("mappings[{idx}].length"),
                format!(
                    "length mismatch: source '{}' has {}, destination '{}' has {}",
                    source.name, source.length, mapping.destination, mapping.length
                ),
            ));
        }

        for (field, policy) in [("clip_min", mapping.clip_min), ("clip_max", mapping.clip_max)] {
            if let Some(ClipPolicy::Bound(b)) = policy {
                if !b.is_finite() {
                    return Err(ContractError::config_validation(
                        format!("mappings[{idx}].{field}"),
                        format!("bound must be finite, got {b}"),
                    ));
                }
            }
        }

        if let (Some(ClipPolicy::Bound(lo)), Some(ClipPolicy::Bound(hi))) =
            (mapping.clip_min, mapping.clip_max)
        {
            if lo > hi {
                return Err(ContractError::config_validation(
                    format!("mappings[{idx}].clip_min / clip_max"),
                    format!("clip_min ({lo}) must be <= clip_max ({hi})"),
                ));
            }
        }
    }
    Ok(())
}
