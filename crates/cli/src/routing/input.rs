//! Line input: local signal table and the stdin line format.
//!
//! ```text
//! /freq 440.0 220.0      value change
//! ? /freq tag42          query, alias optional
//! # comment
//! ```

use std::collections::HashMap;

use contracts::{LocalSignal, RoutingBlueprint, SignalId, SignalName, SignalVector};

use crate::error::{CliError, Result};

/// Marker that starts a query line
const QUERY_MARKER: &str = "?";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    Value { signal: String, values: Vec<String> },
    Query { signal: String, alias: Option<String> },
    Blank,
}

pub fn parse_line(line: &str) -> Result<InputLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(InputLine::Blank);
    }

    let mut tokens = line.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(InputLine::Blank);
    };

    if first == QUERY_MARKER {
        let signal = tokens
            .next()
            .ok_or_else(|| CliError::invalid_input("query needs a signal name"))?;
        let alias = tokens.next().map(str::to_string);
        if tokens.next().is_some() {
            return Err(CliError::invalid_input("query takes at most one alias"));
        }
        return Ok(InputLine::Query {
            signal: signal.to_string(),
            alias,
        });
    }

    let values: Vec<String> = tokens.map(str::to_string).collect();
    if values.is_empty() {
        return Err(CliError::invalid_input(format!("no values given for '{first}'")));
    }
    Ok(InputLine::Value {
        signal: first.to_string(),
        values,
    })
}

/// Local signals declared by the blueprint, with assigned ids
#[derive(Debug, Default)]
pub struct SignalTable {
    signals: HashMap<SignalName, LocalSignal>,
}

impl SignalTable {
    /// Ids follow declaration order
    pub fn from_blueprint(blueprint: &RoutingBlueprint) -> Self {
        let signals = blueprint
            .signals
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                let signal = LocalSignal::new(
                    SignalId(idx as u32),
                    s.name.clone(),
                    s.element_type,
                    s.length,
                );
                (s.name.clone(), signal)
            })
            .collect();
        Self { signals }
    }

    pub fn get(&self, name: &str) -> Result<&LocalSignal> {
        self.signals
            .get(name)
            .ok_or_else(|| CliError::unknown_signal(name))
    }

    /// Parse textual values for `signal`, which must supply every element.
    pub fn vector<S: AsRef<str>>(&self, signal: &LocalSignal, values: &[S]) -> Result<SignalVector> {
        if values.len() != signal.length {
            return Err(CliError::invalid_input(format!(
                "{} expects {} values, got {}",
                signal.name,
                signal.length,
                values.len()
            )));
        }
        SignalVector::parse(signal.element_type, values.iter().map(AsRef::as_ref))
            .map_err(|e| CliError::invalid_input(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
