//! RoutingBlueprint - Config Loader output
//!
//! Describes the local device, its signals, the remote destinations and the
//! mappings between them.

use serde::{Deserialize, Serialize};

use crate::{ClipPolicy, ElementType, MappingMode, MappingUpdate, SignalName};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Local device settings
    pub device: DeviceConfig,

    /// Local signals that may be mapped
    #[serde(default)]
    pub signals: Vec<SignalConfig>,

    /// Remote peers
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,

    /// Signal → destination mappings
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// Local device: name and the socket queries are sent from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,

    /// Local bind host
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Local bind port (0 = ephemeral)
    #[serde(default)]
    pub port: u16,

    /// Command queue capacity of the routing service
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

/// Local signal definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub name: SignalName,

    #[serde(rename = "type")]
    pub element_type: ElementType,

    /// Vector length, must be > 0
    pub length: usize,
}

/// Remote destination (one router each)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Destination name, e.g. "/synth1"
    pub name: SignalName,
    pub host: String,
    pub port: u16,
}

/// Mapping definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Local source signal name
    pub source: SignalName,

    /// Full destination signal name, e.g. "/synth1/freq"
    pub destination: SignalName,

    #[serde(rename = "type")]
    pub element_type: ElementType,

    pub length: usize,

    #[serde(default)]
    pub expression: Option<String>,

    #[serde(default)]
    pub clip_min: Option<ClipPolicy>,

    #[serde(default)]
    pub clip_max: Option<ClipPolicy>,

    #[serde(default)]
    pub muted: Option<bool>,

    #[serde(default)]
    pub mode: Option<MappingMode>,
}

impl MappingConfig {
    /// Property overrides to apply after the mapping is created.
    pub fn update(&self) -> MappingUpdate {
        MappingUpdate {
            expression: self.expression.clone(),
            clip_min: self.clip_min,
            clip_max: self.clip_max,
            muted: self.muted,
            mode: self.mode,
        }
    }
}

impl RoutingBlueprint {
    pub fn signal(&self, name: &str) -> Option<&SignalConfig> {
        self.signals.iter().find(|s| s.name == name)
    }
}
