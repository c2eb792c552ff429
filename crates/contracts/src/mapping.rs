//! Mapping - one directed source→destination transform edge.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ElementType, LocalSignal, SignalId, SignalName};

/// Identity expression applied by new mappings.
pub const IDENTITY_EXPRESSION: &str = "y=x";

/// Mapping identifier, unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MappingId(pub u64);

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

/// Mapping mode. Opaque to routing; carried for the expression layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    #[default]
    Undefined,
    UserDefined,
}

/// Clipping policy for one side of the output range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipPolicy {
    /// Pass values through unchanged
    #[default]
    None,
    /// Clamp to the given bound
    Bound(f64),
}

/// A mapping from one local signal to one remote destination signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: MappingId,

    pub src_signal: SignalId,
    pub src_name: SignalName,
    pub src_type: ElementType,
    pub src_length: usize,

    pub dest_name: SignalName,
    pub dest_type: ElementType,
    pub dest_length: usize,

    /// Transform expression, opaque to routing
    pub expression: String,
    pub clip_min: ClipPolicy,
    pub clip_max: ClipPolicy,
    pub muted: bool,
    pub mode: MappingMode,
}

impl Mapping {
    /// Create a mapping with default properties (identity expression,
    /// no clipping, unmuted, undefined mode).
    ///
    /// Length compatibility is checked by the router before calling this.
    pub fn new(
        id: MappingId,
        source: &LocalSignal,
        dest_name: impl Into<SignalName>,
        dest_type: ElementType,
        dest_length: usize,
    ) -> Self {
        Self {
            id,
            src_signal: source.id,
            src_name: source.name.clone(),
            src_type: source.element_type,
            src_length: source.length,
            dest_name: dest_name.into(),
            dest_type,
            dest_length,
            expression: IDENTITY_EXPRESSION.to_string(),
            clip_min: ClipPolicy::None,
            clip_max: ClipPolicy::None,
            muted: false,
            mode: MappingMode::Undefined,
        }
    }

    /// Apply a property update. Only the fields present in `update` are
    /// written.
    pub fn apply(&mut self, update: MappingUpdate) {
        if let Some(expression) = update.expression {
            self.expression = expression;
        }
        if let Some(clip_min) = update.clip_min {
            self.clip_min = clip_min;
        }
        if let Some(clip_max) = update.clip_max {
            self.clip_max = clip_max;
        }
        if let Some(muted) = update.muted {
            self.muted = muted;
        }
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
    }
}

/// Property-update request for an existing mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingUpdate {
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

impl MappingUpdate {
    pub fn is_empty(&self) -> bool {
        self.expression.is_none()
            && self.clip_min.is_none()
            && self.clip_max.is_none()
            && self.muted.is_none()
            && self.mode.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> LocalSignal {
        LocalSignal::new(SignalId(1), "/freq", ElementType::Float32, 2)
    }

    #[test]
    fn test_new_mapping_defaults() {
        let m = Mapping::new(MappingId(7), &source(), "/dest/x", ElementType::Int32, 2);

        assert_eq!(m.src_name, "/freq");
        assert_eq!(m.src_type, ElementType::Float32);
        assert_eq!(m.dest_name, "/dest/x");
        assert_eq!(m.expression, IDENTITY_EXPRESSION);
        assert_eq!(m.clip_min, ClipPolicy::None);
        assert_eq!(m.clip_max, ClipPolicy::None);
        assert!(!m.muted);
        assert_eq!(m.mode, MappingMode::Undefined);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut m = Mapping::new(MappingId(1), &source(), "/dest/x", ElementType::Float32, 2);
        m.apply(MappingUpdate {
            clip_max: Some(ClipPolicy::Bound(1.0)),
            muted: Some(true),
            ..Default::default()
        });

        assert_eq!(m.clip_max, ClipPolicy::Bound(1.0));
        assert_eq!(m.clip_min, ClipPolicy::None);
        assert!(m.muted);
        assert_eq!(m.expression, IDENTITY_EXPRESSION);
    }

    #[test]
    fn test_clip_policy_serde() {
        let p: ClipPolicy = serde_json::from_str(r#"{"bound": 0.5}"#).unwrap();
        assert_eq!(p, ClipPolicy::Bound(0.5));
        let p: ClipPolicy = serde_json::from_str(r#""none""#).unwrap();
        assert_eq!(p, ClipPolicy::None);
    }
}
