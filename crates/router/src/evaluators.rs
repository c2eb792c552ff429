//! Built-in transform and clip evaluators.
//!
//! These cover the defaults a new mapping starts with. Expression
//! evaluation beyond the identity is not provided here.

use contracts::{
    ClipEvaluator, ClipPolicy, ElementFailure, LocalSignal, Mapping, SignalValue,
    TransformEvaluator, IDENTITY_EXPRESSION,
};

/// Passes each element through, converted to the destination type.
///
/// Muted mappings and any expression other than `y=x` fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl TransformEvaluator for IdentityTransform {
    fn transform(
        &self,
        mapping: &Mapping,
        _source: &LocalSignal,
        element: SignalValue,
    ) -> Result<SignalValue, ElementFailure> {
        if mapping.muted {
            return Err(ElementFailure::Muted);
        }
        if !is_identity(&mapping.expression) {
            return Err(ElementFailure::UnsupportedExpression(mapping.expression.clone()));
        }
        Ok(element.cast(mapping.dest_type))
    }
}

fn is_identity(expression: &str) -> bool {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    compact == IDENTITY_EXPRESSION
}

/// Clamps elements to the mapping's `clip_min` / `clip_max` bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundClip;

impl ClipEvaluator for BoundClip {
    fn clip(&self, mapping: &Mapping, element: SignalValue) -> Result<SignalValue, ElementFailure> {
        let min = bound(mapping.clip_min)?;
        let max = bound(mapping.clip_max)?;

        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(ElementFailure::Clip(format!(
                    "clip_min {lo} greater than clip_max {hi}"
                )));
            }
        }

        match element {
            SignalValue::Float32(v) => {
                if !v.is_finite() {
                    return Err(ElementFailure::Clip(format!("non-finite value {v}")));
                }
                let mut out = f64::from(v);
                if let Some(lo) = min {
                    out = out.max(lo);
                }
                if let Some(hi) = max {
                    out = out.min(hi);
                }
                let out = out as f32;
                if !out.is_finite() {
                    return Err(ElementFailure::Clip(
                        "clipped value out of float32 range".to_string(),
                    ));
                }
                Ok(SignalValue::Float32(out))
            }
            SignalValue::Int32(v) => {
                let mut out = v;
                if let Some(lo) = min {
                    out = out.max(int_bound(lo.ceil()));
                }
                if let Some(hi) = max {
                    out = out.min(int_bound(hi.floor()));
                }
                Ok(SignalValue::Int32(out))
            }
        }
    }
}

fn bound(policy: ClipPolicy) -> Result<Option<f64>, ElementFailure> {
    match policy {
        ClipPolicy::None => Ok(None),
        ClipPolicy::Bound(b) if b.is_finite() => Ok(Some(b)),
        ClipPolicy::Bound(b) => Err(ElementFailure::Clip(format!("non-finite bound {b}"))),
    }
}

fn int_bound(b: f64) -> i32 {
    b.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}
