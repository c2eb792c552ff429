//! Dispatch pipeline: receive → transform → clip → send
//!
//! Every mapping of a changed signal is evaluated element by element.
//! A mapping whose elements all succeed is sent as one message; a single
//! failing element discards that mapping's vector for this event. Sibling
//! mappings are unaffected.

use std::sync::Arc;

use tracing::trace;

use contracts::{
    ClipEvaluator, ElementFailure, LocalSignal, Mapping, SignalVector, TransformEvaluator,
};

use crate::evaluators::{BoundClip, IdentityTransform};
use crate::router::{DestinationRouter, SignalDescriptor};

/// Outcome of dispatching one value change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Mappings whose vector was handed to the transport
    pub sent: usize,
    /// Mappings discarded because an element failed
    pub aborted: usize,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.sent += other.sent;
        self.aborted += other.aborted;
    }
}

/// Transform and clip evaluators applied on dispatch
#[derive(Clone)]
pub struct DispatchPipeline {
    transform: Arc<dyn TransformEvaluator>,
    clip: Arc<dyn ClipEvaluator>,
}

impl DispatchPipeline {
    pub fn new(transform: Arc<dyn TransformEvaluator>, clip: Arc<dyn ClipEvaluator>) -> Self {
        Self { transform, clip }
    }

    /// Propagate a value change of `source` through `router`.
    ///
    /// An unmapped signal is a silent no-op.
    pub fn on_signal_value(
        &self,
        router: &DestinationRouter,
        source: &LocalSignal,
        value: &SignalVector,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(entry) = router.entry(source.id) else {
            return report;
        };

        for mapping in entry.mappings() {
            match self.evaluate(mapping, source, value) {
                Ok(output) => {
                    router.send_vector(SignalDescriptor::destination_of(mapping), &output);
                    report.sent += 1;
                }
                Err((index, failure)) => {
                    trace!(
                        router = %router.dest_name(),
                        mapping = %mapping.id,
                        index,
                        reason = %failure,
                        "Mapping discarded"
                    );
                    router.metrics().inc_mappings_aborted();
                    observability::metrics::record_mapping_aborted(router.dest_name().shared());
                    report.aborted += 1;
                }
            }
        }

        report
    }

    /// Evaluate all elements of `mapping`, or return the first failing
    /// index and its failure.
    pub fn evaluate(
        &self,
        mapping: &Mapping,
        source: &LocalSignal,
        value: &SignalVector,
    ) -> Result<SignalVector, (usize, ElementFailure)> {
        let mut output = SignalVector::with_capacity(mapping.dest_type, mapping.dest_length);

        for index in 0..mapping.dest_length {
            let element = value
                .element(index)
                .ok_or(ElementFailure::OutOfRange {
                    index,
                    len: value.len(),
                })
                .map_err(|f| (index, f))?
                .cast(mapping.src_type);

            let transformed = self
                .transform
                .transform(mapping, source, element)
                .map_err(|f| (index, f))?;
            let clipped = self
                .clip
                .clip(mapping, transformed)
                .map_err(|f| (index, f))?;

            output.push(clipped);
        }

        Ok(output)
    }
}

impl Default for DispatchPipeline {
    /// Identity transform with bound clipping
    fn default() -> Self {
        Self::new(Arc::new(IdentityTransform), Arc::new(BoundClip))
    }
}

impl std::fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPipeline").finish_non_exhaustive()
    }
}
