//! Feature encoder: events in, fixed-width feature vector out.
//!
//! Each feature op claims a contiguous slot range in declaration order:
//! `onehot` claims one slot per known event type (truncated to what fits),
//! `bucket` claims its bin count, `hash` its bucket count, and the scalar
//! ops (`numeric`, `clamp`, `scale`) one slot each. Writes past the
//! configured dimension are dropped; the vector never grows.
//!
//! Only the most recent event of a batch is encoded. An empty batch
//! produces the zero vector and leaves the inter-event clock untouched.

use crate::hash::murmur3_32;
use crate::types::Event;
use reflex_compiler::ir::FeatureOpIr;

/// Seed for the `hash(...)` op; part of the observable encoding.
const HASH_SEED: u32 = 42;

/// Horizon of the `bucket(...)` op: deltas at or past 10s land in the
/// last bin.
const BUCKET_HORIZON_MS: f64 = 10_000.0;

#[derive(Debug)]
pub struct FeatureEncoder {
    dim: usize,
    ops: Vec<FeatureOpIr>,
    event_types: Vec<String>,
    output: Vec<f32>,
    last_event_time: f64,
}

impl FeatureEncoder {
    /// `event_types` is the ordered union of event types this encoder's
    /// input patterns can match; it fixes the onehot slot assignment.
    pub fn new(dim: u32, ops: Vec<FeatureOpIr>, event_types: Vec<String>) -> Self {
        let dim = dim as usize;
        Self {
            dim,
            ops,
            event_types,
            output: vec![0.0; dim],
            last_event_time: 0.0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Encode a tick's event batch at time `now`.
    pub fn encode(&mut self, events: &[Event], now: f64) -> &[f32] {
        self.output.fill(0.0);
        let Some(event) = events.last() else {
            return &self.output;
        };

        let mut offset = 0usize;
        for op in &self.ops {
            match op {
                FeatureOpIr::Onehot { .. } => {
                    let slots = self.event_types.len().min(self.dim.saturating_sub(offset));
                    if let Some(idx) = self
                        .event_types
                        .iter()
                        .position(|t| *t == event.event_type)
                    {
                        if idx < slots {
                            self.output[offset + idx] = 1.0;
                        }
                    }
                    offset += slots;
                }
                FeatureOpIr::Bucket { bins, .. } => {
                    let bins = *bins as usize;
                    // A zero-width op claims no slots and writes nothing.
                    if bins == 0 {
                        continue;
                    }
                    let dt = now - self.last_event_time;
                    let normalized = (dt / BUCKET_HORIZON_MS).min(1.0);
                    let bucket = ((normalized * bins as f64) as usize).min(bins - 1);
                    if offset + bucket < self.dim {
                        self.output[offset + bucket] = 1.0;
                    }
                    offset += bins;
                }
                FeatureOpIr::Hash { field, buckets } => {
                    let buckets = *buckets as usize;
                    if buckets == 0 {
                        continue;
                    }
                    let value = event
                        .payload
                        .get(field)
                        .or_else(|| event.payload.get("target"))
                        .map(|v| v.to_text())
                        .unwrap_or_default();
                    let idx = murmur3_32(&value, HASH_SEED) as usize % buckets;
                    if offset + idx < self.dim {
                        self.output[offset + idx] = 1.0;
                    }
                    offset += buckets;
                }
                FeatureOpIr::Numeric { field } => {
                    let val = field_value(event, field);
                    if offset < self.dim {
                        // Squash to (-1, 1).
                        self.output[offset] = (val / (1.0 + val.abs())) as f32;
                    }
                    offset += 1;
                }
                FeatureOpIr::Clamp { field, min, max } => {
                    let val = field_value(event, field).clamp(*min, *max);
                    if offset < self.dim {
                        self.output[offset] = val as f32;
                    }
                    offset += 1;
                }
                FeatureOpIr::Scale { field, factor } => {
                    let val = field_value(event, field) * factor;
                    if offset < self.dim {
                        self.output[offset] = val as f32;
                    }
                    offset += 1;
                }
            }
        }

        self.last_event_time = now;
        &self.output
    }
}

fn field_value(event: &Event, field: &str) -> f64 {
    event.payload.get(field).map(|v| v.as_f64()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_compiler::ir::FeatureOpIr;

    fn types(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn onehot_marks_the_event_type_slot() {
        let mut enc = FeatureEncoder::new(
            8,
            vec![FeatureOpIr::Onehot {
                field: "type".into(),
            }],
            types(&["click", "keydown", "scroll"]),
        );
        let out = enc.encode(&[Event::new("Ui", "keydown", 10.0)], 10.0);
        assert_eq!(&out[..4], &[0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_event_type_encodes_nothing() {
        let mut enc = FeatureEncoder::new(
            8,
            vec![FeatureOpIr::Onehot {
                field: "type".into(),
            }],
            types(&["click"]),
        );
        let out = enc.encode(&[Event::new("Ui", "hover", 10.0)], 10.0);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn only_most_recent_event_is_encoded() {
        let mut enc = FeatureEncoder::new(
            4,
            vec![FeatureOpIr::Onehot {
                field: "type".into(),
            }],
            types(&["click", "keydown"]),
        );
        let batch = [
            Event::new("Ui", "click", 1.0),
            Event::new("Ui", "keydown", 2.0),
        ];
        let out = enc.encode(&batch, 5.0);
        assert_eq!(&out[..2], &[0.0, 1.0]);
    }

    #[test]
    fn empty_batch_yields_zero_vector_and_keeps_clock() {
        let mut enc = FeatureEncoder::new(
            4,
            vec![FeatureOpIr::Bucket {
                field: "t".into(),
                bins: 4,
            }],
            vec![],
        );
        // Establish a last-event time at t=1000.
        enc.encode(&[Event::new("Ui", "click", 1000.0)], 1000.0);
        let out = enc.encode(&[], 9000.0).to_vec();
        assert!(out.iter().all(|&v| v == 0.0));

        // The clock was not advanced by the empty batch: the next delta is
        // still measured from t=1000 (8500ms -> bin 3 of 4 over 10s).
        let out = enc.encode(&[Event::new("Ui", "click", 9500.0)], 9500.0);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn bucket_saturates_at_horizon() {
        let mut enc = FeatureEncoder::new(
            8,
            vec![FeatureOpIr::Bucket {
                field: "t".into(),
                bins: 8,
            }],
            vec![],
        );
        enc.encode(&[Event::new("Ui", "click", 0.0)], 0.0);
        let out = enc.encode(&[Event::new("Ui", "click", 60_000.0)], 60_000.0);
        assert_eq!(out[7], 1.0);
    }

    #[test]
    fn hash_falls_back_to_target_field() {
        let op = vec![FeatureOpIr::Hash {
            field: "key".into(),
            buckets: 16,
        }];
        let mut enc = FeatureEncoder::new(16, op.clone(), vec![]);
        let by_target = enc
            .encode(
                &[Event::new("Ui", "click", 1.0).with_field("target", "button")],
                1.0,
            )
            .to_vec();

        let mut enc2 = FeatureEncoder::new(16, op, vec![]);
        let by_key = enc2
            .encode(
                &[Event::new("Ui", "click", 1.0).with_field("key", "button")],
                1.0,
            )
            .to_vec();
        assert_eq!(by_target, by_key);
        assert_eq!(by_target.iter().filter(|&&v| v == 1.0).count(), 1);
    }

    #[test]
    fn scalar_ops_write_in_declaration_order() {
        let mut enc = FeatureEncoder::new(
            3,
            vec![
                FeatureOpIr::Numeric { field: "x".into() },
                FeatureOpIr::Clamp {
                    field: "x".into(),
                    min: 0.0,
                    max: 1.0,
                },
                FeatureOpIr::Scale {
                    field: "x".into(),
                    factor: 0.5,
                },
            ],
            vec![],
        );
        let out = enc.encode(&[Event::new("Ui", "move", 1.0).with_field("x", 3.0)], 1.0);
        assert_eq!(out[0], (3.0 / 4.0) as f32);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[2], 1.5);
    }

    #[test]
    fn zero_width_ops_claim_no_slots() {
        let mut enc = FeatureEncoder::new(
            4,
            vec![
                FeatureOpIr::Hash {
                    field: "target".into(),
                    buckets: 0,
                },
                FeatureOpIr::Bucket {
                    field: "t".into(),
                    bins: 0,
                },
                FeatureOpIr::Onehot {
                    field: "type".into(),
                },
            ],
            types(&["click"]),
        );
        let out = enc.encode(
            &[Event::new("Ui", "click", 1.0).with_field("target", "x")],
            1.0,
        );
        // The degenerate hash and bucket ops are skipped; onehot still
        // starts at offset 0.
        assert_eq!(out[0], 1.0);
        assert!(out[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn ops_past_the_dimension_are_dropped() {
        let mut enc = FeatureEncoder::new(
            2,
            vec![
                FeatureOpIr::Onehot {
                    field: "type".into(),
                },
                FeatureOpIr::Numeric { field: "x".into() },
            ],
            types(&["click", "keydown", "scroll"]),
        );
        // Onehot truncates to the 2 available slots; numeric lands outside
        // and is dropped without panicking.
        let out = enc.encode(
            &[Event::new("Ui", "scroll", 1.0).with_field("x", 5.0)],
            1.0,
        );
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
