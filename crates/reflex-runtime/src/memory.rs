//! Context memory: a ring of decaying feature slots.
//!
//! Writes go round-robin over a fixed number of slots, overwriting the
//! oldest. Every step first decays all occupied slots by `exp(-age/decay)`,
//! then writes the new features, then aggregates all occupied slots into a
//! recency-weighted average. A slot time of zero means "never written".

use crate::types::{ContextState, Payload};

#[derive(Debug)]
pub struct ContextMemory {
    slots: usize,
    decay_ms: f64,
    feature_dim: usize,
    slot_data: Vec<Vec<f32>>,
    slot_times: Vec<f64>,
    slot_meta: Vec<Payload>,
    write_idx: usize,
}

impl ContextMemory {
    pub fn new(slots: u32, decay_ms: f64, feature_dim: usize) -> Self {
        let slots = slots as usize;
        Self {
            slots,
            decay_ms,
            feature_dim,
            slot_data: vec![vec![0.0; feature_dim]; slots],
            slot_times: vec![0.0; slots],
            slot_meta: vec![Payload::new(); slots],
            write_idx: 0,
        }
    }

    /// Decay, write, aggregate. Returns the new context.
    pub fn step(&mut self, features: &[f32], meta: &Payload, now: f64) -> ContextState {
        for i in 0..self.slots {
            let age = now - self.slot_times[i];
            if self.slot_times[i] > 0.0 && age > 0.0 {
                let decay = (-age / self.decay_ms).exp() as f32;
                for value in &mut self.slot_data[i] {
                    *value *= decay;
                }
            }
        }

        // Overwrite merge: the incoming features replace the slot.
        let slot = &mut self.slot_data[self.write_idx];
        let n = features.len().min(self.feature_dim);
        slot[..n].copy_from_slice(&features[..n]);
        for value in &mut slot[n..] {
            *value = 0.0;
        }
        self.slot_times[self.write_idx] = now;
        self.slot_meta[self.write_idx] = meta.clone();
        self.write_idx = (self.write_idx + 1) % self.slots;

        let mut aggregated = vec![0.0f32; self.feature_dim];
        let mut total_weight = 0.0f32;
        for i in 0..self.slots {
            if self.slot_times[i] == 0.0 {
                continue;
            }
            let age = now - self.slot_times[i];
            let w = (-age / self.decay_ms).exp() as f32;
            total_weight += w;
            for (acc, value) in aggregated.iter_mut().zip(&self.slot_data[i]) {
                *acc += value * w;
            }
        }
        if total_weight > 0.0 {
            for value in &mut aggregated {
                *value /= total_weight;
            }
        }

        // Context metadata comes from the most recently written slot.
        let mut latest_meta = &Payload::new();
        let mut latest_time = 0.0;
        for i in 0..self.slots {
            if self.slot_times[i] > latest_time {
                latest_time = self.slot_times[i];
                latest_meta = &self.slot_meta[i];
            }
        }

        ContextState {
            target: latest_meta
                .get("target")
                .map(|v| v.to_text())
                .unwrap_or_default(),
            event_type: latest_meta
                .get("eventType")
                .map(|v| v.to_text())
                .unwrap_or_default(),
            features: aggregated,
            meta: latest_meta.clone(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }
}
