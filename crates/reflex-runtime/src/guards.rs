//! Emission guard chain.
//!
//! Guards run in declaration order against a shared history of recently
//! emitted effects; the first guard that refuses wins and records why.
//! `keep_target_rate` participates in configuration but does not gate
//! emission; it is carried for population rate controllers.

use reflex_compiler::ir::GuardIr;
use std::collections::VecDeque;

/// History horizon: records older than this are pruned on record().
const HISTORY_MS: f64 = 5000.0;

/// Window the rate-limit guard counts over.
const RATE_WINDOW_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
struct EffectRecord {
    t: f64,
    action: String,
}

#[derive(Debug)]
pub struct GuardChain {
    configs: Vec<GuardIr>,
    recent_effects: VecDeque<EffectRecord>,
    last_rejection: Option<String>,
}

impl GuardChain {
    pub fn new(configs: Vec<GuardIr>) -> Self {
        Self {
            configs,
            recent_effects: VecDeque::new(),
            last_rejection: None,
        }
    }

    /// Why the last `check` refused, if it did.
    pub fn last_rejection(&self) -> Option<&str> {
        self.last_rejection.as_deref()
    }

    /// Whether `action` may be emitted at time `now`.
    pub fn check(&mut self, action: &str, now: f64) -> bool {
        self.last_rejection = None;

        for guard in &self.configs {
            match guard {
                GuardIr::MaxEffectsPerSec { limit } => {
                    let cutoff = now - RATE_WINDOW_MS;
                    let count = self.recent_effects.iter().filter(|e| e.t > cutoff).count();
                    if count >= *limit as usize {
                        self.last_rejection =
                            Some(format!("max_effects_per_sec ({count}/{limit})"));
                        return false;
                    }
                }
                GuardIr::SuppressRepeats { window_ms } => {
                    let cutoff = now - window_ms;
                    let repeated = self
                        .recent_effects
                        .iter()
                        .any(|e| e.t > cutoff && e.action == action);
                    if repeated {
                        self.last_rejection =
                            Some(format!("suppress_repeats (\"{action}\" within {window_ms}ms)"));
                        return false;
                    }
                }
                GuardIr::KeepTargetRate { .. } => {}
            }
        }

        true
    }

    /// Record an emitted effect and prune history past the horizon.
    pub fn record(&mut self, action: &str, now: f64) {
        self.recent_effects.push_back(EffectRecord {
            t: now,
            action: action.to_owned(),
        });
        let cutoff = now - HISTORY_MS;
        while self
            .recent_effects
            .front()
            .is_some_and(|e| e.t < cutoff)
        {
            self.recent_effects.pop_front();
        }
    }
}
