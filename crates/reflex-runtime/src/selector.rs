//! Action selector: linear scoring, softmax, deterministic argmax.
//!
//! Weights are initialized from a seeded xorshift PRNG, so two selectors
//! built with the same seed and shape score identically forever. Selection
//! itself never samples: the winner is the argmax of the softmax
//! probabilities, lowest index winning ties.

#[derive(Debug)]
pub struct ActionSelector {
    actions: Vec<String>,
    weights: Vec<f32>,
    feature_dim: usize,
    temperature: f64,
    values: Vec<f32>,
    probs: Vec<f32>,
}

/// Result of one selection step.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub winner: usize,
    pub values: Vec<f32>,
    pub probs: Vec<f32>,
}

impl ActionSelector {
    pub fn new(actions: Vec<String>, feature_dim: usize, temperature: f64, seed: u32) -> Self {
        let n = actions.len();
        let mut weights = vec![0.0f32; n * feature_dim];
        let mut rng = seed as i32;
        for weight in &mut weights {
            rng = xorshift32(rng);
            *weight = (((rng as u32) as f64 / u32::MAX as f64 - 0.5) * 0.1) as f32;
        }
        Self {
            actions,
            weights,
            feature_dim,
            temperature,
            values: vec![0.0; n],
            probs: vec![0.0; n],
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn step(&mut self, features: &[f32]) -> Selection {
        let n = self.actions.len();

        for a in 0..n {
            let base = a * self.feature_dim;
            let mut sum = 0.0f32;
            for j in 0..self.feature_dim {
                sum += self.weights[base + j] * features.get(j).copied().unwrap_or(0.0);
            }
            self.values[a] = sum;
        }

        softmax(&self.values, &mut self.probs, self.temperature);

        let mut winner = 0;
        let mut max_prob = self.probs[0];
        for (a, &p) in self.probs.iter().enumerate().skip(1) {
            if p > max_prob {
                max_prob = p;
                winner = a;
            }
        }

        Selection {
            winner,
            values: self.values.clone(),
            probs: self.probs.clone(),
        }
    }
}

fn softmax(input: &[f32], output: &mut [f32], temperature: f64) {
    let mut max = f64::NEG_INFINITY;
    for &v in input {
        let v = v as f64 / temperature;
        if v > max {
            max = v;
        }
    }
    let mut sum = 0.0;
    for (out, &v) in output.iter_mut().zip(input) {
        let e = (v as f64 / temperature - max).exp();
        *out = e as f32;
        sum += e;
    }
    if sum > 0.0 {
        for out in output.iter_mut() {
            *out = (*out as f64 / sum) as f32;
        }
    }
}

/// 32-bit xorshift with the shift semantics of the reference
/// implementation: wrapping left shifts, arithmetic right shift.
fn xorshift32(state: i32) -> i32 {
    let mut s = state;
    s ^= s.wrapping_shl(13);
    s ^= s >> 17;
    s ^= s.wrapping_shl(5);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn same_seed_selects_identically() {
        let mut a = ActionSelector::new(actions(&["x", "y", "z"]), 8, 1.0, 42);
        let mut b = ActionSelector::new(actions(&["x", "y", "z"]), 8, 1.0, 42);
        let features = [0.3, 0.0, 0.9, 0.1, 0.0, 0.5, 0.2, 0.7];
        assert_eq!(a.step(&features), b.step(&features));
    }

    #[test]
    fn different_seeds_give_different_weights() {
        let mut a = ActionSelector::new(actions(&["x", "y"]), 16, 1.0, 1);
        let mut b = ActionSelector::new(actions(&["x", "y"]), 16, 1.0, 2);
        let features = vec![1.0f32; 16];
        assert_ne!(a.step(&features).values, b.step(&features).values);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let mut sel = ActionSelector::new(actions(&["a", "b", "c", "d"]), 4, 0.7, 9);
        let selection = sel.step(&[0.1, 0.9, 0.4, 0.0]);
        let sum: f32 = selection.probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "got {sum}");
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let mut sel = ActionSelector::new(actions(&["a", "b"]), 4, 1.0, 7);
        // Zero features zero every score; probs tie exactly.
        let selection = sel.step(&[0.0; 4]);
        assert_eq!(selection.winner, 0);
        assert_eq!(selection.probs[0], selection.probs[1]);
    }

    #[test]
    fn winner_tracks_highest_probability() {
        let mut sel = ActionSelector::new(actions(&["a", "b", "c"]), 8, 1.0, 42);
        let selection = sel.step(&[0.5, 1.0, 0.0, 0.3, 0.9, 0.2, 0.6, 0.1]);
        let best = selection
            .probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).expect("finite"))
            .map(|(i, _)| i)
            .expect("non-empty");
        assert_eq!(selection.winner, best);
    }

    #[test]
    fn short_feature_slices_read_as_zero() {
        let mut sel = ActionSelector::new(actions(&["a", "b"]), 8, 1.0, 3);
        let padded = sel.step(&[0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let short = sel.step(&[0.5, 0.5]);
        assert_eq!(padded, short);
    }
}
