//! Compiled program representation.
//!
//! The IR is flat: regions and circuits are dissolved during lowering and
//! their populations become top-level modules named `Scope__Pop`. It
//! serializes to the graph JSON an external inspector consumes, so field
//! names are stable camelCase and enum kinds are part of the format.

use serde::{Deserialize, Serialize};

/// A fully lowered application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppIr {
    pub name: String,
    pub sensors: Vec<SensorIr>,
    pub encoders: Vec<EncoderIr>,
    pub modules: Vec<ModuleIr>,
    pub projections: Vec<ProjectionIr>,
    pub effectors: Vec<EffectorIr>,
    pub runtime: RuntimeIr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorIr {
    pub name: String,
    pub event_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderIr {
    pub name: String,
    pub inputs: Vec<SensorPatternIr>,
    pub dim: u32,
    pub feature_ops: Vec<FeatureOpIr>,
}

/// A lowered input pattern; wildcards are kept as literal `"*"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPatternIr {
    pub sensor: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureOpIr {
    Onehot { field: String },
    Bucket { field: String, bins: u32 },
    Hash { field: String, buckets: u32 },
    Numeric { field: String },
    Clamp { field: String, min: f64, max: f64 },
    Scale { field: String, factor: f64 },
}

/// A runnable module. `Rate` also covers lowered winner-take-all
/// populations; the decision dynamics live in the circuit's synthesized
/// `ActionSelector`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ModuleIr {
    #[serde(rename_all = "camelCase")]
    State {
        name: String,
        slots: u32,
        decay_ms: f64,
        merge: String,
    },
    #[serde(rename_all = "camelCase")]
    Spiking {
        name: String,
        neurons: u32,
        tau_ms: f64,
        refr_ms: f64,
        target_rate: f64,
        inhibition: String,
    },
    #[serde(rename_all = "camelCase")]
    Recurrent {
        name: String,
        neurons: u32,
        dt_ms: f64,
    },
    /// `units` is `-1` when declared as `len(actions)`; the concrete count
    /// lives on the owning circuit's ActionSelector.
    Rate { name: String, units: i32 },
    ActionSelector {
        name: String,
        actions: Vec<String>,
        temperature: f64,
    },
}

impl ModuleIr {
    pub fn name(&self) -> &str {
        match self {
            ModuleIr::State { name, .. }
            | ModuleIr::Spiking { name, .. }
            | ModuleIr::Recurrent { name, .. }
            | ModuleIr::Rate { name, .. }
            | ModuleIr::ActionSelector { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionIr {
    pub from: String,
    pub to: String,
    pub topology: TopologyIr,
    pub init: InitIr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning: Option<LearningIr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologyIr {
    Dense,
    SparseRandom { p: f64, seed: u32 },
    Local { radius: u32 },
    Linear,
    Softmax { temperature: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InitIr {
    Normal { mu: f64, sigma: f64 },
    Uniform { a: f64, b: f64 },
    Constant { c: f64 },
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LearningIr {
    #[serde(rename_all = "camelCase")]
    Hebbian { trace_ms: f64 },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectorIr {
    pub name: String,
    pub bindings: Vec<BindingIr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BindingIr {
    Js { action: String, expr: String },
    Noop { action: String },
}

impl BindingIr {
    pub fn action(&self) -> &str {
        match self {
            BindingIr::Js { action, .. } | BindingIr::Noop { action } => action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeIr {
    pub tick: TickIr,
    pub steps: Vec<StepIr>,
    pub guards: Vec<GuardIr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum TickIr {
    /// Frame-driven: the host calls `tick()` itself.
    #[serde(rename = "RAF")]
    Raf,
    Interval { ms: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepIr {
    Ingest {
        sensors: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Run {
        module: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        dt_ms: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        when: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Emit {
        effector: String,
        from: String,
        winner_only: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardIr {
    MaxEffectsPerSec {
        limit: u32,
    },
    #[serde(rename_all = "camelCase")]
    SuppressRepeats {
        window_ms: f64,
    },
    KeepTargetRate {
        population: String,
        hz: f64,
    },
}
