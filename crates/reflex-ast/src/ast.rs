//! AST node definitions.

use crate::Span;
use reflex_lexer::TimeValue;

/// Top-level application: `app <Name> { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub name: String,
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

/// A top-level declaration inside an `app` block.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Sensor(SensorDecl),
    Encoder(EncoderDecl),
    Region(RegionDecl),
    Circuit(CircuitDecl),
    Modulator(ModulatorDecl),
    Effector(EffectorDecl),
    Runtime(RuntimeDecl),
}

/// `sensor <Name> : events(A, B, C)`
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDecl {
    pub name: String,
    pub event_types: Vec<String>,
    pub span: Span,
}

/// `encoder <Name> { in = [...] out = FeatureVector dim=N policy = { ... } }`
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderDecl {
    pub name: String,
    /// Ordered `(sensor, event)` input patterns.
    pub inputs: Vec<SensorPattern>,
    pub dim: u32,
    /// Ordered feature ops; each claims a slot range in declaration order.
    pub policy: Vec<FeatureOp>,
    pub span: Span,
}

/// One side of a dotted sensor pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternPart {
    /// `*` wildcard.
    Any,
    Named(String),
}

impl PatternPart {
    pub fn as_str(&self) -> &str {
        match self {
            PatternPart::Any => "*",
            PatternPart::Named(s) => s,
        }
    }
}

/// A `<sensor>.<event>` pattern where either side may be `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorPattern {
    pub sensor: PatternPart,
    pub event: PatternPart,
}

/// A feature operation in an encoder policy.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOp {
    Onehot { field: String },
    Bucket { field: String, bins: u32 },
    Hash { field: String, buckets: u32 },
    Numeric { field: String },
    Clamp { field: String, min: f64, max: f64 },
    Scale { field: String, factor: f64 },
}

/// `region <Name> { population* projection* }`
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDecl {
    pub name: String,
    pub populations: Vec<PopulationDecl>,
    pub projections: Vec<ProjectionDecl>,
    pub span: Span,
}

/// A population declaration; exactly five mutually exclusive shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum PopulationDecl {
    /// `state(slots=N, decay=T, merge="mode")`
    State {
        name: String,
        slots: u32,
        decay: TimeValue,
        merge: String,
        span: Span,
    },
    /// `spiking(neurons=N, neuron=LIF(tau=T, refr=T), target_rate=N, inhibition="mode")`
    Spiking {
        name: String,
        neurons: u32,
        tau: TimeValue,
        refr: TimeValue,
        target_rate: f64,
        inhibition: String,
        span: Span,
    },
    /// `recurrent(neurons=N, dt=T)`
    Recurrent {
        name: String,
        neurons: u32,
        dt: TimeValue,
        span: Span,
    },
    /// `rate(units = N | len(Ident))`
    Rate {
        name: String,
        units: UnitCount,
        span: Span,
    },
    /// `winner_take_all(units = N | len(Ident))`
    WinnerTakeAll {
        name: String,
        units: UnitCount,
        span: Span,
    },
}

impl PopulationDecl {
    pub fn name(&self) -> &str {
        match self {
            PopulationDecl::State { name, .. }
            | PopulationDecl::Spiking { name, .. }
            | PopulationDecl::Recurrent { name, .. }
            | PopulationDecl::Rate { name, .. }
            | PopulationDecl::WinnerTakeAll { name, .. } => name,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            PopulationDecl::State { span, .. }
            | PopulationDecl::Spiking { span, .. }
            | PopulationDecl::Recurrent { span, .. }
            | PopulationDecl::Rate { span, .. }
            | PopulationDecl::WinnerTakeAll { span, .. } => span,
        }
    }
}

/// A unit count: literal, or deferred `len(<circuit action list>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitCount {
    Literal(u32),
    /// `len(Ident)` — length of the named circuit's action list.
    LenOf(String),
}

/// `projection <from> -> <to> { topology = ... [weight_init = ...] [rule = ...] }`
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionDecl {
    /// Possibly-dotted qualified name, as written.
    pub from: String,
    pub to: String,
    pub topology: Topology,
    pub weight_init: Option<WeightInit>,
    pub rule: Option<LearningRule>,
    pub span: Span,
}

/// Projection topology expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Topology {
    Dense,
    SparseRandom { p: f64, seed: u32 },
    Local { radius: u32 },
    Linear,
    Softmax { temperature: f64 },
}

/// Projection weight initialization expression.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightInit {
    Normal { mu: f64, sigma: f64 },
    Uniform { a: f64, b: f64 },
    Constant { c: f64 },
}

/// Projection learning rule expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LearningRule {
    Hebbian { trace: TimeValue },
    None,
}

/// `circuit <Name> { actions = [...] ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitDecl {
    pub name: String,
    /// Fixed action-name list.
    pub actions: Vec<String>,
    pub populations: Vec<PopulationDecl>,
    pub projections: Vec<ProjectionDecl>,
    pub modulators: Vec<ModulatorDecl>,
    pub plasticity: Vec<PlasticityDecl>,
    pub span: Span,
}

/// `modulator <Name> { source = reward(from=Pattern, ...) }`
#[derive(Debug, Clone, PartialEq)]
pub struct ModulatorDecl {
    pub name: String,
    /// Reward source patterns; the only source kind in the grammar.
    pub patterns: Vec<SensorPattern>,
    pub span: Span,
}

/// `plasticity <Target> { rule = <Ident> [(k=v, ...)] }`
#[derive(Debug, Clone, PartialEq)]
pub struct PlasticityDecl {
    pub target: String,
    pub rule: String,
    pub params: Vec<(String, PlasticityParam)>,
    pub span: Span,
}

/// A plasticity rule parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlasticityParam {
    Time(TimeValue),
    Number(f64),
    Text(String),
}

/// `effector <Name> { bind* }`
#[derive(Debug, Clone, PartialEq)]
pub struct EffectorDecl {
    pub name: String,
    pub bindings: Vec<BindingDecl>,
    pub span: Span,
}

/// `bind <Action> -> js("...") | noop`
#[derive(Debug, Clone, PartialEq)]
pub struct BindingDecl {
    pub action: String,
    pub target: BindingTarget,
    pub span: Span,
}

/// Effector binding target.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingTarget {
    /// Restricted call expression; safety-checked by the validator.
    Js(String),
    Noop,
}

/// `runtime { tick = ... step { ... } [guards { ... }] }`
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeDecl {
    pub tick: TickSpec,
    /// Ordered ingest/run/emit steps.
    pub steps: Vec<Step>,
    pub guards: Vec<Guard>,
    pub span: Span,
}

/// Tick policy as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum TickSpec {
    /// `tick = RAF` — frame-driven by the host.
    Frame,
    /// `tick = <Ident>` — named tick preset.
    Named(String),
    /// `tick = <Time>` — fixed interval.
    Interval(TimeValue),
}

/// One runtime step command.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Ingest {
        sensors: Vec<String>,
    },
    Run {
        module: String,
        dt: Option<TimeValue>,
        when: Option<String>,
    },
    Emit {
        effector: String,
        from: String,
        winner_only: bool,
    },
}

/// One declared guard policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    MaxEffectsPerSec { limit: u32 },
    SuppressRepeats { window: TimeValue },
    KeepTargetRate { population: String, hz: f64 },
}
