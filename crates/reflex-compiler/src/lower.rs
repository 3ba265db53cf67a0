//! AST to IR lowering.
//!
//! Lowering flattens the declaration tree:
//!
//! - region and circuit populations become top-level modules named
//!   `Scope__Pop`; projection endpoints are qualified the same way
//! - every circuit additionally synthesizes an `ActionSelector` module
//!   named after the circuit itself, carrying the action list and the
//!   temperature of the circuit's softmax projection (1.0 if none)
//! - time literals become milliseconds, `len(actions)` unit counts become
//!   the `-1` placeholder resolved by the selector at runtime
//!
//! Lowering is infallible; anything that could fail was validated earlier.

use crate::ir::{
    AppIr, BindingIr, EffectorIr, EncoderIr, FeatureOpIr, GuardIr, InitIr, LearningIr, ModuleIr,
    ProjectionIr, RuntimeIr, SensorIr, SensorPatternIr, StepIr, TickIr, TopologyIr,
};
use reflex_ast::{
    App, BindingTarget, CircuitDecl, Declaration, EffectorDecl, EncoderDecl, FeatureOp, Guard,
    LearningRule, PopulationDecl, ProjectionDecl, RegionDecl, RuntimeDecl, SensorDecl, Step,
    TickSpec, Topology, UnitCount, WeightInit,
};

/// The separator between a scope prefix and a population name.
pub const SCOPE_SEP: &str = "__";

/// Lower a validated AST to the flat IR.
pub fn lower(app: &App) -> AppIr {
    let mut sensors = Vec::new();
    let mut encoders = Vec::new();
    let mut modules = Vec::new();
    let mut projections = Vec::new();
    let mut effectors = Vec::new();
    let mut runtime = None;

    for decl in &app.declarations {
        match decl {
            Declaration::Sensor(sensor) => sensors.push(lower_sensor(sensor)),
            Declaration::Encoder(encoder) => encoders.push(lower_encoder(encoder)),
            Declaration::Region(region) => lower_region(region, &mut modules, &mut projections),
            Declaration::Circuit(circuit) => lower_circuit(circuit, &mut modules, &mut projections),
            Declaration::Effector(effector) => effectors.push(lower_effector(effector)),
            Declaration::Runtime(decl) => runtime = Some(lower_runtime(decl)),
            Declaration::Modulator(_) => {}
        }
    }

    AppIr {
        name: app.name.clone(),
        sensors,
        encoders,
        modules,
        projections,
        effectors,
        runtime: runtime.unwrap_or(RuntimeIr {
            tick: TickIr::Raf,
            steps: Vec::new(),
            guards: Vec::new(),
        }),
    }
}

fn lower_sensor(sensor: &SensorDecl) -> SensorIr {
    SensorIr {
        name: sensor.name.clone(),
        event_types: sensor.event_types.clone(),
    }
}

fn lower_encoder(encoder: &EncoderDecl) -> EncoderIr {
    EncoderIr {
        name: encoder.name.clone(),
        inputs: encoder
            .inputs
            .iter()
            .map(|p| SensorPatternIr {
                sensor: p.sensor.as_str().to_owned(),
                event: p.event.as_str().to_owned(),
            })
            .collect(),
        dim: encoder.dim,
        feature_ops: encoder.policy.iter().map(lower_feature_op).collect(),
    }
}

fn lower_feature_op(op: &FeatureOp) -> FeatureOpIr {
    match op {
        FeatureOp::Onehot { field } => FeatureOpIr::Onehot {
            field: field.clone(),
        },
        FeatureOp::Bucket { field, bins } => FeatureOpIr::Bucket {
            field: field.clone(),
            bins: *bins,
        },
        FeatureOp::Hash { field, buckets } => FeatureOpIr::Hash {
            field: field.clone(),
            buckets: *buckets,
        },
        FeatureOp::Numeric { field } => FeatureOpIr::Numeric {
            field: field.clone(),
        },
        FeatureOp::Clamp { field, min, max } => FeatureOpIr::Clamp {
            field: field.clone(),
            min: *min,
            max: *max,
        },
        FeatureOp::Scale { field, factor } => FeatureOpIr::Scale {
            field: field.clone(),
            factor: *factor,
        },
    }
}

fn lower_region(region: &RegionDecl, modules: &mut Vec<ModuleIr>, projections: &mut Vec<ProjectionIr>) {
    for pop in &region.populations {
        modules.push(lower_population(pop, &region.name));
    }
    for proj in &region.projections {
        projections.push(lower_projection(proj, &region.name));
    }
}

fn lower_circuit(
    circuit: &CircuitDecl,
    modules: &mut Vec<ModuleIr>,
    projections: &mut Vec<ProjectionIr>,
) {
    for pop in &circuit.populations {
        modules.push(lower_population(pop, &circuit.name));
    }

    // The circuit's softmax projection, if any, sets the selection
    // temperature; the last one wins.
    let mut temperature = 1.0;
    for proj in &circuit.projections {
        if let Topology::Softmax { temperature: temp } = proj.topology {
            temperature = temp;
        }
        projections.push(lower_projection(proj, &circuit.name));
    }

    modules.push(ModuleIr::ActionSelector {
        name: circuit.name.clone(),
        actions: circuit.actions.clone(),
        temperature,
    });
}

fn lower_population(pop: &PopulationDecl, prefix: &str) -> ModuleIr {
    let name = format!("{prefix}{SCOPE_SEP}{}", pop.name());
    match pop {
        PopulationDecl::State {
            slots,
            decay,
            merge,
            ..
        } => ModuleIr::State {
            name,
            slots: *slots,
            decay_ms: decay.to_ms(),
            merge: merge.clone(),
        },
        PopulationDecl::Spiking {
            neurons,
            tau,
            refr,
            target_rate,
            inhibition,
            ..
        } => ModuleIr::Spiking {
            name,
            neurons: *neurons,
            tau_ms: tau.to_ms(),
            refr_ms: refr.to_ms(),
            target_rate: *target_rate,
            inhibition: inhibition.clone(),
        },
        PopulationDecl::Recurrent { neurons, dt, .. } => ModuleIr::Recurrent {
            name,
            neurons: *neurons,
            dt_ms: dt.to_ms(),
        },
        PopulationDecl::Rate { units, .. } | PopulationDecl::WinnerTakeAll { units, .. } => {
            ModuleIr::Rate {
                name,
                units: resolve_unit_count(units),
            }
        }
    }
}

fn resolve_unit_count(units: &UnitCount) -> i32 {
    match units {
        UnitCount::Literal(n) => *n as i32,
        // Resolved against the owning circuit's action list at runtime.
        UnitCount::LenOf(_) => -1,
    }
}

fn lower_projection(proj: &ProjectionDecl, prefix: &str) -> ProjectionIr {
    ProjectionIr {
        from: qualify_name(&proj.from, prefix),
        to: qualify_name(&proj.to, prefix),
        topology: lower_topology(&proj.topology),
        init: match &proj.weight_init {
            Some(init) => lower_init(init),
            None => InitIr::Default,
        },
        learning: proj.rule.as_ref().map(lower_learning),
    }
}

/// Qualify a projection endpoint within its enclosing scope.
///
/// Dotted or already-flattened names are kept (dots rewritten to the flat
/// separator); bare names get the scope prefix.
fn qualify_name(name: &str, prefix: &str) -> String {
    if name.contains('.') || name.contains(SCOPE_SEP) {
        name.replace('.', SCOPE_SEP)
    } else {
        format!("{prefix}{SCOPE_SEP}{name}")
    }
}

fn lower_topology(topology: &Topology) -> TopologyIr {
    match topology {
        Topology::Dense => TopologyIr::Dense,
        Topology::SparseRandom { p, seed } => TopologyIr::SparseRandom {
            p: *p,
            seed: *seed,
        },
        Topology::Local { radius } => TopologyIr::Local { radius: *radius },
        Topology::Linear => TopologyIr::Linear,
        Topology::Softmax { temperature } => TopologyIr::Softmax {
            temperature: *temperature,
        },
    }
}

fn lower_init(init: &WeightInit) -> InitIr {
    match init {
        WeightInit::Normal { mu, sigma } => InitIr::Normal {
            mu: *mu,
            sigma: *sigma,
        },
        WeightInit::Uniform { a, b } => InitIr::Uniform { a: *a, b: *b },
        WeightInit::Constant { c } => InitIr::Constant { c: *c },
    }
}

fn lower_learning(rule: &LearningRule) -> LearningIr {
    match rule {
        LearningRule::Hebbian { trace } => LearningIr::Hebbian {
            trace_ms: trace.to_ms(),
        },
        LearningRule::None => LearningIr::None,
    }
}

fn lower_effector(effector: &EffectorDecl) -> EffectorIr {
    EffectorIr {
        name: effector.name.clone(),
        bindings: effector
            .bindings
            .iter()
            .map(|b| match &b.target {
                BindingTarget::Js(expr) => BindingIr::Js {
                    action: b.action.clone(),
                    expr: expr.clone(),
                },
                BindingTarget::Noop => BindingIr::Noop {
                    action: b.action.clone(),
                },
            })
            .collect(),
    }
}

fn lower_runtime(runtime: &RuntimeDecl) -> RuntimeIr {
    let tick = match &runtime.tick {
        TickSpec::Frame => TickIr::Raf,
        // Named presets are resolved by a substring heuristic; unknown
        // names fall back to frame-driven ticking.
        TickSpec::Named(name) => {
            if name.contains("100") {
                TickIr::Interval { ms: 100.0 }
            } else if name.contains("1s") {
                TickIr::Interval { ms: 1000.0 }
            } else {
                TickIr::Raf
            }
        }
        TickSpec::Interval(time) => TickIr::Interval { ms: time.to_ms() },
    };

    let steps = runtime
        .steps
        .iter()
        .map(|step| match step {
            Step::Ingest { sensors } => StepIr::Ingest {
                sensors: sensors.clone(),
            },
            // Dotted module paths flatten to the module naming scheme;
            // bare circuit names already match their ActionSelector.
            Step::Run { module, dt, when } => StepIr::Run {
                module: module.replace('.', SCOPE_SEP),
                dt_ms: dt.map(|t| t.to_ms()),
                when: when.clone(),
            },
            Step::Emit {
                effector,
                from,
                winner_only,
            } => StepIr::Emit {
                effector: effector.clone(),
                from: from.clone(),
                winner_only: *winner_only,
            },
        })
        .collect();

    let guards = runtime
        .guards
        .iter()
        .map(|guard| match guard {
            Guard::MaxEffectsPerSec { limit } => GuardIr::MaxEffectsPerSec { limit: *limit },
            Guard::SuppressRepeats { window } => GuardIr::SuppressRepeats {
                window_ms: window.to_ms(),
            },
            Guard::KeepTargetRate { population, hz } => GuardIr::KeepTargetRate {
                population: population.clone(),
                hz: *hz,
            },
        })
        .collect();

    RuntimeIr {
        tick,
        steps,
        guards,
    }
}
