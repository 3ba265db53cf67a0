//! Instance: a compiled program wired into live runtime modules.
//!
//! Construction walks the IR once: the first encoder becomes the feature
//! encoder, every `State` module a context memory, every `ActionSelector`
//! a selector, the runtime guards one guard chain. Spiking, recurrent and
//! rate modules are compile-time topology with no per-tick behavior; `run`
//! steps naming them are accepted and do nothing.
//!
//! `tick(now)` then replays the declared runtime steps in order against
//! whatever events arrived since the previous tick.

use crate::bindings::{ActionSink, EffectCall};
use crate::encoder::FeatureEncoder;
use crate::error::RuntimeError;
use crate::guards::GuardChain;
use crate::memory::ContextMemory;
use crate::queue::EventQueue;
use crate::selector::{ActionSelector, Selection};
use crate::types::{ContextState, Event, Payload, PayloadValue};
use indexmap::{IndexMap, IndexSet};
use reflex_compiler::ir::{AppIr, BindingIr, ModuleIr, StepIr};
use tracing::{debug, trace};

/// Read-only view of the instance after a tick, for debug overlays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugSnapshot {
    pub tick: u64,
    pub queue_len: usize,
    /// Events ingested by the most recent tick.
    pub batch_len: usize,
    pub context_target: String,
    pub winner: Option<String>,
    pub values: Vec<f32>,
    pub probs: Vec<f32>,
    pub last_rejection: Option<String>,
}

/// Per-effector action bindings; `None` marks a `noop` binding.
type BindingMap = IndexMap<String, Option<EffectCall>>;

pub struct Instance<S: ActionSink> {
    steps: Vec<StepIr>,
    queue: EventQueue,
    encoders: IndexMap<String, FeatureEncoder>,
    memories: IndexMap<String, ContextMemory>,
    selectors: IndexMap<String, ActionSelector>,
    passive_modules: IndexSet<String>,
    effectors: IndexMap<String, BindingMap>,
    guard: GuardChain,
    sink: S,

    batch: Vec<Event>,
    features: Vec<f32>,
    context: ContextState,
    selections: IndexMap<String, Selection>,
    ticks: u64,
    last_winner: Option<String>,
}

impl<S: ActionSink> Instance<S> {
    /// Wire an instance from compiled IR. `seed` fixes selector weights;
    /// two instances with the same IR and seed behave identically.
    pub fn new(ir: &AppIr, seed: u32, sink: S) -> Result<Self, RuntimeError> {
        let feature_dim = ir.encoders.first().map(|e| e.dim as usize).unwrap_or(0);

        let mut encoders = IndexMap::new();
        for encoder in &ir.encoders {
            encoders.insert(
                encoder.name.clone(),
                FeatureEncoder::new(
                    encoder.dim,
                    encoder.feature_ops.clone(),
                    matched_event_types(ir, encoder.name.as_str()),
                ),
            );
        }

        let mut memories = IndexMap::new();
        let mut selectors = IndexMap::new();
        let mut passive_modules = IndexSet::new();
        for module in &ir.modules {
            match module {
                ModuleIr::State {
                    name,
                    slots,
                    decay_ms,
                    ..
                } => {
                    memories.insert(name.clone(), ContextMemory::new(*slots, *decay_ms, feature_dim));
                }
                ModuleIr::ActionSelector {
                    name,
                    actions,
                    temperature,
                } => {
                    selectors.insert(
                        name.clone(),
                        ActionSelector::new(actions.clone(), feature_dim, *temperature, seed),
                    );
                }
                ModuleIr::Spiking { name, .. }
                | ModuleIr::Recurrent { name, .. }
                | ModuleIr::Rate { name, .. } => {
                    passive_modules.insert(name.clone());
                }
            }
        }

        let mut effectors = IndexMap::new();
        for effector in &ir.effectors {
            let mut bindings = BindingMap::new();
            for binding in &effector.bindings {
                let call = match binding {
                    BindingIr::Js { action, expr } => Some(EffectCall::parse(action, expr)?),
                    BindingIr::Noop { .. } => None,
                };
                bindings.insert(binding.action().to_owned(), call);
            }
            effectors.insert(effector.name.clone(), bindings);
        }

        debug!(
            app = %ir.name,
            encoders = encoders.len(),
            memories = memories.len(),
            selectors = selectors.len(),
            "instance wired"
        );

        Ok(Self {
            steps: ir.runtime.steps.clone(),
            queue: EventQueue::new(),
            encoders,
            memories,
            selectors,
            passive_modules,
            effectors,
            guard: GuardChain::new(ir.runtime.guards.clone()),
            sink,
            batch: Vec::new(),
            features: vec![0.0; feature_dim],
            context: ContextState::default(),
            selections: IndexMap::new(),
            ticks: 0,
            last_winner: None,
        })
    }

    /// Queue an event for the next tick's ingest step.
    pub fn push_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Run one tick's declared steps at host time `now` (milliseconds).
    pub fn tick(&mut self, now: f64) -> Result<(), RuntimeError> {
        self.ticks += 1;
        let steps = std::mem::take(&mut self.steps);
        let result = self.run_steps(&steps, now);
        self.steps = steps;
        result
    }

    fn run_steps(&mut self, steps: &[StepIr], now: f64) -> Result<(), RuntimeError> {
        for (index, step) in steps.iter().enumerate() {
            match step {
                StepIr::Ingest { sensors } => {
                    let drained = self.queue.drain();
                    self.batch = drained
                        .into_iter()
                        .filter(|e| sensors.iter().any(|s| *s == e.sensor))
                        .collect();
                    trace!(tick = self.ticks, batch = self.batch.len(), "ingested");
                }
                StepIr::Run { module, when, .. } => {
                    if let Some(flag) = when {
                        // Conditional steps run only when the tick saw a
                        // matching event type.
                        let hit = self.batch.iter().any(|e| e.event_type == *flag);
                        if !hit {
                            continue;
                        }
                    }
                    self.run_module(module, now)?;
                }
                StepIr::Emit {
                    effector,
                    from,
                    winner_only: _,
                } => {
                    self.run_emit(effector, from, now, index)?;
                }
            }
        }
        Ok(())
    }

    fn run_module(&mut self, module: &str, now: f64) -> Result<(), RuntimeError> {
        if let Some(encoder) = self.encoders.get_mut(module) {
            self.features = encoder.encode(&self.batch, now).to_vec();
            return Ok(());
        }
        if let Some(memory) = self.memories.get_mut(module) {
            let meta = self.batch.last().map(event_meta).unwrap_or_default();
            self.context = memory.step(&self.features, &meta, now);
            return Ok(());
        }
        if let Some(selector) = self.selectors.get_mut(module) {
            let features = if self.context.features.is_empty() {
                &self.features
            } else {
                &self.context.features
            };
            let selection = selector.step(features);
            trace!(tick = self.ticks, module, winner = selection.winner, "selected");
            self.selections.insert(module.to_owned(), selection);
            return Ok(());
        }
        if self.passive_modules.contains(module) {
            return Ok(());
        }
        Err(RuntimeError::UnknownModule(module.to_owned()))
    }

    fn run_emit(
        &mut self,
        effector: &str,
        from: &str,
        now: f64,
        index: usize,
    ) -> Result<(), RuntimeError> {
        let bindings = self
            .effectors
            .get(effector)
            .ok_or_else(|| RuntimeError::UnknownEffector(effector.to_owned()))?;
        let selector = self
            .selectors
            .get(from)
            .ok_or_else(|| RuntimeError::UnknownModule(from.to_owned()))?;
        let selection = self.selections.get(from).ok_or(RuntimeError::Step {
            index,
            message: format!("emit ran before {from} produced a selection"),
        })?;

        let action = selector.actions()[selection.winner].clone();
        if !self.guard.check(&action, now) {
            debug!(
                tick = self.ticks,
                action = %action,
                reason = self.guard.last_rejection().unwrap_or(""),
                "effect suppressed"
            );
            return Ok(());
        }

        let call = bindings.get(&action).and_then(|c| c.as_ref());
        self.sink.emit(&action, call, &self.context);
        self.guard.record(&action, now);
        self.last_winner = Some(action);
        Ok(())
    }

    /// Debug view of the most recent tick.
    pub fn snapshot(&self) -> DebugSnapshot {
        let selection = self.selections.last().map(|(_, s)| s);
        DebugSnapshot {
            tick: self.ticks,
            queue_len: self.queue.len(),
            batch_len: self.batch.len(),
            context_target: self.context.target.clone(),
            winner: self.last_winner.clone(),
            values: selection.map(|s| s.values.clone()).unwrap_or_default(),
            probs: selection.map(|s| s.probs.clone()).unwrap_or_default(),
            last_rejection: self.guard.last_rejection().map(str::to_owned),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Metadata handed to context memory for an event: the payload plus the
/// event type under the `eventType` key.
fn event_meta(event: &Event) -> Payload {
    let mut meta = event.payload.clone();
    meta.insert(
        "eventType".to_owned(),
        PayloadValue::Text(event.event_type.clone()),
    );
    meta
}

/// Ordered union of event types the encoder's input patterns can match.
/// Fixes the onehot slot order for the instance lifetime.
fn matched_event_types(ir: &AppIr, encoder_name: &str) -> Vec<String> {
    let mut out = IndexSet::new();
    let Some(encoder) = ir.encoders.iter().find(|e| e.name == encoder_name) else {
        return Vec::new();
    };
    for pattern in &encoder.inputs {
        for sensor in &ir.sensors {
            if pattern.sensor != "*" && pattern.sensor != sensor.name {
                continue;
            }
            if pattern.event == "*" {
                out.extend(sensor.event_types.iter().cloned());
            } else if sensor.event_types.contains(&pattern.event) {
                out.insert(pattern.event.clone());
            }
        }
    }
    out.into_iter().collect()
}
