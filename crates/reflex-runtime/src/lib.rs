//! Deterministic tick-driven runtime for compiled Reflex programs.
//!
//! The runtime executes the flat IR produced by `reflex-compiler`:
//! events queue up between ticks, each tick drains and encodes them into a
//! feature vector, context memory folds the vector into a decaying ring,
//! the action selector scores actions against the remembered context, and
//! guarded winners reach the host through an [`ActionSink`].
//!
//! Everything is deterministic for a given seed and event/tick timeline:
//! no wall-clock reads, no unseeded randomness, no iteration over
//! unordered maps.

mod bindings;
mod encoder;
mod error;
mod guards;
mod hash;
mod instance;
mod memory;
mod queue;
mod scheduler;
mod selector;
mod types;

pub use bindings::{ActionSink, CallArg, EffectCall, NullSink};
pub use encoder::FeatureEncoder;
pub use error::RuntimeError;
pub use guards::GuardChain;
pub use hash::murmur3_32;
pub use instance::{DebugSnapshot, Instance};
pub use memory::ContextMemory;
pub use queue::EventQueue;
pub use scheduler::Scheduler;
pub use selector::{ActionSelector, Selection};
pub use types::{ContextState, Event, Payload, PayloadValue};
