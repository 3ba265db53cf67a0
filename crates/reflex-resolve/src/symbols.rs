//! Symbol table construction.
//!
//! Collects every declared name so later passes can validate references.
//! Populations live under their enclosing region or circuit as
//! `<Scope>.<Name>`; encoders, circuits, and qualified populations together
//! form the runnable module namespace.

use crate::diagnostic::Diagnostic;
use indexmap::IndexSet;
use reflex_ast::{App, Declaration};

/// Symbol table for reference validation.
///
/// Insertion order is preserved so diagnostics come out in source order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Sensor names.
    sensors: IndexSet<String>,
    /// Encoder names.
    encoders: IndexSet<String>,
    /// Qualified population names (`Region.Pop` / `Circuit.Pop`).
    populations: IndexSet<String>,
    /// Circuit names.
    circuits: IndexSet<String>,
    /// Effector names.
    effectors: IndexSet<String>,
    /// Every action name bound by any effector.
    bound_actions: IndexSet<String>,
    /// Everything a `run` step may target.
    modules: IndexSet<String>,
}

impl SymbolTable {
    /// Build the symbol table, reporting duplicate declarations.
    pub fn build(app: &App, diags: &mut Vec<Diagnostic>) -> Self {
        let mut symbols = Self::default();
        for decl in &app.declarations {
            match decl {
                Declaration::Sensor(sensor) => {
                    if !symbols.sensors.insert(sensor.name.clone()) {
                        diags.push(
                            Diagnostic::error(format!("Duplicate sensor: {}", sensor.name))
                                .with_span(sensor.span.clone()),
                        );
                    }
                }
                Declaration::Encoder(encoder) => {
                    if !symbols.encoders.insert(encoder.name.clone()) {
                        diags.push(
                            Diagnostic::error(format!("Duplicate encoder: {}", encoder.name))
                                .with_span(encoder.span.clone()),
                        );
                    }
                    symbols.modules.insert(encoder.name.clone());
                }
                Declaration::Region(region) => {
                    for pop in &region.populations {
                        let qualified = format!("{}.{}", region.name, pop.name());
                        if !symbols.populations.insert(qualified.clone()) {
                            diags.push(
                                Diagnostic::error(format!("Duplicate population: {qualified}"))
                                    .with_span(pop.span().clone()),
                            );
                        }
                        symbols.modules.insert(qualified);
                    }
                }
                Declaration::Circuit(circuit) => {
                    if !symbols.circuits.insert(circuit.name.clone()) {
                        diags.push(
                            Diagnostic::error(format!("Duplicate circuit: {}", circuit.name))
                                .with_span(circuit.span.clone()),
                        );
                    }
                    symbols.modules.insert(circuit.name.clone());
                    for pop in &circuit.populations {
                        let qualified = format!("{}.{}", circuit.name, pop.name());
                        symbols.populations.insert(qualified.clone());
                        symbols.modules.insert(qualified);
                    }
                }
                Declaration::Effector(effector) => {
                    if !symbols.effectors.insert(effector.name.clone()) {
                        diags.push(
                            Diagnostic::error(format!("Duplicate effector: {}", effector.name))
                                .with_span(effector.span.clone()),
                        );
                    }
                    for binding in &effector.bindings {
                        symbols.bound_actions.insert(binding.action.clone());
                    }
                }
                Declaration::Modulator(_) | Declaration::Runtime(_) => {}
            }
        }
        symbols
    }

    pub fn has_sensor(&self, name: &str) -> bool {
        self.sensors.contains(name)
    }

    pub fn has_effector(&self, name: &str) -> bool {
        self.effectors.contains(name)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains(name)
    }

    pub fn has_bound_action(&self, action: &str) -> bool {
        self.bound_actions.contains(action)
    }

    /// Resolve a projection endpoint, trying the bare name first and then
    /// qualifying with the enclosing region/circuit scope.
    pub fn resolve_module(&self, name: &str, scope: &str) -> bool {
        if self.modules.contains(name) || self.populations.contains(name) {
            return true;
        }
        let qualified = format!("{scope}.{name}");
        self.modules.contains(&qualified) || self.populations.contains(&qualified)
    }
}
