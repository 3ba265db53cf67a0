//! Reference validation pass.
//!
//! Validates that every cross-declaration reference resolves: encoder input
//! sensors, projection endpoints, circuit action bindings, and runtime step
//! targets. Produces diagnostics only; the AST is never modified.

use crate::diagnostic::Diagnostic;
use crate::symbols::SymbolTable;
use reflex_ast::{App, Declaration, PatternPart, ProjectionDecl, Step};

pub fn check_references(app: &App, symbols: &SymbolTable, diags: &mut Vec<Diagnostic>) {
    for decl in &app.declarations {
        match decl {
            Declaration::Encoder(encoder) => {
                for input in &encoder.inputs {
                    if let PatternPart::Named(sensor) = &input.sensor {
                        if !symbols.has_sensor(sensor) {
                            diags.push(
                                Diagnostic::error(format!(
                                    "Encoder \"{}\" references unknown sensor: {}",
                                    encoder.name, sensor
                                ))
                                .with_span(encoder.span.clone()),
                            );
                        }
                    }
                }
            }
            Declaration::Region(region) => {
                for proj in &region.projections {
                    check_projection_refs(proj, symbols, &region.name, diags);
                }
            }
            Declaration::Circuit(circuit) => {
                for proj in &circuit.projections {
                    check_projection_refs(proj, symbols, &circuit.name, diags);
                }
                for action in &circuit.actions {
                    if !symbols.has_bound_action(action) {
                        diags.push(
                            Diagnostic::warning(format!(
                                "Circuit \"{}\" action \"{}\" has no effector binding",
                                circuit.name, action
                            ))
                            .with_span(circuit.span.clone()),
                        );
                    }
                }
            }
            Declaration::Runtime(runtime) => {
                for step in &runtime.steps {
                    match step {
                        Step::Ingest { sensors } => {
                            for sensor in sensors {
                                if !symbols.has_sensor(sensor) {
                                    diags.push(Diagnostic::error(format!(
                                        "Runtime ingest references unknown sensor: {sensor}"
                                    )));
                                }
                            }
                        }
                        Step::Run { module, .. } => {
                            if !symbols.has_module(module) {
                                diags.push(Diagnostic::error(format!(
                                    "Runtime run references unknown module: {module}"
                                )));
                            }
                        }
                        Step::Emit { effector, .. } => {
                            if !symbols.has_effector(effector) {
                                diags.push(Diagnostic::error(format!(
                                    "Runtime emit references unknown effector: {effector}"
                                )));
                            }
                        }
                    }
                }
            }
            Declaration::Sensor(_) | Declaration::Modulator(_) | Declaration::Effector(_) => {}
        }
    }
}

fn check_projection_refs(
    proj: &ProjectionDecl,
    symbols: &SymbolTable,
    scope: &str,
    diags: &mut Vec<Diagnostic>,
) {
    if !symbols.resolve_module(&proj.from, scope) {
        diags.push(
            Diagnostic::error(format!("Projection from unknown module: {}", proj.from))
                .with_span(proj.span.clone()),
        );
    }
    if !symbols.resolve_module(&proj.to, scope) {
        diags.push(
            Diagnostic::error(format!("Projection to unknown module: {}", proj.to))
                .with_span(proj.span.clone()),
        );
    }
}
