//! Structural sanity checks on declared sizes and counts.

use crate::diagnostic::Diagnostic;
use reflex_ast::{App, Declaration, FeatureOp, PopulationDecl, TickSpec};

pub fn check_sanity(app: &App, diags: &mut Vec<Diagnostic>) {
    for decl in &app.declarations {
        match decl {
            Declaration::Encoder(encoder) => {
                if encoder.dim == 0 {
                    diags.push(
                        Diagnostic::error(format!(
                            "Encoder \"{}\" dim must be > 0",
                            encoder.name
                        ))
                        .with_span(encoder.span.clone()),
                    );
                }
                for op in &encoder.policy {
                    match op {
                        FeatureOp::Bucket { bins: 0, .. } => {
                            diags.push(
                                Diagnostic::error(format!(
                                    "Encoder \"{}\" bucket bins must be > 0",
                                    encoder.name
                                ))
                                .with_span(encoder.span.clone()),
                            );
                        }
                        FeatureOp::Hash { buckets: 0, .. } => {
                            diags.push(
                                Diagnostic::error(format!(
                                    "Encoder \"{}\" hash buckets must be > 0",
                                    encoder.name
                                ))
                                .with_span(encoder.span.clone()),
                            );
                        }
                        _ => {}
                    }
                }
            }
            Declaration::Runtime(runtime) => {
                if let TickSpec::Interval(t) = &runtime.tick {
                    if t.to_ms() <= 0.0 {
                        diags.push(
                            Diagnostic::error("Runtime tick interval must be > 0".to_owned())
                                .with_span(runtime.span.clone()),
                        );
                    }
                }
            }
            Declaration::Region(region) => {
                for pop in &region.populations {
                    check_population(pop, diags);
                }
            }
            Declaration::Circuit(circuit) => {
                if circuit.actions.is_empty() {
                    diags.push(
                        Diagnostic::error(format!(
                            "Circuit \"{}\" must have at least one action",
                            circuit.name
                        ))
                        .with_span(circuit.span.clone()),
                    );
                }
                for pop in &circuit.populations {
                    check_population(pop, diags);
                }
            }
            _ => {}
        }
    }
}

fn check_population(pop: &PopulationDecl, diags: &mut Vec<Diagnostic>) {
    match pop {
        PopulationDecl::State { name, slots: 0, span, .. } => {
            diags.push(
                Diagnostic::error(format!("Population \"{name}\" slots must be > 0"))
                    .with_span(span.clone()),
            );
        }
        PopulationDecl::Spiking { name, neurons: 0, span, .. }
        | PopulationDecl::Recurrent { name, neurons: 0, span, .. } => {
            diags.push(
                Diagnostic::error(format!("Population \"{name}\" neurons must be > 0"))
                    .with_span(span.clone()),
            );
        }
        _ => {}
    }
}
