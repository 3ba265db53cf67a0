//! Semantic validation for the Reflex DSL.
//!
//! Four passes over a parsed [`App`], in order:
//!
//! 1. **Symbol table** - collects declarations, reports duplicates
//! 2. **References** - encoder inputs, projection endpoints, circuit action
//!    bindings, runtime step targets
//! 3. **Sanity** - positive dims, slot and neuron counts, non-empty action
//!    lists
//! 4. **Binding safety** - `js("...")` targets restricted to a safe call
//!    shape
//!
//! All passes always run; validation never stops at the first problem. An
//! unbound circuit action is a warning, everything else is an error.

mod bindings;
mod diagnostic;
mod names;
mod sanity;
mod symbols;

pub use diagnostic::{Diagnostic, Severity};
pub use symbols::SymbolTable;

use reflex_ast::App;

/// Run all validation passes and collect every diagnostic.
pub fn validate(app: &App) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let symbols = SymbolTable::build(app, &mut diags);
    names::check_references(app, &symbols, &mut diags);
    sanity::check_sanity(app, &mut diags);
    bindings::check_binding_safety(app, &mut diags);
    diags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_source(source: &str) -> Vec<Diagnostic> {
        let tokens = reflex_lexer::lex(source).expect("lex");
        let app = reflex_parser::parse(&tokens).expect("parse");
        validate(&app)
    }

    fn errors(diags: &[Diagnostic]) -> Vec<&str> {
        diags
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.message.as_str())
            .collect()
    }

    #[test]
    fn accepts_well_formed_app() {
        let diags = validate_source(
            r#"app Good {
                sensor Ui : events(click)
                encoder Enc {
                    in = [Ui.click]
                    out = FeatureVector dim=16
                    policy = { onehot(type) }
                }
                circuit Decide {
                    actions = [go]
                    population Choice : winner_take_all(units=len(actions))
                    projection Choice -> Choice { topology = softmax(temp=1) }
                }
                effector Out {
                    bind go -> js("fx.go(ctx)")
                }
                runtime {
                    tick = 50ms
                    step {
                        ingest [Ui]
                        run Enc
                        run Decide
                        emit Out from=Decide
                    }
                }
            }"#,
        );
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn reports_duplicate_sensor() {
        let diags = validate_source(
            "app A { sensor Ui : events(click) sensor Ui : events(tap) }",
        );
        assert_eq!(errors(&diags), ["Duplicate sensor: Ui"]);
    }

    #[test]
    fn reports_duplicate_population_in_region() {
        let diags = validate_source(
            r#"app A {
                region R {
                    population Mem : state(slots=4, decay=1s, merge="overwrite")
                    population Mem : rate(units=2)
                }
            }"#,
        );
        assert_eq!(errors(&diags), ["Duplicate population: R.Mem"]);
    }

    #[test]
    fn reports_unknown_encoder_sensor() {
        let diags = validate_source(
            r#"app A {
                encoder Enc {
                    in = [Ghost.click]
                    out = FeatureVector dim=8
                    policy = { onehot(type) }
                }
            }"#,
        );
        assert_eq!(
            errors(&diags),
            ["Encoder \"Enc\" references unknown sensor: Ghost"]
        );
    }

    #[test]
    fn wildcard_sensor_pattern_is_not_resolved() {
        let diags = validate_source(
            r#"app A {
                encoder Enc {
                    in = [*.click]
                    out = FeatureVector dim=8
                    policy = { onehot(type) }
                }
            }"#,
        );
        assert!(errors(&diags).is_empty());
    }

    #[test]
    fn resolves_projection_endpoints_through_scope() {
        let diags = validate_source(
            r#"app A {
                region R {
                    population A : rate(units=2)
                    population B : rate(units=2)
                    projection A -> B { topology = dense }
                }
            }"#,
        );
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn reports_unknown_projection_endpoints() {
        let diags = validate_source(
            r#"app A {
                region R {
                    population A : rate(units=2)
                    projection A -> Missing { topology = dense }
                }
            }"#,
        );
        assert_eq!(errors(&diags), ["Projection to unknown module: Missing"]);
    }

    #[test]
    fn warns_on_unbound_circuit_action() {
        let diags = validate_source(
            r#"app A {
                circuit C {
                    actions = [go, stop]
                }
                effector Out { bind go -> noop }
            }"#,
        );
        let warnings: Vec<_> = diags.iter().filter(|d| !d.is_error()).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].message,
            "Circuit \"C\" action \"stop\" has no effector binding"
        );
    }

    #[test]
    fn reports_unknown_runtime_references() {
        let diags = validate_source(
            r#"app A {
                runtime {
                    tick = RAF
                    step {
                        ingest [Ghost]
                        run Nowhere
                        emit Void from=Nowhere
                    }
                }
            }"#,
        );
        assert_eq!(
            errors(&diags),
            [
                "Runtime ingest references unknown sensor: Ghost",
                "Runtime run references unknown module: Nowhere",
                "Runtime emit references unknown effector: Void",
            ]
        );
    }

    #[test]
    fn reports_zero_sizes() {
        let diags = validate_source(
            r#"app A {
                encoder Enc {
                    in = [*.x]
                    out = FeatureVector dim=0
                    policy = { onehot(type) }
                }
                region R {
                    population Mem : state(slots=0, decay=1s, merge="overwrite")
                    population Spk : spiking(neurons=0, neuron=LIF(tau=20ms, refr=2ms), target_rate=5, inhibition="lateral")
                }
            }"#,
        );
        assert_eq!(
            errors(&diags),
            [
                "Encoder \"Enc\" dim must be > 0",
                "Population \"Mem\" slots must be > 0",
                "Population \"Spk\" neurons must be > 0",
            ]
        );
    }

    #[test]
    fn reports_zero_width_feature_ops() {
        let diags = validate_source(
            r#"app A {
                sensor Ui : events(click)
                encoder Enc {
                    in = [Ui.*]
                    out = FeatureVector dim=8
                    policy = {
                        bucket(t, 0)
                        hash(target, 0)
                    }
                }
            }"#,
        );
        assert_eq!(
            errors(&diags),
            [
                "Encoder \"Enc\" bucket bins must be > 0",
                "Encoder \"Enc\" hash buckets must be > 0",
            ]
        );
    }

    #[test]
    fn reports_zero_tick_interval() {
        let diags = validate_source(
            r#"app A {
                runtime {
                    tick = 0ms
                    step { }
                }
            }"#,
        );
        assert_eq!(errors(&diags), ["Runtime tick interval must be > 0"]);
    }

    #[test]
    fn accepts_safe_js_bindings() {
        let diags = validate_source(
            r#"app A {
                effector Out {
                    bind a -> js("fx.pulse(ctx)")
                    bind b -> js("fx.move(ctx.winner, \"fast\", 2.5)")
                    bind c -> js("fx.ping()")
                }
            }"#,
        );
        assert!(errors(&diags).is_empty());
    }

    #[test]
    fn rejects_unsafe_js_bindings() {
        let cases = [
            r#"fx.go(ctx); alert(1)"#,
            r#"window.alert(1)"#,
            r#"fx.go(ctx.a.b)"#,
            r#"fx.go(foo)"#,
        ];
        for expr in cases {
            let source = format!(
                r#"app A {{ effector Out {{ bind go -> js("{}") }} }}"#,
                expr.replace('"', "\\\"")
            );
            let diags = validate_source(&source);
            assert_eq!(
                errors(&diags).len(),
                1,
                "expected rejection for {expr:?}, got {diags:?}"
            );
            assert!(diags[0].message.starts_with("Unsafe js binding for \"go\""));
        }
    }
}
