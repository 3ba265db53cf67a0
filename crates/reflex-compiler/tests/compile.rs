//! End-to-end pipeline tests: source in, IR and graph JSON out.

use reflex_compiler::ir::{GuardIr, InitIr, ModuleIr, StepIr, TickIr, TopologyIr};
use reflex_compiler::{compile, AppIr, ScriptGenerator, Severity};

const DEMO_APP: &str = r#"
app Watcher {
    sensor Ui : events(click, keydown)
    sensor Env : events(success)

    encoder Enc {
        in = [Ui.*, Env.success]
        out = FeatureVector dim=32
        policy = {
            onehot(type)
            bucket(t, 8)
            numeric(x)
        }
    }

    region Cortex {
        population Mem : state(slots=16, decay=2s, merge="overwrite")
        population Spk : spiking(neurons=50, neuron=LIF(tau=20ms, refr=2ms), target_rate=5, inhibition="lateral")
        projection Mem -> Spk {
            topology = sparse_random(p=0.1, seed=7)
            weight_init = normal(0, 0.2)
            rule = hebbian(trace=200ms)
        }
    }

    circuit Decide {
        actions = [left, right, wait]
        population Choice : winner_take_all(units=len(actions))
        projection Cortex.Mem -> Choice { topology = dense }
        projection Choice -> Choice { topology = softmax(temp=0.8) }
    }

    effector Out {
        bind left -> js("fx.move(ctx, \"left\")")
        bind right -> js("fx.move(ctx, \"right\")")
        bind wait -> noop
    }

    runtime {
        tick = 50ms
        step {
            ingest [Ui, Env]
            run Enc
            run Cortex.Mem
            run Decide
            emit Out from=Decide winner_only
        }
        guards {
            max_effects_per_sec = 10
            suppress_repeats(window=300ms)
        }
    }
}
"#;

fn compile_demo() -> AppIr {
    compile(DEMO_APP).expect("compile").ir
}

#[test]
fn compiles_demo_app() {
    let out = compile(DEMO_APP).expect("compile");
    assert_eq!(out.ast.name, "Watcher");
    assert_eq!(out.ir.name, "Watcher");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert!(out.script.is_none());
}

#[test]
fn flattens_populations_with_scope_prefix() {
    let ir = compile_demo();
    let names: Vec<&str> = ir.modules.iter().map(|m| m.name()).collect();
    assert_eq!(
        names,
        ["Cortex__Mem", "Cortex__Spk", "Decide__Choice", "Decide"]
    );
}

#[test]
fn synthesizes_action_selector_from_circuit() {
    let ir = compile_demo();
    match ir.modules.last().expect("selector") {
        ModuleIr::ActionSelector {
            name,
            actions,
            temperature,
        } => {
            assert_eq!(name, "Decide");
            assert_eq!(actions, &["left", "right", "wait"]);
            // Temperature comes from the circuit's softmax projection.
            assert_eq!(*temperature, 0.8);
        }
        other => panic!("expected ActionSelector, got {other:?}"),
    }
}

#[test]
fn selector_temperature_defaults_to_one() {
    let ir = compile("app A { circuit C { actions = [go] } effector O { bind go -> noop } }")
        .expect("compile")
        .ir;
    assert!(matches!(
        &ir.modules[0],
        ModuleIr::ActionSelector { temperature, .. } if *temperature == 1.0
    ));
}

#[test]
fn len_of_actions_lowers_to_placeholder() {
    let ir = compile_demo();
    assert!(matches!(
        &ir.modules[2],
        ModuleIr::Rate { units: -1, .. }
    ));
}

#[test]
fn lowers_times_to_milliseconds() {
    let ir = compile_demo();
    match &ir.modules[0] {
        ModuleIr::State { decay_ms, .. } => assert_eq!(*decay_ms, 2000.0),
        other => panic!("expected state module, got {other:?}"),
    }
    match &ir.modules[1] {
        ModuleIr::Spiking { tau_ms, refr_ms, .. } => {
            assert_eq!(*tau_ms, 20.0);
            assert_eq!(*refr_ms, 2.0);
        }
        other => panic!("expected spiking module, got {other:?}"),
    }
    assert!(matches!(ir.runtime.tick, TickIr::Interval { ms } if ms == 50.0));
    assert!(matches!(
        ir.runtime.guards[1],
        GuardIr::SuppressRepeats { window_ms } if window_ms == 300.0
    ));
}

#[test]
fn qualifies_projection_endpoints() {
    let ir = compile_demo();
    assert_eq!(ir.projections[0].from, "Cortex__Mem");
    assert_eq!(ir.projections[0].to, "Cortex__Spk");
    // A dotted cross-scope reference flattens rather than re-qualifies.
    assert_eq!(ir.projections[1].from, "Cortex__Mem");
    assert_eq!(ir.projections[1].to, "Decide__Choice");
    assert!(matches!(
        ir.projections[0].topology,
        TopologyIr::SparseRandom { p, seed: 7 } if p == 0.1
    ));
    // Missing weight_init lowers to the default marker.
    assert_eq!(ir.projections[1].init, InitIr::Default);
}

#[test]
fn flattens_run_step_module_paths() {
    let ir = compile_demo();
    let modules: Vec<&str> = ir
        .runtime
        .steps
        .iter()
        .filter_map(|s| match s {
            StepIr::Run { module, .. } => Some(module.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(modules, ["Enc", "Cortex__Mem", "Decide"]);
}

#[test]
fn maps_named_ticks_heuristically() {
    let tick = |src: &str| compile(src).expect("compile").ir.runtime.tick;
    assert!(matches!(
        tick("app A { runtime { tick = Tick100ms step { } } }"),
        TickIr::Interval { ms } if ms == 100.0
    ));
    assert!(matches!(
        tick("app A { runtime { tick = Every1s step { } } }"),
        TickIr::Interval { ms } if ms == 1000.0
    ));
    assert!(matches!(
        tick("app A { runtime { tick = Whenever step { } } }"),
        TickIr::Raf
    ));
}

#[test]
fn app_without_runtime_gets_frame_tick() {
    let ir = compile("app A { sensor Ui : events(click) }").expect("compile").ir;
    assert!(matches!(ir.runtime.tick, TickIr::Raf));
    assert!(ir.runtime.steps.is_empty());
}

#[test]
fn compilation_is_deterministic() {
    let a = compile(DEMO_APP).expect("compile");
    let b = compile(DEMO_APP).expect("compile");
    assert_eq!(a.ir, b.ir);
    assert_eq!(a.graph_json, b.graph_json);
}

#[test]
fn graph_json_uses_stable_field_names() {
    let out = compile(DEMO_APP).expect("compile");
    let graph: serde_json::Value = serde_json::from_str(&out.graph_json).expect("valid json");
    assert_eq!(graph["name"], "Watcher");
    assert_eq!(graph["sensors"][0]["eventTypes"][0], "click");
    assert_eq!(graph["encoders"][0]["featureOps"][0]["kind"], "onehot");
    assert_eq!(graph["modules"][0]["kind"], "State");
    assert_eq!(graph["modules"][0]["decayMs"], 2000.0);
    assert_eq!(graph["projections"][0]["topology"]["kind"], "sparse_random");
    assert_eq!(graph["runtime"]["tick"]["mode"], "Interval");
    assert_eq!(graph["runtime"]["guards"][0]["kind"], "max_effects_per_sec");
}

#[test]
fn rejects_unknown_sensor_reference() {
    let err = compile(
        r#"app A {
            encoder Enc {
                in = [Ghost.click]
                out = FeatureVector dim=8
                policy = { onehot(type) }
            }
        }"#,
    )
    .expect_err("should fail validation");
    assert!(err
        .iter()
        .any(|d| d.message == "Encoder \"Enc\" references unknown sensor: Ghost"));
}

#[test]
fn rejects_zero_width_hash_op() {
    let err = compile(
        r#"app A {
            sensor Ui : events(click)
            encoder Enc {
                in = [Ui.*]
                out = FeatureVector dim=8
                policy = { hash(target, 0) }
            }
        }"#,
    )
    .expect_err("should fail validation");
    assert!(err
        .iter()
        .any(|d| d.message == "Encoder \"Enc\" hash buckets must be > 0"));
}

#[test]
fn rejects_unsafe_binding() {
    let err = compile(
        r#"app A { effector Out { bind go -> js("window.alert(1)") } }"#,
    )
    .expect_err("should fail validation");
    assert!(err[0].message.starts_with("Unsafe js binding"));
}

#[test]
fn reports_all_parse_errors_at_once() {
    let err = compile(
        r#"app A {
            sensor Ui : clicks(click)
            sensor : events(tap)
        }"#,
    )
    .expect_err("should fail parsing");
    assert_eq!(err.len(), 2);
    assert!(err.iter().all(|d| d.severity == Severity::Error));
}

#[test]
fn warnings_pass_through_on_success() {
    let out = compile("app A { circuit C { actions = [go] } }").expect("compile");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn script_generator_runs_over_ir() {
    struct Stub;
    impl ScriptGenerator for Stub {
        fn generate(&self, ir: &AppIr) -> String {
            format!("// {}", ir.name)
        }
    }
    let out = reflex_compiler::compile_with_generator("app A { }", &Stub).expect("compile");
    assert_eq!(out.script.as_deref(), Some("// A"));
}
