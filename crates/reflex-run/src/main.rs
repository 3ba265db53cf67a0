//! Reflex Run - compiles a program and drives it for a fixed tick budget.
//!
//! Effects reach a logging sink; pair with `--graph` to dump the module
//! graph JSON for inspection.

use clap::Parser;
use reflex_compiler::ir::TickIr;
use reflex_runtime::{ActionSink, ContextState, EffectCall, Instance, Scheduler};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "reflex-run")]
#[command(about = "Compile and run a Reflex program")]
struct Cli {
    /// Path to a .rfx source file
    program: PathBuf,

    /// Number of ticks to run (0 = compile only)
    #[arg(long, default_value = "0")]
    ticks: u64,

    /// Seed for selector weight initialization
    #[arg(long, default_value = "42")]
    seed: u32,

    /// Print the module graph JSON and exit
    #[arg(long)]
    graph: bool,
}

/// Sink that logs every emitted effect.
struct LogSink;

impl ActionSink for LogSink {
    fn emit(&mut self, action: &str, call: Option<&EffectCall>, ctx: &ContextState) {
        match call {
            Some(call) => info!(action, function = %call.function, target = %ctx.target, "effect"),
            None => info!(action, target = %ctx.target, "effect (noop)"),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reflex_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.program) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to read {}: {}", cli.program.display(), e);
            std::process::exit(1);
        }
    };

    let output = match reflex_compiler::compile(&source) {
        Ok(output) => output,
        Err(diagnostics) => {
            for diag in &diagnostics {
                error!("{}", diag.message);
            }
            error!("Compilation failed with {} diagnostic(s)", diagnostics.len());
            std::process::exit(1);
        }
    };

    for diag in &output.diagnostics {
        info!("warning: {}", diag.message);
    }
    info!(
        app = %output.ir.name,
        modules = output.ir.modules.len(),
        steps = output.ir.runtime.steps.len(),
        "compiled"
    );

    if cli.graph {
        println!("{}", output.graph_json);
        return;
    }

    if cli.ticks == 0 {
        return;
    }

    let mut instance = match Instance::new(&output.ir, cli.seed, LogSink) {
        Ok(instance) => instance,
        Err(e) => {
            error!("Failed to wire instance: {}", e);
            std::process::exit(1);
        }
    };

    match output.ir.runtime.tick {
        TickIr::Interval { ms } => {
            info!(interval_ms = ms, ticks = cli.ticks, "running");
            let mut scheduler =
                Scheduler::new(output.ir.runtime.tick, move |now| instance.tick(now));
            scheduler.run_interval(cli.ticks).await;
            info!(ticks = scheduler.ticks(), "done");
        }
        TickIr::Raf => {
            // No host frame source here; step at a nominal 60Hz cadence.
            info!(ticks = cli.ticks, "running frame-mode at 60Hz");
            for i in 0..cli.ticks {
                let now = i as f64 * (1000.0 / 60.0);
                if let Err(e) = instance.tick(now) {
                    error!("Tick failed: {}", e);
                    std::process::exit(1);
                }
            }
            info!(ticks = cli.ticks, "done");
        }
    }
}
