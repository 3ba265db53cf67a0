//! Reflex compiler.
//!
//! Unified entry point for the Reflex DSL compilation pipeline:
//! lex, parse, validate, lower. Each phase reports through the shared
//! [`Diagnostic`] type; compilation stops after the first phase that
//! produced an error, carrying every diagnostic gathered so far.

pub mod ir;
mod lower;

pub use ir::AppIr;
pub use lower::{lower, SCOPE_SEP};
pub use reflex_resolve::{Diagnostic, Severity};

use reflex_ast::App;
use tracing::debug;

/// Everything the pipeline produces for a successfully compiled program.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The parsed, validated AST.
    pub ast: App,
    /// The lowered module graph.
    pub ir: AppIr,
    /// The IR serialized as pretty JSON, for graph inspectors.
    pub graph_json: String,
    /// Generated host script, when a generator was supplied.
    pub script: Option<String>,
    /// Non-fatal diagnostics (warnings) from validation.
    pub diagnostics: Vec<Diagnostic>,
}

/// Emits a host-language driver script from compiled IR.
///
/// Script generation is host-specific and deliberately outside the
/// pipeline; implement this to target a particular embedding.
pub trait ScriptGenerator {
    fn generate(&self, ir: &AppIr) -> String;
}

/// Compile Reflex source into IR.
///
/// Returns all diagnostics of the failing phase on error: every syntax
/// error from one parse, or every validation error from one validation run.
pub fn compile(source: &str) -> Result<CompileOutput, Vec<Diagnostic>> {
    let tokens = reflex_lexer::lex(source).map_err(|err| vec![Diagnostic::error(err.to_string())])?;
    debug!(tokens = tokens.len(), "lexed");

    let app = reflex_parser::parse(&tokens).map_err(|errors| {
        errors
            .into_iter()
            .map(|err| Diagnostic::error(err.message.clone()).with_span(err.span))
            .collect::<Vec<_>>()
    })?;
    debug!(app = %app.name, declarations = app.declarations.len(), "parsed");

    let diagnostics = reflex_resolve::validate(&app);
    if diagnostics.iter().any(Diagnostic::is_error) {
        return Err(diagnostics);
    }
    debug!(warnings = diagnostics.len(), "validated");

    let ir = lower(&app);
    let graph_json = serde_json::to_string_pretty(&ir)
        .map_err(|err| vec![Diagnostic::error(format!("failed to serialize graph: {err}"))])?;
    debug!(modules = ir.modules.len(), "lowered");

    Ok(CompileOutput {
        ast: app,
        ir,
        graph_json,
        script: None,
        diagnostics,
    })
}

/// Compile and additionally run a [`ScriptGenerator`] over the IR.
pub fn compile_with_generator(
    source: &str,
    generator: &dyn ScriptGenerator,
) -> Result<CompileOutput, Vec<Diagnostic>> {
    let mut output = compile(source)?;
    output.script = Some(generator.generate(&output.ir));
    Ok(output)
}
