//! Effector binding safety pass.
//!
//! `js("...")` binding targets are restricted to a single effect call of the
//! form `fx.<ident>(arg, ...)` where each argument is `ctx`, a `ctx.<field>`
//! access, a double-quoted string, or a number literal. Anything else is
//! rejected so a program can never smuggle arbitrary host code through a
//! binding.

use crate::diagnostic::Diagnostic;
use reflex_ast::{App, BindingTarget, Declaration};
use regex::Regex;
use std::sync::LazyLock;

static JS_BINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^fx\.\w+\((?:(?:ctx(?:\.\w+)?|"[^"]*"|\d+(?:\.\d+)?)(?:\s*,\s*(?:ctx(?:\.\w+)?|"[^"]*"|\d+(?:\.\d+)?))*)?\)$"#,
    )
    .expect("binding pattern is valid")
});

pub fn check_binding_safety(app: &App, diags: &mut Vec<Diagnostic>) {
    for decl in &app.declarations {
        if let Declaration::Effector(effector) = decl {
            for binding in &effector.bindings {
                if let BindingTarget::Js(expr) = &binding.target {
                    if !JS_BINDING_RE.is_match(expr) {
                        diags.push(
                            Diagnostic::error(format!(
                                "Unsafe js binding for \"{}\": \"{}\". \
                                 Must match fx.<ident>(<ctx|ctx.field|literal>...)",
                                binding.action, expr
                            ))
                            .with_span(binding.span.clone()),
                        );
                    }
                }
            }
        }
    }
}
