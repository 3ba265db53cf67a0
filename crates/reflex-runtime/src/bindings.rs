//! Effect bindings: parsed call shapes and the host-side sink.
//!
//! A `js("fx.move(ctx.target, \"left\", 2)")` binding is parsed once at
//! instance build time into an [`EffectCall`]; the validator has already
//! guaranteed the restricted shape, so parsing here is a structural
//! decomposition, not a safety check.

use crate::error::RuntimeError;
use crate::types::{ContextState, PayloadValue};

/// One argument of an effect call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    /// Bare `ctx`.
    Ctx,
    /// `ctx.<field>` access.
    CtxField(String),
    /// Double-quoted string literal.
    Str(String),
    /// Number literal.
    Num(f64),
}

impl CallArg {
    /// Resolve the argument against a context, producing a payload value.
    /// Bare `ctx` resolves to the context target.
    pub fn resolve(&self, ctx: &ContextState) -> PayloadValue {
        match self {
            CallArg::Ctx => PayloadValue::Text(ctx.target.clone()),
            CallArg::CtxField(field) => ctx
                .field(field)
                .cloned()
                .unwrap_or(PayloadValue::Text(String::new())),
            CallArg::Str(s) => PayloadValue::Text(s.clone()),
            CallArg::Num(n) => PayloadValue::Num(*n),
        }
    }
}

/// A parsed `fx.<function>(args...)` effect call.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectCall {
    pub function: String,
    pub args: Vec<CallArg>,
}

impl EffectCall {
    /// Parse a restricted binding expression.
    pub fn parse(action: &str, expr: &str) -> Result<Self, RuntimeError> {
        let invalid = || RuntimeError::InvalidBinding {
            action: action.to_owned(),
            expr: expr.to_owned(),
        };

        let rest = expr.strip_prefix("fx.").ok_or_else(invalid)?;
        let open = rest.find('(').ok_or_else(invalid)?;
        let function = &rest[..open];
        if function.is_empty() || !function.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid());
        }
        let body = rest[open + 1..].strip_suffix(')').ok_or_else(invalid)?;

        let mut args = Vec::new();
        if !body.trim().is_empty() {
            for raw in split_args(body) {
                let raw = raw.trim();
                let arg = if raw == "ctx" {
                    CallArg::Ctx
                } else if let Some(field) = raw.strip_prefix("ctx.") {
                    CallArg::CtxField(field.to_owned())
                } else if raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2 {
                    CallArg::Str(raw[1..raw.len() - 1].to_owned())
                } else if let Ok(n) = raw.parse::<f64>() {
                    CallArg::Num(n)
                } else {
                    return Err(invalid());
                };
                args.push(arg);
            }
        }

        Ok(Self {
            function: function.to_owned(),
            args,
        })
    }
}

/// Split a call body on commas outside string literals. The restricted
/// grammar has no nesting, so a quote flag is all the state needed.
fn split_args(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_string = !in_string,
            ',' if !in_string => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Receives every effect the runtime decides to emit.
///
/// `call` is `None` for `noop` bindings and for winning actions without a
/// binding in the target effector.
pub trait ActionSink {
    fn emit(&mut self, action: &str, call: Option<&EffectCall>, ctx: &ContextState);
}

/// Sink that drops every effect. Useful for headless runs and tests that
/// only inspect snapshots.
#[derive(Debug, Default)]
pub struct NullSink;

impl ActionSink for NullSink {
    fn emit(&mut self, _action: &str, _call: Option<&EffectCall>, _ctx: &ContextState) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_no_arg_call() {
        let call = EffectCall::parse("go", "fx.ping()").expect("parse");
        assert_eq!(call.function, "ping");
        assert!(call.args.is_empty());
    }

    #[test]
    fn parses_mixed_args() {
        let call =
            EffectCall::parse("go", r#"fx.move(ctx, ctx.target, "left, fast", 2.5)"#).expect("parse");
        assert_eq!(call.function, "move");
        assert_eq!(
            call.args,
            vec![
                CallArg::Ctx,
                CallArg::CtxField("target".into()),
                CallArg::Str("left, fast".into()),
                CallArg::Num(2.5),
            ]
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in ["alert(1)", "fx.", "fx.go", "fx.go(", "fx.go(foo)"] {
            assert!(
                EffectCall::parse("go", expr).is_err(),
                "accepted {expr:?}"
            );
        }
    }

    #[test]
    fn resolves_args_against_context() {
        let mut ctx = ContextState::default();
        ctx.target = "button".into();
        ctx.meta
            .insert("key".into(), PayloadValue::Text("enter".into()));

        let call = EffectCall::parse("go", r#"fx.send(ctx, ctx.key, ctx.missing, 3)"#)
            .expect("parse");
        let resolved: Vec<PayloadValue> =
            call.args.iter().map(|a| a.resolve(&ctx)).collect();
        assert_eq!(
            resolved,
            vec![
                PayloadValue::Text("button".into()),
                PayloadValue::Text("enter".into()),
                PayloadValue::Text(String::new()),
                PayloadValue::Num(3.0),
            ]
        );
    }
}
