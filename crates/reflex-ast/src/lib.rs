//! AST for the Reflex DSL.
//!
//! The AST is an immutable tree built once per compile, close to the surface
//! syntax. No name resolution happens here; qualified names are kept as the
//! author wrote them (dotted strings) and resolved by `reflex-resolve`.
//!
//! Every alternation in the grammar is an exhaustive sum type, so later
//! passes match on variants instead of inspecting string discriminants.

pub mod ast;

pub use ast::*;
pub use reflex_lexer::{TimeUnit, TimeValue};

/// Byte range into the source text.
pub type Span = std::ops::Range<usize>;
