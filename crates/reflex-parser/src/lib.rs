//! Hand-written recursive descent parser for the Reflex DSL.
//!
//! The parser is a set of stateless functions over a [`stream::TokenStream`];
//! there is no shared parser instance, so concurrent compiles never interfere.
//!
//! Lookahead is bounded and only used at the grammar's fixed alternation
//! points (declaration heads, population kinds, topology kinds, step
//! commands, guards). There is no backtracking and no in-declaration error
//! recovery: a mismatch fails the current declaration, the stream
//! synchronizes to the next declaration keyword, and parsing continues so
//! that one failed parse reports every syntax error seen.

mod decl;
mod error;
mod stream;

pub use error::{ParseError, ParseErrorKind};

use reflex_ast::App;
use reflex_lexer::Token;
use std::ops::Range;
use stream::TokenStream;

/// Parse a spanned token stream into an [`App`].
///
/// Returns the AST only when the whole input parsed cleanly; otherwise
/// every syntax error encountered is returned and no partial AST escapes.
pub fn parse(tokens: &[(Token, Range<usize>)]) -> Result<App, Vec<ParseError>> {
    let mut stream = TokenStream::new(tokens);
    decl::parse_app(&mut stream)
}
