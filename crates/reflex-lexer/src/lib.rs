// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for the Reflex DSL.
//!
//! Tokenization is done with logos. Rules worth knowing:
//!
//! - Whitespace and `//` / `/* */` comments are stripped during lexing
//! - Multi-character symbols win over single-character ones (`->` before `.`)
//! - Time literals (`250ms`, `2s`, `1.5m`) are matched before plain numbers
//!   so the unit suffix is never split off as an identifier
//! - Keywords only match when not followed by further identifier characters
//!   (maximal munch: `runner` lexes as an identifier, `run` as a keyword)
//!
//! Parameter names that only ever appear inside argument lists (`p`, `seed`,
//! `radius`, `temp`, `tau`, `refr`, `trace`, `window`) are deliberately NOT
//! keywords; the parser matches them by identifier text.

use logos::Logos;
use std::fmt;
use thiserror::Error;

/// Time unit suffix of a time literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
}

/// A typed time literal, e.g. `250ms` or `1.5s`.
///
/// Parsed at lex time so downstream stages never see raw literal text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeValue {
    pub value: f64,
    pub unit: TimeUnit,
}

impl TimeValue {
    /// Convert to milliseconds (`ms` ×1, `s` ×1000, `m` ×60000).
    pub fn to_ms(self) -> f64 {
        match self.unit {
            TimeUnit::Millis => self.value,
            TimeUnit::Seconds => self.value * 1000.0,
            TimeUnit::Minutes => self.value * 60_000.0,
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TimeUnit::Millis => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
        };
        write!(f, "{}{}", self.value, unit)
    }
}

fn parse_time(slice: &str) -> Option<TimeValue> {
    let (num, unit) = if let Some(num) = slice.strip_suffix("ms") {
        (num, TimeUnit::Millis)
    } else if let Some(num) = slice.strip_suffix('s') {
        (num, TimeUnit::Seconds)
    } else if let Some(num) = slice.strip_suffix('m') {
        (num, TimeUnit::Minutes)
    } else {
        return None;
    };
    num.parse::<f64>().ok().map(|value| TimeValue { value, unit })
}

/// Unescape a string literal body (without the surrounding quotes).
fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(_) => return None,
                None => return None,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Reflex DSL token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip // comments
#[logos(skip r"/\*([^*]|\*[^/])*\*/")] // Skip /* */ comments
pub enum Token {
    // === Declaration heads ===
    #[token("app")]
    App,
    #[token("sensor")]
    Sensor,
    #[token("encoder")]
    Encoder,
    #[token("region")]
    Region,
    #[token("population")]
    Population,
    #[token("projection")]
    Projection,
    #[token("circuit")]
    Circuit,
    #[token("modulator")]
    Modulator,
    #[token("effector")]
    Effector,
    #[token("runtime")]
    Runtime,
    #[token("plasticity")]
    Plasticity,

    // === Encoder structure ===
    #[token("events")]
    Events,
    #[token("in")]
    In,
    #[token("out")]
    Out,
    #[token("FeatureVector")]
    FeatureVector,
    #[token("dim")]
    Dim,
    #[token("policy")]
    Policy,

    // === Feature ops ===
    #[token("onehot")]
    Onehot,
    #[token("bucket")]
    Bucket,
    #[token("hash")]
    Hash,
    #[token("numeric")]
    Numeric,
    #[token("clamp")]
    Clamp,
    #[token("scale")]
    Scale,

    // === Population kinds & fields ===
    #[token("state")]
    State,
    #[token("spiking")]
    Spiking,
    #[token("recurrent")]
    Recurrent,
    #[token("rate")]
    Rate,
    #[token("winner_take_all")]
    WinnerTakeAll,
    #[token("slots")]
    Slots,
    #[token("decay")]
    Decay,
    #[token("merge")]
    Merge,
    #[token("neurons")]
    Neurons,
    #[token("neuron")]
    Neuron,
    #[token("LIF")]
    Lif,
    #[token("target_rate")]
    TargetRate,
    #[token("inhibition")]
    Inhibition,
    #[token("units")]
    Units,
    #[token("len")]
    Len,
    #[token("dt")]
    Dt,

    // === Projection structure ===
    #[token("topology")]
    Topology,
    #[token("weight_init")]
    WeightInit,
    #[token("rule")]
    Rule,
    #[token("dense")]
    Dense,
    #[token("sparse_random")]
    SparseRandom,
    #[token("local")]
    Local,
    #[token("linear")]
    Linear,
    #[token("softmax")]
    Softmax,
    #[token("normal")]
    Normal,
    #[token("uniform")]
    Uniform,
    #[token("constant")]
    Constant,
    #[token("hebbian")]
    Hebbian,
    #[token("none")]
    NoneKw,

    // === Circuit / modulator ===
    #[token("actions")]
    Actions,
    #[token("source")]
    Source,
    #[token("reward")]
    Reward,

    // === Effector ===
    #[token("bind")]
    Bind,
    #[token("js")]
    Js,
    #[token("noop")]
    Noop,

    // === Runtime ===
    #[token("tick")]
    Tick,
    #[token("RAF")]
    Raf,
    #[token("step")]
    Step,
    #[token("ingest")]
    Ingest,
    #[token("run")]
    Run,
    #[token("emit")]
    Emit,
    #[token("from")]
    From,
    #[token("when")]
    When,
    #[token("winner_only")]
    WinnerOnly,
    #[token("guards")]
    Guards,
    #[token("max_effects_per_sec")]
    MaxEffectsPerSec,
    #[token("suppress_repeats")]
    SuppressRepeats,
    #[token("keep_target_rate")]
    KeepTargetRate,

    // === Symbols ===
    /// Symbol `->` (matched before `.` and `-` adjacency matters)
    #[token("->")]
    Arrow,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("=")]
    Equals,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("*")]
    Star,

    // === Literals ===
    /// String literal, unescaped during lexing.
    #[regex(r#""(?:[^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    String(String),

    /// Time literal: digits, optional fraction, mandatory unit suffix.
    ///
    /// Must be tried before `Number` so `250ms` is never split into a
    /// number and an identifier; maximal munch plus the explicit priority
    /// guarantees that.
    #[regex(r"[0-9]+(\.[0-9]+)?(ms|s|m)", |lex| parse_time(lex.slice()), priority = 10)]
    Time(TimeValue),

    /// Numeric literal (integer or decimal, no sign).
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Identifier (names, and parameter names like `p`, `seed`, `temp`).
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

/// Lex failure: the first character no rule matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lex error at {line}:{column}: unexpected character")]
pub struct LexError {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

/// Compute 1-based line/column for a byte offset.
fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut column = 1u32;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Tokenize a source string into spanned tokens.
///
/// Pure function of the input: identical input always yields an identical
/// token stream. Fails with a positioned [`LexError`] on the first
/// unmatched character.
pub fn lex(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let (line, column) = line_column(source, span.start);
                return Err(LexError {
                    offset: span.start,
                    line,
                    column,
                });
            }
        }
    }
    Ok(tokens)
}
