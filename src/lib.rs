//! `jsonmap` — a small DSL for transforming JSON documents into other
//! JSON documents.
//!
//! The public surface is a single function, [`translate`], built from
//! three pure stages: [`lexer::tokenize`] (source text to tokens),
//! [`parser::parse_program`] (tokens to a [`Program`](ast::Program)),
//! and [`eval::translate`] (program + input value to output value).

pub mod ast;
pub mod env;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{JsonMapError, Result};
use serde_json::Value;

/// Translates `program_text` against `input_json`, producing the output
/// JSON value described by spec §6:
///
/// ```text
/// translate(program_text: string, input_json: Value) -> Result<Value, Error>
/// ```
///
/// Reentrant and safe to call concurrently from independent threads —
/// each call only touches the AST and JSON values it builds itself
/// (spec §5).
pub fn translate(program_text: &str, input_json: Value) -> Result<Value> {
    let tokens = lexer::tokenize(program_text)?;
    let program = parser::parse_program(tokens)?;
    eval::translate(&program, input_json)
}
