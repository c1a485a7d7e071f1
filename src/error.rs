//! Error type shared by the lexer, parser, and evaluator.

use thiserror::Error;

/// The six error kinds a `jsonmap` translation can fail with.
///
/// Every variant carries enough context — a source position for lexical
/// and syntactic failures, an evaluation path for everything else — to
/// point a caller at the exact spot that went wrong.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonMapError {
    #[error("lex error at {line}:{column}: {message}")]
    Lex {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("missing field `{field}` at {path}")]
    MissingField { path: String, field: String },

    #[error("index {index} out of bounds (length {length}) at {path}")]
    OutOfBounds {
        path: String,
        index: usize,
        length: usize,
    },

    #[error("type mismatch at {path}: expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("duplicate key `{key}` at {path}")]
    DuplicateKey { path: String, key: String },
}

pub type Result<T> = std::result::Result<T, JsonMapError>;
