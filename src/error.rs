//! Level loading errors.

use thiserror::Error;

/// Errors raised while reading or parsing a level.
#[derive(Error, Debug)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("level {0} does not exist")]
    Missing(usize),
    #[error("level has no grid rows")]
    EmptyGrid,
    #[error("line {line}: expected {expected} columns, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid number '{token}'")]
    BadToken { line: usize, token: String },
    #[error("line {line}: unknown cell code {code}")]
    UnknownCell { line: usize, code: i64 },
}
