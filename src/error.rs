//! Error type shared by the fallible parts of the crate.
//!
//! Genetic operators never fail through this type: a splice that would
//! overflow an expression's capacity is reported with `Option`/`bool` and
//! retried by the caller. `SymregError` covers input and configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymregError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parse error at token {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("expression has {len} nodes, limit is {max}")]
    ExpressionTooLong { len: usize, max: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot split {rows} rows into {k} folds")]
    InvalidFolds { k: usize, rows: usize },
}

pub type Result<T> = std::result::Result<T, SymregError>;
