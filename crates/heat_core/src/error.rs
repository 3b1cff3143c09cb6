//! Error taxonomy shared by every backend and the validation harness.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring, running, exporting or loading a heat run.
#[derive(Debug, Error)]
pub enum HeatError {
    /// Invalid grid size, step count or physical parameter. Fatal to the run.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A comparison grid does not have the reference grid's shape.
    #[error("shape mismatch: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A result file exists but does not follow the result format.
    #[error("malformed result file {} (line {line}): {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The field left the bounded regime, typically because `dt` broke the stability bound.
    #[error("numeric instability after step {step}: |u| reached {value:e}")]
    NumericInstability { step: u64, value: f64 },

    #[error("GPU backend error: {0}")]
    Gpu(String),
}

impl HeatError {
    pub fn configuration(message: impl Into<String>) -> Self {
        HeatError::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HeatError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn gpu(message: impl std::fmt::Display) -> Self {
        HeatError::Gpu(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HeatError>;
