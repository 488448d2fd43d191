//! Error types for survey generation and reporting

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the generator and the report builder
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV header has no `{0}` column")]
    MissingGroupColumn(String),

    #[error("line {line}: column `{column}` has non-numeric value `{value}`")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("no target mean for group `{group}`, indicator `{indicator}`")]
    MissingTarget { group: String, indicator: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("spread must be finite and non-negative, got {0}")]
    InvalidSpread(f64),

    #[error("cannot load font {path:?}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, SurveyError>;
