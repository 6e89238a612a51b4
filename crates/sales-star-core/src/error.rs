// crates/sales-star-core/src/error.rs

use serde::Serialize;
use thiserror::Error;

/// Coarse failure reason, stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    MissingInput,
    Parse,
    MissingColumn,
    DateParse,
    InvalidMeasure,
    Storage,
    Packaging,
    Config,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("required input {file} not found in {location}")]
    MissingInput {
        file: &'static str,
        location: String,
    },

    #[error("{file} is not well-formed CSV: {message}")]
    Parse {
        file: &'static str,
        message: String,
    },

    #[error("{table} is missing required column {column}")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{column} row {row} holds unparseable date '{value}'")]
    DateParse {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("{column} row {row} holds non-numeric value '{value}'")]
    InvalidMeasure {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("Object store error: {0}")]
    Bucket(#[from] sales_star_bucket::BucketError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::MissingInput { .. } => ErrorKind::MissingInput,
            EtlError::Parse { .. } => ErrorKind::Parse,
            EtlError::MissingColumn { .. } => ErrorKind::MissingColumn,
            EtlError::DateParse { .. } => ErrorKind::DateParse,
            EtlError::InvalidMeasure { .. } => ErrorKind::InvalidMeasure,
            EtlError::Bucket(_) => ErrorKind::Storage,
            EtlError::Polars(_) | EtlError::Io(_) | EtlError::Archive(_) => ErrorKind::Packaging,
            EtlError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
