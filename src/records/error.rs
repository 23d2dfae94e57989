//! Record error types
//!
//! Only structurally invalid input is an error. Sparse or non-finite data
//! is never raised; analyses simply omit what they cannot compute.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a record-set
#[derive(Error, Debug)]
pub enum RecordError {
    /// The record-set root is not an object keyed by category
    #[error("Contract violation: record-set must be an object keyed by category")]
    NotAnObject,

    /// A category value is not a list of records
    #[error("Contract violation: category '{category}' must be a list of records")]
    CategoryNotList { category: String },

    /// A record inside a category is not an object
    #[error("Contract violation: record {index} in '{category}' is not an object")]
    RecordNotObject { category: String, index: usize },

    /// A record has no `date` field
    #[error("Contract violation: record {index} in '{category}' is missing 'date'")]
    MissingDate { category: String, index: usize },

    /// A record's `date` is not an ISO calendar date
    #[error("Contract violation: record {index} in '{category}' has invalid date '{value}'")]
    InvalidDate {
        category: String,
        index: usize,
        value: String,
    },

    /// I/O operation failed
    #[error("IO error reading {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    /// JSON parsing failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl RecordError {
    /// Whether this error is an input-contract violation (as opposed to I/O)
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            RecordError::NotAnObject
                | RecordError::CategoryNotList { .. }
                | RecordError::RecordNotObject { .. }
                | RecordError::MissingDate { .. }
                | RecordError::InvalidDate { .. }
        )
    }
}

/// Result type alias for record operations
pub type RecordResult<T> = Result<T, RecordError>;
