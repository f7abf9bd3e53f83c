//! File-backed record stores.

mod appointments;
mod patients;
mod record;

pub use appointments::*;
pub use patients::*;
pub use record::*;

use std::path::PathBuf;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing file exists but does not parse; it is left untouched.
    #[error("Store file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The backing file parses but violates a store invariant.
    #[error("Store file {} is inconsistent: {message}", .path.display())]
    Inconsistent { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    /// Whether the error means the backing file cannot be trusted.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. } | StoreError::Inconsistent { .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
