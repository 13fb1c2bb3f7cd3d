//! Pargolo - reconcile declared configuration parameters with a parameter store.
//!
//! This library provides the core functionality for the `pargolo` CLI tool:
//! classifying a desired state against the store, uploading it, and
//! searching and exporting what the store already holds.

pub mod apply;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod index;
pub mod loader;
pub mod logging;
pub mod models;
pub mod resolve;
pub mod storage;
pub mod template;

use storage::StoreError;


/// Error types for Pargolo operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed record {record}: {reason}")]
    MalformedRecord { record: usize, reason: String },

    #[error("Refusing to overwrite shared parameters with different values: {}", .0.join(", "))]
    DestructiveChange(Vec<String>),
}

impl Error {
    /// Whether the command was stopped by Ctrl-C or its deadline.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::Cancelled | StoreError::DeadlineExceeded)
        )
    }
}

/// Result type alias for Pargolo operations.
pub type Result<T> = std::result::Result<T, Error>;
