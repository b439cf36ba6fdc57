//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Patch error: {0}")]
    Patch(#[from] crate::engine::PatchError),

    #[error("Transaction {given} is not the active draft")]
    StaleTransaction { given: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
