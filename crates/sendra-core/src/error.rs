// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sendra bulk-messaging core.

use thiserror::Error;

/// The primary error type used across all Sendra components.
///
/// Variants follow the failure taxonomy of the messaging core: validation
/// failures surface before any state change, conflicts leave the entity
/// untouched, and gateway errors are recorded per message rather than
/// aborting a batch.
#[derive(Debug, Error)]
pub enum SendraError {
    /// Invalid input or missing preconditions (no template configured,
    /// empty recipient set, missing recipient data). No state change.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation conflicts with the entity's current state
    /// (deleting a processing campaign, starting from a terminal state).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced campaign, contact, or message does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A messaging gateway call failed. Recorded on the affected message
    /// only; never escalated to abort a dispatch run.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure,
    /// serialization). Fatal for the in-progress operation.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SendraError {
    /// Shorthand for a [`SendraError::NotFound`] with the given entity name.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        SendraError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
