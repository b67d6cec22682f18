// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status tracking from gateway callbacks.

use sendra_core::{SendraError, StatusEvent};
use sendra_storage::{Database, StatusAdvance};
use sendra_storage::queries::messages;
use tracing::{debug, info};

/// Applies asynchronous status events to campaign messages.
///
/// Events arrive out of order and duplicated; the store only moves a
/// message forward, so applying them in any order converges on the same
/// final state.
#[derive(Clone)]
pub struct StatusTracker {
    db: Database,
}

impl StatusTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Apply one status event, keyed by external message id.
    ///
    /// Unknown external ids are an error; callers decide whether to drop
    /// or dead-letter the event.
    pub async fn apply(&self, event: &StatusEvent) -> Result<StatusAdvance, SendraError> {
        let outcome = messages::advance_status(
            &self.db,
            &event.external_message_id,
            event.status,
            &event.timestamp,
        )
        .await?;

        match outcome {
            StatusAdvance::Applied => info!(
                external_message_id = %event.external_message_id,
                status = %event.status,
                "status event applied"
            ),
            StatusAdvance::Ignored => debug!(
                external_message_id = %event.external_message_id,
                status = %event.status,
                "stale or duplicate status event ignored"
            ),
        }
        Ok(outcome)
    }
}
