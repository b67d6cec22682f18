// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message provisioning: materializing one pending message per recipient.

use sendra_core::SendraError;
use sendra_storage::Database;
use sendra_storage::queries::{campaigns, messages};
use tracing::info;

/// Creates pending message rows for a campaign's recipients.
///
/// Idempotent on `(campaign, contact)`: re-provisioning an overlapping
/// recipient list only adds the new pairs.
pub struct Provisioner {
    db: Database,
}

impl Provisioner {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Provision one pending message per contact ID, optionally attaching
    /// template parameters to the new rows.
    ///
    /// Returns the number of rows actually added. The campaign must have a
    /// template configured and must not be finished; the contact list must
    /// be non-empty and is assumed already resolved (the registry verified
    /// existence).
    pub async fn provision(
        &self,
        campaign_id: &str,
        contact_ids: &[String],
        params: Option<&serde_json::Value>,
    ) -> Result<usize, SendraError> {
        if contact_ids.is_empty() {
            return Err(SendraError::Validation("recipient set is empty".into()));
        }

        let campaign = campaigns::get_campaign(&self.db, campaign_id)
            .await?
            .ok_or_else(|| SendraError::not_found("campaign", campaign_id))?;

        if campaign.status.is_terminal() {
            return Err(SendraError::Conflict(format!(
                "cannot provision messages for a {} campaign",
                campaign.status
            )));
        }

        let template_id = campaign
            .settings
            .template_id
            .ok_or_else(|| SendraError::Validation("campaign has no template configured".into()))?;

        let params_json = params
            .map(|p| {
                serde_json::to_string(p).map_err(|e| {
                    SendraError::Validation(format!("template parameters are not valid JSON: {e}"))
                })
            })
            .transpose()?;

        let mut added = 0usize;
        for contact_id in contact_ids {
            if messages::provision_message(
                &self.db,
                campaign_id,
                contact_id,
                &template_id,
                params_json.clone(),
            )
            .await?
            {
                added += 1;
            }
        }

        info!(
            campaign_id,
            recipients = contact_ids.len(),
            added,
            "provisioned campaign messages"
        );
        Ok(added)
    }
}
