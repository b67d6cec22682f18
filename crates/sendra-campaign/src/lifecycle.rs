// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign lifecycle orchestration.
//!
//! [`CampaignService`] owns the state machine: guarded transitions go
//! through the store's compare-and-set updates, and each running dispatch
//! is registered in an in-process map so `pause` and `cancel` can stop it
//! between messages.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sendra_config::DispatchConfig;
use sendra_core::{
    Campaign, CampaignMessage, CampaignSettings, CampaignStatus, MessageCounts, MessagingGateway,
    SendraError, now_iso,
};
use sendra_storage::queries::{campaigns, messages};
use sendra_storage::{Database, DeleteOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatch::{DispatchSummary, run_dispatch};

/// A campaign together with its per-status message counts.
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    pub campaign: Campaign,
    pub counts: MessageCounts,
}

/// Campaign lifecycle operations over a shared store and gateway.
///
/// Clone-cheap: clones share the store connection, the gateway, and the
/// active-run registry.
#[derive(Clone)]
pub struct CampaignService {
    db: Database,
    gateway: Arc<dyn MessagingGateway>,
    dispatch: DispatchConfig,
    active: Arc<DashMap<String, CancellationToken>>,
}

impl CampaignService {
    pub fn new(db: Database, gateway: Arc<dyn MessagingGateway>, dispatch: DispatchConfig) -> Self {
        Self {
            db,
            gateway,
            dispatch,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Create a campaign in `draft`.
    pub async fn create(
        &self,
        owner_id: &str,
        phone_number_id: &str,
        name: &str,
    ) -> Result<Campaign, SendraError> {
        if name.trim().is_empty() {
            return Err(SendraError::Validation("campaign name is empty".into()));
        }
        let campaign = Campaign::new(owner_id.into(), phone_number_id.into(), name.into());
        campaigns::create_campaign(&self.db, &campaign).await?;
        info!(campaign_id = %campaign.id, owner_id, "campaign created");
        Ok(campaign)
    }

    pub async fn get(&self, id: &str) -> Result<Campaign, SendraError> {
        campaigns::get_campaign(&self.db, id)
            .await?
            .ok_or_else(|| SendraError::not_found("campaign", id))
    }

    pub async fn list(
        &self,
        status: Option<CampaignStatus>,
    ) -> Result<Vec<Campaign>, SendraError> {
        campaigns::list_campaigns(&self.db, status).await
    }

    /// Attach a template to the campaign's settings blob.
    pub async fn set_template(
        &self,
        id: &str,
        template_id: &str,
        template_name: &str,
        language_code: &str,
    ) -> Result<CampaignSettings, SendraError> {
        let mut patch = serde_json::Map::new();
        patch.insert("template_id".into(), template_id.into());
        patch.insert("template_name".into(), template_name.into());
        patch.insert("language_code".into(), language_code.into());
        campaigns::merge_settings(&self.db, id, patch).await
    }

    /// Store a response-routing rule in the settings blob.
    pub async fn set_response_routing(
        &self,
        id: &str,
        routing: serde_json::Value,
    ) -> Result<CampaignSettings, SendraError> {
        let mut patch = serde_json::Map::new();
        patch.insert("response_routing".into(), routing);
        campaigns::merge_settings(&self.db, id, patch).await
    }

    /// Schedule a draft campaign for a future start.
    pub async fn schedule(&self, id: &str, at: &str) -> Result<Campaign, SendraError> {
        let campaign = self.get(id).await?;
        if !campaigns::set_scheduled(&self.db, id, at).await? {
            return Err(SendraError::Conflict(format!(
                "only a draft campaign can be scheduled (current state: {})",
                campaign.status
            )));
        }
        self.get(id).await
    }

    /// Start (or resume) a campaign and run dispatch to completion.
    ///
    /// Valid from `draft`, `scheduled`, and `paused`. The campaign enters
    /// `processing`, the pending batch is dispatched sequentially, and on
    /// an uninterrupted run the campaign lands in `completed`. A run
    /// interrupted by [`pause`](Self::pause) or [`cancel`](Self::cancel)
    /// leaves the remaining messages pending and the campaign in the state
    /// those calls set.
    pub async fn start(&self, id: &str) -> Result<DispatchSummary, SendraError> {
        let campaign = self.get(id).await?;
        if !campaign.status.can_start() {
            return Err(SendraError::Conflict(format!(
                "cannot start a {} campaign",
                campaign.status
            )));
        }

        // The token must be registered before the status flip: once the row
        // reads `processing`, a pause() or cancel() has to find something to
        // cancel. Entry keeps registration and the already-running check in
        // one atomic step.
        let token = CancellationToken::new();
        match self.active.entry(id.to_string()) {
            Entry::Occupied(_) => {
                return Err(SendraError::Conflict("campaign is already running".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }

        let summary = self.run_batch(id, campaign.status, &token).await;
        self.active.remove(id);
        let summary = summary?;

        if summary.interrupted {
            // pause() or cancel() already moved the campaign on.
            return Ok(summary);
        }

        if !campaigns::complete(&self.db, id, &now_iso()).await? {
            warn!(campaign_id = %id, "campaign left processing before completion mark");
        } else {
            info!(
                campaign_id = %id,
                sent = summary.sent,
                failed = summary.failed,
                "campaign completed"
            );
        }
        Ok(summary)
    }

    /// Flip the campaign into `processing` and dispatch its pending batch.
    ///
    /// Callers register `token` in the active map first and deregister it
    /// afterwards, so every error path here leaves no stale entry behind.
    async fn run_batch(
        &self,
        id: &str,
        from: CampaignStatus,
        token: &CancellationToken,
    ) -> Result<DispatchSummary, SendraError> {
        if !campaigns::update_status(&self.db, id, from, CampaignStatus::Processing).await? {
            return Err(SendraError::Conflict(
                "campaign state changed concurrently".into(),
            ));
        }
        campaigns::mark_started(&self.db, id, &now_iso()).await?;
        info!(campaign_id = %id, from = %from, "campaign processing started");

        // Re-read after the transition so dispatch sees current settings.
        let campaign = self.get(id).await?;
        run_dispatch(&self.db, self.gateway.as_ref(), &self.dispatch, &campaign, token).await
    }

    /// Pause an active campaign.
    ///
    /// Stops a running dispatch between messages; unsent messages stay
    /// pending and a later [`start`](Self::start) resumes exactly there.
    pub async fn pause(&self, id: &str) -> Result<(), SendraError> {
        let campaign = self.get(id).await?;
        if !campaign.status.can_transition_to(CampaignStatus::Paused) {
            return Err(SendraError::Conflict(format!(
                "cannot pause a {} campaign",
                campaign.status
            )));
        }
        if !campaigns::update_status(&self.db, id, campaign.status, CampaignStatus::Paused).await? {
            return Err(SendraError::Conflict(
                "campaign state changed concurrently".into(),
            ));
        }
        if let Some(token) = self.active.get(id) {
            token.cancel();
        }
        info!(campaign_id = %id, "campaign paused");
        Ok(())
    }

    /// Cancel a campaign from any non-terminal state.
    ///
    /// A running dispatch stops between messages; already-sent messages
    /// keep tracking delivery status, unsent ones stay pending forever.
    pub async fn cancel(&self, id: &str) -> Result<(), SendraError> {
        let campaign = self.get(id).await?;
        if !campaign.status.can_transition_to(CampaignStatus::Cancelled) {
            return Err(SendraError::Conflict(format!(
                "cannot cancel a {} campaign",
                campaign.status
            )));
        }
        if !campaigns::update_status(&self.db, id, campaign.status, CampaignStatus::Cancelled)
            .await?
        {
            return Err(SendraError::Conflict(
                "campaign state changed concurrently".into(),
            ));
        }
        if let Some(token) = self.active.get(id) {
            token.cancel();
        }
        info!(campaign_id = %id, from = %campaign.status, "campaign cancelled");
        Ok(())
    }

    /// Delete a campaign and its messages.
    ///
    /// Refused while processing; pause or cancel first.
    pub async fn delete(&self, id: &str) -> Result<(), SendraError> {
        match campaigns::delete_campaign(&self.db, id).await? {
            DeleteOutcome::Deleted => {
                info!(campaign_id = %id, "campaign deleted");
                Ok(())
            }
            DeleteOutcome::Missing => Err(SendraError::not_found("campaign", id)),
            DeleteOutcome::Processing => Err(SendraError::Conflict(
                "cannot delete a processing campaign".into(),
            )),
        }
    }

    /// Reset a message to `pending` so the next dispatch run retries it.
    ///
    /// Deliberately skips campaign-state checks: spot-retrying one failed
    /// message of a `completed` campaign is the primary use.
    pub async fn resend_message(&self, message_id: &str) -> Result<CampaignMessage, SendraError> {
        let reset = messages::reset_message(&self.db, message_id).await?;
        info!(message_id, "message reset for resend");
        Ok(reset)
    }

    /// Campaign plus per-status message counts.
    pub async fn summary(&self, id: &str) -> Result<CampaignSummary, SendraError> {
        let campaign = self.get(id).await?;
        let counts = messages::count_by_status(&self.db, id).await?;
        Ok(CampaignSummary { campaign, counts })
    }
}
