// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sequential dispatch loop.
//!
//! One pass over a campaign's pending messages, in provisioning order.
//! Per-message problems (missing recipient data, gateway rejections) are
//! recorded on that message and the loop moves on; only storage failures
//! abort the run. Cancellation is checked between messages, so a pause or
//! cancel takes effect mid-batch without tearing down in-flight work.

use sendra_config::DispatchConfig;
use sendra_core::{Campaign, MessagingGateway, SendRequest, SendraError, now_iso};
use sendra_storage::Database;
use sendra_storage::queries::{contacts, messages};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::throttle::RateLimiter;

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Messages handed to the gateway successfully.
    pub sent: usize,
    /// Messages marked failed (validation or gateway error).
    pub failed: usize,
    /// True when the run stopped early on a pause or cancel; remaining
    /// messages are still pending.
    pub interrupted: bool,
}

/// Why a message cannot be handed to the gateway.
fn validate_message(
    campaign: &Campaign,
    phone_number: Option<&str>,
) -> Result<(String, String, String), String> {
    let phone = match phone_number {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => return Err("recipient has no phone number".into()),
    };
    let name = match campaign.settings.template_name.as_deref() {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => return Err("campaign template has no name".into()),
    };
    let language = match campaign.settings.language_code.as_deref() {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => return Err("campaign template has no language code".into()),
    };
    Ok((phone, name, language))
}

pub(crate) async fn run_dispatch(
    db: &Database,
    gateway: &dyn MessagingGateway,
    config: &DispatchConfig,
    campaign: &Campaign,
    cancel: &CancellationToken,
) -> Result<DispatchSummary, SendraError> {
    let pending = messages::list_pending(db, &campaign.id).await?;
    let mut limiter = if pending.len() > config.throttle_threshold {
        info!(
            campaign_id = %campaign.id,
            pending = pending.len(),
            rate = config.messages_per_second,
            "batch exceeds throttle threshold, rate limiting engaged"
        );
        Some(RateLimiter::new(config.messages_per_second, config.burst))
    } else {
        None
    };

    let mut summary = DispatchSummary::default();

    for message in pending {
        if cancel.is_cancelled() {
            summary.interrupted = true;
            break;
        }
        if let Some(limiter) = limiter.as_mut() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    summary.interrupted = true;
                    break;
                }
                _ = limiter.acquire() => {}
            }
        }

        let contact = contacts::get_contact(db, &message.contact_id).await?;
        let checked = validate_message(campaign, contact.as_ref().map(|c| c.phone_number.as_str()));
        let (phone_number, template_name, language_code) = match checked {
            Ok(parts) => parts,
            Err(reason) => {
                warn!(message_id = %message.id, %reason, "message failed validation");
                messages::mark_failed(db, &message.id, &reason, &now_iso()).await?;
                summary.failed += 1;
                continue;
            }
        };

        let components = match message.template_params.as_deref() {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    let reason = format!("invalid template parameters: {e}");
                    warn!(message_id = %message.id, %reason, "message failed validation");
                    messages::mark_failed(db, &message.id, &reason, &now_iso()).await?;
                    summary.failed += 1;
                    continue;
                }
            },
            None => None,
        };

        let request = SendRequest {
            phone_number,
            template_name,
            language_code,
            components,
            sender_user_id: campaign.owner_id.clone(),
            phone_number_id: campaign.phone_number_id.clone(),
        };

        match gateway.send_template(&request).await {
            Ok(receipt) => {
                debug!(
                    message_id = %message.id,
                    external_message_id = %receipt.external_message_id,
                    "message sent"
                );
                messages::mark_sent(
                    db,
                    &message.id,
                    &receipt.external_message_id,
                    receipt.used_phone_number_id,
                    &now_iso(),
                )
                .await?;
                summary.sent += 1;
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "gateway send failed");
                messages::mark_failed(db, &message.id, &e.to_string(), &now_iso()).await?;
                summary.failed += 1;
            }
        }
    }

    info!(
        campaign_id = %campaign.id,
        sent = summary.sent,
        failed = summary.failed,
        interrupted = summary.interrupted,
        "dispatch run finished"
    );
    Ok(summary)
}
