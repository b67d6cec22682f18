// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign message rows: idempotent provisioning, dispatch outcome marks,
//! monotonic status advancement, and resend resets.

use std::str::FromStr;

use rusqlite::params;
use sendra_core::{CampaignMessage, MessageCounts, MessageStatus, SendraError};

use crate::database::{Database, map_tr_err};

/// Outcome of applying a gateway status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAdvance {
    /// The event moved the message forward; its timestamp was recorded.
    Applied,
    /// The event was a duplicate or behind the current status; no change.
    Ignored,
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<CampaignMessage, rusqlite::Error> {
    let status_raw: String = row.get(5)?;
    let status = MessageStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(CampaignMessage {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        contact_id: row.get(2)?,
        template_id: row.get(3)?,
        template_params: row.get(4)?,
        status,
        external_message_id: row.get(6)?,
        used_phone_number_id: row.get(7)?,
        sent_at: row.get(8)?,
        delivered_at: row.get(9)?,
        read_at: row.get(10)?,
        failed_at: row.get(11)?,
        error_message: row.get(12)?,
        created_at: row.get(13)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, campaign_id, contact_id, template_id, template_params_json,
     status, external_message_id, used_phone_number_id, sent_at, delivered_at, read_at,
     failed_at, error_message, created_at";

/// Insert a pending message for `(campaign_id, contact_id)` if absent.
///
/// Returns whether a row was actually added: re-provisioning an existing
/// recipient is a no-op, not a duplicate.
pub async fn provision_message(
    db: &Database,
    campaign_id: &str,
    contact_id: &str,
    template_id: &str,
    template_params: Option<String>,
) -> Result<bool, SendraError> {
    let campaign_id = campaign_id.to_string();
    let contact_id = contact_id.to_string();
    let template_id = template_id.to_string();
    db.connection()
        .call(move |conn| {
            let added = conn.execute(
                "INSERT INTO campaign_messages
                     (id, campaign_id, contact_id, template_id, template_params_json,
                      status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)
                 ON CONFLICT (campaign_id, contact_id) DO NOTHING",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    campaign_id,
                    contact_id,
                    template_id,
                    template_params,
                    sendra_core::now_iso(),
                ],
            )?;
            Ok(added == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// All pending messages of a campaign, in insertion order.
pub async fn list_pending(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<CampaignMessage>, SendraError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM campaign_messages
                 WHERE campaign_id = ?1 AND status = 'pending'
                 ORDER BY rowid ASC"
            ))?;
            let rows = stmt.query_map(params![campaign_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a campaign, in insertion order.
pub async fn list_messages(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<CampaignMessage>, SendraError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM campaign_messages
                 WHERE campaign_id = ?1 ORDER BY rowid ASC"
            ))?;
            let rows = stmt.query_map(params![campaign_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a message by ID.
pub async fn get_message(
    db: &Database,
    id: &str,
) -> Result<Option<CampaignMessage>, SendraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM campaign_messages WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_message) {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Look a message up by the gateway-assigned external id.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<CampaignMessage>, SendraError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM campaign_messages
                 WHERE external_message_id = ?1"
            ))?;
            match stmt.query_row(params![external_id], row_to_message) {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record a successful gateway send: `pending → sent`, external id and the
/// phone-number id actually used, `sent_at` on first entry.
pub async fn mark_sent(
    db: &Database,
    id: &str,
    external_message_id: &str,
    used_phone_number_id: Option<String>,
    at: &str,
) -> Result<(), SendraError> {
    let id = id.to_string();
    let external_message_id = external_message_id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_messages
                 SET status = 'sent', external_message_id = ?2, used_phone_number_id = ?3,
                     sent_at = COALESCE(sent_at, ?4)
                 WHERE id = ?1 AND status = 'pending'",
                params![id, external_message_id, used_phone_number_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed send or validation failure: `pending → failed` with the
/// error text, `failed_at` on first entry.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error: &str,
    at: &str,
) -> Result<(), SendraError> {
    let id = id.to_string();
    let error = error.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_messages
                 SET status = 'failed', error_message = ?2, failed_at = COALESCE(failed_at, ?3)
                 WHERE id = ?1 AND status = 'pending'",
                params![id, error, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Apply an asynchronous status event from the gateway, keyed by external
/// message id.
///
/// Monotonic: events behind the current status and duplicates are ignored.
/// The per-status timestamp is recorded only on first entry, so redelivered
/// webhooks are harmless.
pub async fn advance_status(
    db: &Database,
    external_id: &str,
    to: MessageStatus,
    timestamp: &str,
) -> Result<StatusAdvance, SendraError> {
    let external = external_id.to_string();
    let ts = timestamp.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let row: Result<(String, String), _> = conn.query_row(
                "SELECT id, status FROM campaign_messages WHERE external_message_id = ?1",
                params![external],
                |row| Ok((row.get(0)?, row.get(1)?)),
            );
            let (id, status_raw) = match row {
                Ok(pair) => pair,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e),
            };
            let current = MessageStatus::from_str(&status_raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

            if !current.can_advance_to(to) {
                return Ok(Some(StatusAdvance::Ignored));
            }

            let sql = match to {
                MessageStatus::Sent => {
                    "UPDATE campaign_messages SET status = 'sent',
                         sent_at = COALESCE(sent_at, ?2) WHERE id = ?1"
                }
                MessageStatus::Delivered => {
                    "UPDATE campaign_messages SET status = 'delivered',
                         delivered_at = COALESCE(delivered_at, ?2) WHERE id = ?1"
                }
                MessageStatus::Read => {
                    "UPDATE campaign_messages SET status = 'read',
                         read_at = COALESCE(read_at, ?2) WHERE id = ?1"
                }
                MessageStatus::Failed => {
                    "UPDATE campaign_messages SET status = 'failed',
                         failed_at = COALESCE(failed_at, ?2) WHERE id = ?1"
                }
                // can_advance_to never admits pending.
                MessageStatus::Pending => unreachable!("pending is not an advance target"),
            };
            conn.execute(sql, params![id, ts])?;
            Ok(Some(StatusAdvance::Applied))
        })
        .await
        .map_err(map_tr_err)?;

    outcome.ok_or_else(|| SendraError::not_found("message", external_id))
}

/// Reset a message to `pending` for an explicit resend.
///
/// Clears the external id, error, and all delivery timestamps; campaign,
/// contact, and template links are untouched. Returns the reset row.
pub async fn reset_message(db: &Database, id: &str) -> Result<CampaignMessage, SendraError> {
    let id_owned = id.to_string();
    let message = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaign_messages
                 SET status = 'pending', external_message_id = NULL,
                     used_phone_number_id = NULL, error_message = NULL,
                     sent_at = NULL, delivered_at = NULL, read_at = NULL, failed_at = NULL
                 WHERE id = ?1",
                params![id_owned],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM campaign_messages WHERE id = ?1"
            ))?;
            stmt.query_row(params![id_owned], row_to_message).map(Some)
        })
        .await
        .map_err(map_tr_err)?;

    message.ok_or_else(|| SendraError::not_found("message", id))
}

/// Per-status counts of one campaign's messages.
pub async fn count_by_status(
    db: &Database,
    campaign_id: &str,
) -> Result<MessageCounts, SendraError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM campaign_messages
                 WHERE campaign_id = ?1 GROUP BY status",
            )?;
            let rows = stmt.query_map(params![campaign_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })?;
            let mut counts = MessageCounts::default();
            for row in rows {
                let (status, count) = row?;
                match status.as_str() {
                    "pending" => counts.pending = count,
                    "sent" => counts.sent = count,
                    "delivered" => counts.delivered = count,
                    "read" => counts.read = count,
                    "failed" => counts.failed = count,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}
