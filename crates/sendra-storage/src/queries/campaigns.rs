// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign CRUD and lifecycle mutations.
//!
//! Status changes are atomic single-row updates guarded by the expected
//! current status, so a concurrent transition loses cleanly (0 rows
//! changed) instead of clobbering.

use std::str::FromStr;

use rusqlite::params;
use sendra_core::{Campaign, CampaignSettings, CampaignStatus, SendraError};

use crate::database::{Database, map_tr_err};

fn row_to_campaign(row: &rusqlite::Row<'_>) -> Result<Campaign, rusqlite::Error> {
    let status_raw: String = row.get(4)?;
    let status = CampaignStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let settings_raw: String = row.get(5)?;
    let settings: CampaignSettings = serde_json::from_str(&settings_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Campaign {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        phone_number_id: row.get(2)?,
        name: row.get(3)?,
        status,
        settings,
        scheduled_at: row.get(6)?,
        started_at: row.get(7)?,
        completed_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const CAMPAIGN_COLUMNS: &str = "id, owner_id, phone_number_id, name, status, settings_json,
     scheduled_at, started_at, completed_at, created_at, updated_at";

/// Insert a new campaign row.
pub async fn create_campaign(db: &Database, campaign: &Campaign) -> Result<(), SendraError> {
    let c = campaign.clone();
    let settings_json = serde_json::to_string(&c.settings)
        .map_err(|e| SendraError::Internal(format!("settings serialization failed: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns (id, owner_id, phone_number_id, name, status,
                     settings_json, scheduled_at, started_at, completed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    c.id,
                    c.owner_id,
                    c.phone_number_id,
                    c.name,
                    c.status.to_string(),
                    settings_json,
                    c.scheduled_at,
                    c.started_at,
                    c.completed_at,
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a campaign by ID.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, SendraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_campaign) {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List campaigns, optionally filtered by status, newest first.
pub async fn list_campaigns(
    db: &Database,
    status: Option<CampaignStatus>,
) -> Result<Vec<Campaign>, SendraError> {
    db.connection()
        .call(move |conn| {
            let mut campaigns = Vec::new();
            match status {
                Some(filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                         WHERE status = ?1 ORDER BY created_at DESC"
                    ))?;
                    let rows = stmt.query_map(params![filter.to_string()], row_to_campaign)?;
                    for row in rows {
                        campaigns.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
                    ))?;
                    let rows = stmt.query_map([], row_to_campaign)?;
                    for row in rows {
                        campaigns.push(row?);
                    }
                }
            }
            Ok(campaigns)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically move a campaign from `from` to `to`.
///
/// Returns `false` if the row no longer carries the expected status
/// (concurrent transition or unknown id); the caller decides whether that
/// is a conflict.
pub async fn update_status(
    db: &Database,
    id: &str,
    from: CampaignStatus,
    to: CampaignStatus,
) -> Result<bool, SendraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET status = ?3, updated_at = ?4
                 WHERE id = ?1 AND status = ?2",
                params![id, from.to_string(), to.to_string(), sendra_core::now_iso()],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Record first entry into `processing`. `started_at` is set once and
/// never overwritten by later resumes.
pub async fn mark_started(db: &Database, id: &str, at: &str) -> Result<(), SendraError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET started_at = COALESCE(started_at, ?2), updated_at = ?3
                 WHERE id = ?1",
                params![id, at, sendra_core::now_iso()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Complete a processing campaign, recording `completed_at` on first entry.
///
/// Guarded on `processing` so a run that was paused or cancelled mid-batch
/// does not flip the campaign to `completed`. Returns whether the row
/// changed.
pub async fn complete(db: &Database, id: &str, at: &str) -> Result<bool, SendraError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET status = 'completed',
                     completed_at = COALESCE(completed_at, ?2), updated_at = ?3
                 WHERE id = ?1 AND status = 'processing'",
                params![id, at, sendra_core::now_iso()],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a draft campaign to `scheduled` with the given schedule time.
pub async fn set_scheduled(db: &Database, id: &str, at: &str) -> Result<bool, SendraError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET status = 'scheduled', scheduled_at = ?2, updated_at = ?3
                 WHERE id = ?1 AND status = 'draft'",
                params![id, at, sendra_core::now_iso()],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Merge keys into the campaign's settings blob and return the result.
///
/// This is a read-merge-write of `settings_json`, kept deliberately
/// compatible with the original system (see DESIGN.md). Within one process
/// the merge is atomic because all writes run on the connection's single
/// background thread; across processes sharing the file, concurrent merges
/// can still lose an update.
pub async fn merge_settings(
    db: &Database,
    id: &str,
    patch: serde_json::Map<String, serde_json::Value>,
) -> Result<CampaignSettings, SendraError> {
    let id_owned = id.to_string();
    let merged = db
        .connection()
        .call(move |conn| {
            let current: String = match conn.query_row(
                "SELECT settings_json FROM campaigns WHERE id = ?1",
                params![id_owned],
                |row| row.get(0),
            ) {
                Ok(json) => json,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e),
            };

            let mut blob: serde_json::Value =
                serde_json::from_str(&current).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            let obj = blob.as_object_mut().ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    "settings_json is not a JSON object".into(),
                )
            })?;
            for (key, value) in patch {
                obj.insert(key, value);
            }

            let updated = serde_json::to_string(&blob)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "UPDATE campaigns SET settings_json = ?2, updated_at = ?3 WHERE id = ?1",
                params![id_owned, updated, sendra_core::now_iso()],
            )?;

            let settings: CampaignSettings =
                serde_json::from_value(blob).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(Some(settings))
        })
        .await
        .map_err(map_tr_err)?;

    merged.ok_or_else(|| SendraError::not_found("campaign", id))
}

/// Outcome of a guarded campaign delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Campaign and its messages removed.
    Deleted,
    /// No campaign row with that id.
    Missing,
    /// The row carries `processing`; nothing was removed.
    Processing,
}

/// Delete a campaign and all of its messages.
///
/// The guard lives in the DELETE itself (`status != 'processing'`), so a
/// concurrent worker flipping the row to `processing` cannot lose to a
/// stale pre-check. Messages go with the row via `ON DELETE CASCADE`.
pub async fn delete_campaign(db: &Database, id: &str) -> Result<DeleteOutcome, SendraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM campaigns WHERE id = ?1 AND status != 'processing'",
                params![id],
            )?;
            if deleted == 1 {
                return Ok(DeleteOutcome::Deleted);
            }
            match conn.query_row(
                "SELECT 1 FROM campaigns WHERE id = ?1",
                params![id],
                |_| Ok(()),
            ) {
                Ok(()) => Ok(DeleteOutcome::Processing),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(DeleteOutcome::Missing),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendra_core::Campaign;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn draft_campaign(name: &str) -> Campaign {
        Campaign::new("user-1".into(), "pn-1".into(), name.into())
    }

    #[tokio::test]
    async fn create_and_get_round_trips_settings() {
        let db = setup_db().await;
        let mut campaign = draft_campaign("promo");
        campaign.settings.template_id = Some("tpl-1".into());
        create_campaign(&db, &campaign).await.unwrap();

        let fetched = get_campaign(&db, &campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "promo");
        assert_eq!(fetched.status, CampaignStatus::Draft);
        assert_eq!(fetched.settings.template_id.as_deref(), Some("tpl-1"));
    }

    #[tokio::test]
    async fn get_unknown_campaign_returns_none() {
        let db = setup_db().await;
        assert!(get_campaign(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let db = setup_db().await;
        let a = draft_campaign("a");
        let b = draft_campaign("b");
        create_campaign(&db, &a).await.unwrap();
        create_campaign(&db, &b).await.unwrap();
        update_status(&db, &b.id, CampaignStatus::Draft, CampaignStatus::Processing)
            .await
            .unwrap();

        let drafts = list_campaigns(&db, Some(CampaignStatus::Draft)).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, a.id);
        assert_eq!(list_campaigns(&db, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn guarded_update_fails_from_wrong_status() {
        let db = setup_db().await;
        let campaign = draft_campaign("c");
        create_campaign(&db, &campaign).await.unwrap();

        let ok = update_status(
            &db,
            &campaign.id,
            CampaignStatus::Processing,
            CampaignStatus::Completed,
        )
        .await
        .unwrap();
        assert!(!ok, "update from a status the row does not carry must lose");
        let fetched = get_campaign(&db, &campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, CampaignStatus::Draft);
    }

    #[tokio::test]
    async fn started_at_is_set_once() {
        let db = setup_db().await;
        let campaign = draft_campaign("c");
        create_campaign(&db, &campaign).await.unwrap();

        mark_started(&db, &campaign.id, "2026-03-01T10:00:00.000Z")
            .await
            .unwrap();
        mark_started(&db, &campaign.id, "2026-03-02T10:00:00.000Z")
            .await
            .unwrap();

        let fetched = get_campaign(&db, &campaign.id).await.unwrap().unwrap();
        assert_eq!(
            fetched.started_at.as_deref(),
            Some("2026-03-01T10:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn complete_only_moves_processing_campaigns() {
        let db = setup_db().await;
        let campaign = draft_campaign("c");
        create_campaign(&db, &campaign).await.unwrap();

        assert!(!complete(&db, &campaign.id, "2026-03-01T11:00:00.000Z").await.unwrap());

        update_status(&db, &campaign.id, CampaignStatus::Draft, CampaignStatus::Processing)
            .await
            .unwrap();
        assert!(complete(&db, &campaign.id, "2026-03-01T11:00:00.000Z").await.unwrap());

        let fetched = get_campaign(&db, &campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, CampaignStatus::Completed);
        assert!(fetched.completed_at.is_some());
    }

    #[tokio::test]
    async fn merge_settings_preserves_unrelated_keys() {
        let db = setup_db().await;
        let campaign = draft_campaign("c");
        create_campaign(&db, &campaign).await.unwrap();

        let mut patch = serde_json::Map::new();
        patch.insert("template_id".into(), "tpl-9".into());
        merge_settings(&db, &campaign.id, patch).await.unwrap();

        let mut patch = serde_json::Map::new();
        patch.insert(
            "response_routing".into(),
            serde_json::json!({"assignee": "user-2"}),
        );
        let merged = merge_settings(&db, &campaign.id, patch).await.unwrap();

        assert_eq!(merged.template_id.as_deref(), Some("tpl-9"));
        assert_eq!(
            merged.response_routing,
            Some(serde_json::json!({"assignee": "user-2"}))
        );
    }

    #[tokio::test]
    async fn merge_settings_unknown_campaign_is_not_found() {
        let db = setup_db().await;
        let err = merge_settings(&db, "nope", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SendraError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_campaign() {
        let db = setup_db().await;
        let campaign = draft_campaign("c");
        create_campaign(&db, &campaign).await.unwrap();

        assert_eq!(
            delete_campaign(&db, &campaign.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(get_campaign(&db, &campaign.id).await.unwrap().is_none());
        assert_eq!(
            delete_campaign(&db, &campaign.id).await.unwrap(),
            DeleteOutcome::Missing
        );
    }

    #[tokio::test]
    async fn delete_refuses_processing_rows_at_the_store() {
        let db = setup_db().await;
        let campaign = draft_campaign("c");
        create_campaign(&db, &campaign).await.unwrap();
        update_status(&db, &campaign.id, CampaignStatus::Draft, CampaignStatus::Processing)
            .await
            .unwrap();

        assert_eq!(
            delete_campaign(&db, &campaign.id).await.unwrap(),
            DeleteOutcome::Processing
        );
        let fetched = get_campaign(&db, &campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, CampaignStatus::Processing);
    }
}
