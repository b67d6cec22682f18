// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact rows keyed by normalized phone number.
//!
//! The `phone_number UNIQUE` constraint is the deduplication mechanism:
//! resolution is an idempotent upsert, and a lookup-then-create race falls
//! back to re-fetching the winner on conflict.

use rusqlite::params;
use sendra_core::{Contact, SendraError};

use crate::database::{Database, map_tr_err};

/// Fields a resolution path can contribute to a contact.
#[derive(Debug, Clone, Default)]
pub struct ContactSeed {
    pub name: Option<String>,
    pub lead_id: Option<String>,
    pub crm_contact_id: Option<String>,
    pub metadata: Option<String>,
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        name: row.get(2)?,
        lead_id: row.get(3)?,
        crm_contact_id: row.get(4)?,
        metadata: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const CONTACT_COLUMNS: &str =
    "id, phone_number, name, lead_id, crm_contact_id, metadata_json, created_at";

fn fetch_by_phone(
    conn: &rusqlite::Connection,
    phone: &str,
) -> Result<Option<Contact>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE phone_number = ?1"
    ))?;
    match stmt.query_row(params![phone], row_to_contact) {
        Ok(contact) => Ok(Some(contact)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    )
}

/// Resolve a normalized phone number to exactly one contact row, creating
/// it if absent.
///
/// An existing row is enriched with seed fields it is still missing
/// (`COALESCE` semantics: the first value wins, nothing is overwritten).
/// If the insert loses a create race to another writer, the winner's row
/// is re-fetched.
pub async fn insert_or_get(
    db: &Database,
    phone_number: &str,
    seed: ContactSeed,
) -> Result<Contact, SendraError> {
    let phone = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            if let Some(existing) = fetch_by_phone(conn, &phone)? {
                return enrich(conn, existing, &seed);
            }

            let candidate = Contact {
                id: uuid::Uuid::new_v4().to_string(),
                phone_number: phone.clone(),
                name: seed.name.clone(),
                lead_id: seed.lead_id.clone(),
                crm_contact_id: seed.crm_contact_id.clone(),
                metadata: seed.metadata.clone(),
                created_at: sendra_core::now_iso(),
            };
            let inserted = conn.execute(
                "INSERT INTO contacts (id, phone_number, name, lead_id, crm_contact_id,
                     metadata_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    candidate.id,
                    candidate.phone_number,
                    candidate.name,
                    candidate.lead_id,
                    candidate.crm_contact_id,
                    candidate.metadata,
                    candidate.created_at,
                ],
            );
            match inserted {
                Ok(_) => Ok(candidate),
                // Lost the create race: the unique key guarantees a winner
                // exists, re-fetch it.
                Err(e) if is_unique_violation(&e) => {
                    let winner = fetch_by_phone(conn, &phone)?.ok_or(e)?;
                    enrich(conn, winner, &seed)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

fn enrich(
    conn: &rusqlite::Connection,
    existing: Contact,
    seed: &ContactSeed,
) -> Result<Contact, rusqlite::Error> {
    let fills_gap = |current: &Option<String>, incoming: &Option<String>| {
        current.is_none() && incoming.is_some()
    };
    if !(fills_gap(&existing.name, &seed.name)
        || fills_gap(&existing.lead_id, &seed.lead_id)
        || fills_gap(&existing.crm_contact_id, &seed.crm_contact_id))
    {
        return Ok(existing);
    }
    conn.execute(
        "UPDATE contacts SET name = COALESCE(name, ?2),
             lead_id = COALESCE(lead_id, ?3),
             crm_contact_id = COALESCE(crm_contact_id, ?4)
         WHERE id = ?1",
        params![existing.id, seed.name, seed.lead_id, seed.crm_contact_id],
    )?;
    Ok(Contact {
        name: existing.name.or_else(|| seed.name.clone()),
        lead_id: existing.lead_id.or_else(|| seed.lead_id.clone()),
        crm_contact_id: existing.crm_contact_id.or_else(|| seed.crm_contact_id.clone()),
        ..existing
    })
}

/// Get a contact by ID.
pub async fn get_contact(db: &Database, id: &str) -> Result<Option<Contact>, SendraError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_contact) {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get a contact by normalized phone number.
pub async fn get_by_phone(db: &Database, phone: &str) -> Result<Option<Contact>, SendraError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| fetch_by_phone(conn, &phone))
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn insert_or_get_creates_then_reuses() {
        let db = setup_db().await;

        let first = insert_or_get(
            &db,
            "5511999990000",
            ContactSeed {
                name: Some("Ana".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let second = insert_or_get(&db, "5511999990000", ContactSeed::default())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn enriches_missing_fields_without_overwriting() {
        let db = setup_db().await;

        insert_or_get(&db, "111", ContactSeed::default()).await.unwrap();
        let enriched = insert_or_get(
            &db,
            "111",
            ContactSeed {
                name: Some("Bob".into()),
                lead_id: Some("lead-1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(enriched.name.as_deref(), Some("Bob"));
        assert_eq!(enriched.lead_id.as_deref(), Some("lead-1"));

        // A later lead with the same number does not steal the link.
        let again = insert_or_get(
            &db,
            "111",
            ContactSeed {
                name: Some("Robert".into()),
                lead_id: Some("lead-2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(again.name.as_deref(), Some("Bob"));
        assert_eq!(again.lead_id.as_deref(), Some("lead-1"));
    }

    #[tokio::test]
    async fn distinct_numbers_create_distinct_rows() {
        let db = setup_db().await;
        let a = insert_or_get(&db, "111", ContactSeed::default()).await.unwrap();
        let b = insert_or_get(&db, "222", ContactSeed::default()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn get_by_phone_and_id() {
        let db = setup_db().await;
        let created = insert_or_get(&db, "333", ContactSeed::default()).await.unwrap();

        let by_phone = get_by_phone(&db, "333").await.unwrap().unwrap();
        assert_eq!(by_phone.id, created.id);

        let by_id = get_contact(&db, &created.id).await.unwrap().unwrap();
        assert_eq!(by_id.phone_number, "333");

        assert!(get_contact(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_resolution_yields_one_row() {
        let db = setup_db().await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                insert_or_get(
                    &db,
                    "5511888887777",
                    ContactSeed {
                        name: Some(format!("caller-{i}")),
                        ..Default::default()
                    },
                )
                .await
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap().id);
        }
        assert_eq!(ids.len(), 1, "all resolutions must land on one contact");
    }
}
