// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of heterogeneous recipient inputs to contact IDs.
//!
//! All three entry points converge on the same guarantee: the returned ID
//! list is deduplicated in first-seen order, and every ID refers to a row
//! that exists at return time.

use std::collections::HashSet;

use sendra_core::SendraError;
use sendra_storage::queries::contacts;
use sendra_storage::{ContactSeed, Database};
use tracing::debug;

use crate::normalize::normalize_phone;
use crate::upload::ContactRow;

/// A lead pulled from the CRM, possibly without a phone number.
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Facade over the contacts table for recipient resolution.
#[derive(Clone)]
pub struct ContactRegistry {
    db: Database,
}

impl ContactRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Verify a list of caller-supplied contact IDs and deduplicate it.
    ///
    /// Unknown IDs are an error rather than silently dropped, so a typo in
    /// an ID list surfaces before any message rows are created.
    pub async fn resolve_ids(&self, ids: &[String]) -> Result<Vec<String>, SendraError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for id in ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            match contacts::get_contact(&self.db, id).await? {
                Some(contact) => resolved.push(contact.id),
                None => return Err(SendraError::not_found("contact", id)),
            }
        }
        Ok(resolved)
    }

    /// Resolve parsed upload rows, creating contacts as needed.
    pub async fn resolve_rows(&self, rows: &[ContactRow]) -> Result<Vec<String>, SendraError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for row in rows {
            let seed = ContactSeed {
                name: row.name.clone(),
                ..ContactSeed::default()
            };
            let contact = contacts::insert_or_get(&self.db, &row.phone_number, seed).await?;
            if seen.insert(contact.id.clone()) {
                resolved.push(contact.id);
            }
        }
        debug!(rows = rows.len(), contacts = resolved.len(), "resolved upload rows");
        Ok(resolved)
    }

    /// Resolve CRM leads, creating contacts as needed.
    ///
    /// Leads with no phone number (or a phone that normalizes to nothing)
    /// are skipped, not treated as errors: a CRM segment routinely carries
    /// unreachable records.
    pub async fn resolve_leads(&self, leads: &[LeadRecord]) -> Result<Vec<String>, SendraError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        let mut skipped = 0usize;
        for lead in leads {
            let phone = lead.phone.as_deref().map(normalize_phone).unwrap_or_default();
            if phone.is_empty() {
                skipped += 1;
                continue;
            }
            let seed = ContactSeed {
                name: lead.name.clone(),
                lead_id: Some(lead.id.clone()),
                ..ContactSeed::default()
            };
            let contact = contacts::insert_or_get(&self.db, &phone, seed).await?;
            if seen.insert(contact.id.clone()) {
                resolved.push(contact.id);
            }
        }
        if skipped > 0 {
            debug!(skipped, "leads without a usable phone number were skipped");
        }
        Ok(resolved)
    }
}
