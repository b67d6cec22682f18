// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV contact uploads.
//!
//! Expected shape: a header row, a `phoneNumber` column (required per row),
//! and an optional `displayName` column. Unknown columns are ignored.

use sendra_core::SendraError;

use crate::normalize::normalize_phone;

/// One parsed upload row, phone already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub phone_number: String,
    pub name: Option<String>,
}

/// Parse CSV text into contact rows.
///
/// Row numbers in errors are 1-based data rows (the header is row 0).
pub fn parse_contact_csv(input: &str) -> Result<Vec<ContactRow>, SendraError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SendraError::Validation(format!("invalid CSV header: {e}")))?
        .clone();
    let phone_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("phoneNumber"))
        .unwrap_or(0);
    let name_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("displayName"))
        .or(if headers.len() > 1 { Some(1) } else { None });

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row_number = i + 1;
        let record =
            record.map_err(|e| SendraError::Validation(format!("row {row_number}: {e}")))?;

        let raw_phone = record.get(phone_idx).unwrap_or("");
        let phone_number = normalize_phone(raw_phone);
        if phone_number.is_empty() {
            return Err(SendraError::Validation(format!(
                "row {row_number}: missing phone number"
            )));
        }

        let name = name_idx
            .and_then(|idx| record.get(idx))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        rows.push(ContactRow { phone_number, name });
    }
    Ok(rows)
}
