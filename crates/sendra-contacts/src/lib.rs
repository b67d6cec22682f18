// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact registry for the Sendra bulk-messaging core.
//!
//! Phone numbers are normalized to digits and deduplicated at the storage
//! layer; recipients can arrive as contact IDs, CSV upload rows, or CRM
//! leads, and all three resolve to the same canonical contact rows.

pub mod normalize;
pub mod registry;
pub mod upload;

pub use normalize::normalize_phone;
pub use registry::{ContactRegistry, LeadRecord};
pub use upload::{ContactRow, parse_contact_csv};
