// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Sendra bulk-messaging core.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query modules for
//! campaigns, contacts, and per-recipient campaign messages.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use queries::campaigns::DeleteOutcome;
pub use queries::contacts::ContactSeed;
pub use queries::messages::StatusAdvance;
