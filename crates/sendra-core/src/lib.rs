// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sendra bulk-messaging subsystem.
//!
//! Provides the domain entities (campaigns, contacts, campaign messages),
//! the status state machines with their transition tables, the error
//! taxonomy, and the [`MessagingGateway`] trait every provider client
//! implements.

pub mod error;
pub mod gateway;
pub mod types;

pub use error::SendraError;
pub use gateway::{MessagingGateway, SendReceipt, SendRequest, StatusEvent};
pub use types::{
    Campaign, CampaignMessage, CampaignSettings, CampaignStatus, Contact, MessageCounts,
    MessageStatus, now_iso,
};
