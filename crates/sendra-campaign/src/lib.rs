// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign orchestration for the Sendra bulk-messaging core.
//!
//! Ties the store, the contact registry's output, and a
//! [`sendra_core::MessagingGateway`] together: provisioning pending
//! messages, running the throttled sequential dispatch loop with
//! mid-batch pause/cancel, and applying asynchronous delivery-status
//! events.

pub mod dispatch;
pub mod lifecycle;
pub mod provision;
pub mod throttle;
pub mod tracker;

pub use dispatch::DispatchSummary;
pub use lifecycle::{CampaignService, CampaignSummary};
pub use provision::Provisioner;
pub use tracker::StatusTracker;
