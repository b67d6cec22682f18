// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The messaging gateway seam.
//!
//! The dispatcher talks to the external provider exclusively through
//! [`MessagingGateway`], so tests substitute an in-process fake and the
//! HTTP client lives in its own crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SendraError;
use crate::types::MessageStatus;

/// One templated send, addressed to a single recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient phone number (normalized digits).
    pub phone_number: String,
    /// Template name as registered with the gateway.
    pub template_name: String,
    /// Template language code (e.g. "en_US").
    pub language_code: String,
    /// Structured template components/parameters.
    pub components: Option<serde_json::Value>,
    /// CRM user on whose behalf the message is sent.
    pub sender_user_id: String,
    /// Gateway phone-number identifier to send from.
    pub phone_number_id: String,
}

/// A successful gateway send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Gateway-assigned message identifier, later echoed by status callbacks.
    pub external_message_id: String,
    /// Phone-number identifier the gateway actually used, if reported.
    pub used_phone_number_id: Option<String>,
}

/// An asynchronous delivery-status callback from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub external_message_id: String,
    pub status: MessageStatus,
    /// Provider-reported ISO 8601 timestamp of the status change.
    pub timestamp: String,
}

/// Outbound side of the messaging provider contract.
///
/// A failed send returns `Err`; the dispatch loop records it on the
/// affected message and continues, so implementations must not panic on
/// provider errors.
#[async_trait]
pub trait MessagingGateway: Send + Sync + 'static {
    async fn send_template(&self, request: &SendRequest) -> Result<SendReceipt, SendraError>;
}
