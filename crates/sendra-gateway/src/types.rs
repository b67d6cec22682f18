// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the messaging gateway's template-send endpoint.

use serde::{Deserialize, Serialize};

/// Template block of an outbound send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePayload {
    /// Template name as registered with the provider.
    pub name: String,
    /// BCP-47-ish language code (e.g. "en_US", "pt_BR").
    pub language_code: String,
    /// Per-recipient template parameter components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<serde_json::Value>,
}

/// Body POSTed to `{base_url}/{phone_number_id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageBody {
    /// Recipient phone number, digits only.
    pub to: String,
    pub template: TemplatePayload,
    /// CRM user on whose behalf the message is sent.
    pub sender_user_id: String,
}

/// Successful send response.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    /// Provider-assigned message identifier, later echoed in status events.
    pub message_id: String,
    /// Phone-number id the provider actually sent from, when it reports one.
    #[serde(default)]
    pub phone_number_id: Option<String>,
}

/// Error envelope returned by the gateway on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}
