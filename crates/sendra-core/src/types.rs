// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain entities and status state machines for the bulk-messaging core.
//!
//! Statuses are modelled as explicit enums with transition tables enforced
//! at the point of mutation. Invalid transitions are rejected, never
//! silently applied.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Returns the current UTC time as an ISO 8601 string with millisecond
/// precision, the canonical timestamp format for all persisted rows.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Lifecycle status of a campaign.
///
/// `draft` is initial; `scheduled`, `processing`, and `paused` are active;
/// `completed` and `cancelled` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Processing,
    Paused,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    /// Active states: the campaign has left draft but is not terminal.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            CampaignStatus::Scheduled | CampaignStatus::Processing | CampaignStatus::Paused
        )
    }

    /// Terminal states admit no further lifecycle operations.
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Cancelled)
    }

    /// Whether `start()` is permitted from this state.
    ///
    /// Re-entrancy from `processing` lets an interrupted dispatch run resume
    /// against the still-pending messages.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            CampaignStatus::Draft
                | CampaignStatus::Scheduled
                | CampaignStatus::Paused
                | CampaignStatus::Processing
        )
    }

    /// Transition table for campaign lifecycle mutations.
    pub fn can_transition_to(self, to: CampaignStatus) -> bool {
        use CampaignStatus::*;
        match (self, to) {
            // start()
            (Draft | Scheduled | Paused | Processing, Processing) => true,
            // schedule()
            (Draft, Scheduled) => true,
            // pause() from any active state
            (Scheduled | Processing | Paused, Paused) => true,
            // cancel() from any non-terminal state
            (from, Cancelled) => !from.is_terminal(),
            // dispatch loop completion
            (Processing, Completed) => true,
            _ => false,
        }
    }
}

/// Delivery status of one campaign message.
///
/// Progression is monotonic: `pending → sent → delivered → read`, with
/// `failed` reachable from any non-terminal status. `read` and `failed`
/// are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Position in the delivery progression; `failed` sits outside it.
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
            MessageStatus::Failed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Read | MessageStatus::Failed)
    }

    /// Whether a status event reporting `to` advances this message.
    ///
    /// Events "behind" the current status (a late `delivered` after `read`
    /// is recorded) and duplicates are not advances; callers ignore them.
    pub fn can_advance_to(self, to: MessageStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            MessageStatus::Failed => true,
            MessageStatus::Pending => false,
            _ => to.rank() > self.rank(),
        }
    }
}

/// Free-form campaign settings blob.
///
/// Holds the chosen template and optional response-routing configuration;
/// unknown keys round-trip through `extra` untouched, matching the
/// unstructured blob the store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignSettings {
    /// Gateway template identifier. Provisioning requires this to be set.
    pub template_id: Option<String>,
    /// Template name as registered with the gateway.
    pub template_name: Option<String>,
    /// Template language code (e.g. "en_US").
    pub language_code: Option<String>,
    /// Optional routing configuration for inbound replies.
    pub response_routing: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A named batch of templated outbound messages tied to one sender
/// phone-number identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// CRM user who owns the campaign.
    pub owner_id: String,
    /// Gateway phone-number identifier the campaign sends from.
    pub phone_number_id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub settings: CampaignSettings,
    pub scheduled_at: Option<String>,
    /// Set on first entry into `processing`, never overwritten.
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Campaign {
    /// Create a new campaign in `draft` with empty settings.
    pub fn new(owner_id: String, phone_number_id: String, name: String) -> Self {
        let now = now_iso();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            phone_number_id,
            name,
            status: CampaignStatus::Draft,
            settings: CampaignSettings::default(),
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A deduplicated recipient record, keyed by normalized phone number.
///
/// Exactly one row exists per distinct normalized number, regardless of
/// how many times it is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    /// Normalized phone number (digits only). Unique.
    pub phone_number: String,
    pub name: Option<String>,
    /// Optional link to the CRM lead this contact was imported from.
    pub lead_id: Option<String>,
    /// Optional link to a full CRM contact record.
    pub crm_contact_id: Option<String>,
    /// Opaque metadata blob (JSON).
    pub metadata: Option<String>,
    pub created_at: String,
}

impl Contact {
    pub fn new(phone_number: String, name: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            phone_number,
            name,
            lead_id: None,
            crm_contact_id: None,
            metadata: None,
            created_at: now_iso(),
        }
    }
}

/// One recipient's instance within a campaign, carrying its own delivery
/// state. The pair `(campaign_id, contact_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignMessage {
    pub id: String,
    pub campaign_id: String,
    pub contact_id: String,
    pub template_id: String,
    /// Structured template parameters (JSON).
    pub template_params: Option<String>,
    pub status: MessageStatus,
    /// Gateway-assigned id, set when the message is sent.
    pub external_message_id: Option<String>,
    /// Phone-number identifier the gateway actually sent from, when it
    /// differs from (or confirms) the campaign's.
    pub used_phone_number_id: Option<String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    pub failed_at: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// Per-status message counts for one campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub pending: u64,
    pub sent: u64,
    pub delivered: u64,
    pub read: u64,
    pub failed: u64,
}

impl MessageCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.sent + self.delivered + self.read + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn campaign_status_round_trips_lowercase() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Processing,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
            CampaignStatus::Cancelled,
        ] {
            let s = status.to_string();
            assert_eq!(s, s.to_lowercase());
            assert_eq!(CampaignStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn start_allowed_from_all_non_terminal_non_scheduled_states() {
        assert!(CampaignStatus::Draft.can_start());
        assert!(CampaignStatus::Scheduled.can_start());
        assert!(CampaignStatus::Paused.can_start());
        assert!(CampaignStatus::Processing.can_start());
        assert!(!CampaignStatus::Completed.can_start());
        assert!(!CampaignStatus::Cancelled.can_start());
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for terminal in [CampaignStatus::Completed, CampaignStatus::Cancelled] {
            for to in [
                CampaignStatus::Draft,
                CampaignStatus::Scheduled,
                CampaignStatus::Processing,
                CampaignStatus::Paused,
                CampaignStatus::Completed,
                CampaignStatus::Cancelled,
            ] {
                assert!(
                    !terminal.can_transition_to(to),
                    "{terminal} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn cancel_allowed_from_any_non_terminal_state() {
        assert!(CampaignStatus::Draft.can_transition_to(CampaignStatus::Cancelled));
        assert!(CampaignStatus::Scheduled.can_transition_to(CampaignStatus::Cancelled));
        assert!(CampaignStatus::Processing.can_transition_to(CampaignStatus::Cancelled));
        assert!(CampaignStatus::Paused.can_transition_to(CampaignStatus::Cancelled));
    }

    #[test]
    fn message_status_never_moves_backward() {
        assert!(MessageStatus::Pending.can_advance_to(MessageStatus::Sent));
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Delivered));
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Read));
        assert!(MessageStatus::Delivered.can_advance_to(MessageStatus::Read));

        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Delivered.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Sent.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Sent.can_advance_to(MessageStatus::Pending));
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_status() {
        assert!(MessageStatus::Pending.can_advance_to(MessageStatus::Failed));
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Failed));
        assert!(MessageStatus::Delivered.can_advance_to(MessageStatus::Failed));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Failed));
        assert!(!MessageStatus::Failed.can_advance_to(MessageStatus::Failed));
    }

    #[test]
    fn settings_preserve_unknown_keys() {
        let json = r#"{"template_id":"t1","custom_flag":true}"#;
        let settings: CampaignSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.template_id.as_deref(), Some("t1"));
        assert_eq!(
            settings.extra.get("custom_flag"),
            Some(&serde_json::Value::Bool(true))
        );
        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back.get("custom_flag"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn new_campaign_starts_in_draft() {
        let c = Campaign::new("user-1".into(), "pn-1".into(), "Spring promo".into());
        assert_eq!(c.status, CampaignStatus::Draft);
        assert!(c.started_at.is_none());
        assert!(c.settings.template_id.is_none());
        assert!(!c.id.is_empty());
    }
}
