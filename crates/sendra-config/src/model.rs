// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sendra bulk-messaging core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sendra configuration.
///
/// Loaded from TOML files with environment variable overrides. All
/// sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendraConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Messaging gateway client settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Dispatch loop throttling settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("sendra").join("sendra.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("sendra.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Messaging gateway client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the gateway API. `None` disables outbound sends.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token for gateway authentication.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Gateway API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Default phone-number identifier for campaigns that don't set one.
    #[serde(default)]
    pub default_phone_number_id: Option<String>,

    /// Timeout for a single send call, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Retries for transient gateway errors (429/500/503).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            access_token: None,
            api_version: default_api_version(),
            default_phone_number_id: None,
            send_timeout_secs: default_send_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    1
}

/// Dispatch loop throttling configuration.
///
/// Rate limiting only engages once the pending batch exceeds
/// `throttle_threshold`; small batches send back-to-back.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Pending-message count above which the rate limiter engages.
    #[serde(default = "default_throttle_threshold")]
    pub throttle_threshold: usize,

    /// Sustained gateway call rate, messages per second.
    #[serde(default = "default_messages_per_second")]
    pub messages_per_second: f64,

    /// Burst size the token bucket allows before refill pacing kicks in.
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            throttle_threshold: default_throttle_threshold(),
            messages_per_second: default_messages_per_second(),
            burst: default_burst(),
        }
    }
}

fn default_throttle_threshold() -> usize {
    10
}

fn default_messages_per_second() -> f64 {
    2.0
}

fn default_burst() -> u32 {
    5
}
