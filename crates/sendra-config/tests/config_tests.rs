// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Sendra configuration system.

use sendra_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_sendra_config() {
    let toml = r#"
[storage]
database_path = "/tmp/sendra.db"
wal_mode = false

[gateway]
base_url = "https://gateway.example/v1"
access_token = "token-123"
api_version = "v2"
default_phone_number_id = "pn-42"
send_timeout_secs = 15
max_retries = 2

[dispatch]
throttle_threshold = 25
messages_per_second = 5.0
burst = 10
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.storage.database_path, "/tmp/sendra.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(
        config.gateway.base_url.as_deref(),
        Some("https://gateway.example/v1")
    );
    assert_eq!(config.gateway.access_token.as_deref(), Some("token-123"));
    assert_eq!(config.gateway.api_version, "v2");
    assert_eq!(
        config.gateway.default_phone_number_id.as_deref(),
        Some("pn-42")
    );
    assert_eq!(config.gateway.send_timeout_secs, 15);
    assert_eq!(config.gateway.max_retries, 2);
    assert_eq!(config.dispatch.throttle_threshold, 25);
    assert_eq!(config.dispatch.messages_per_second, 5.0);
    assert_eq!(config.dispatch.burst, 10);
}

/// Omitted sections fall back to compiled defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config should load defaults");
    assert!(config.storage.wal_mode);
    assert!(config.gateway.base_url.is_none());
    assert_eq!(config.gateway.send_timeout_secs, 30);
    assert_eq!(config.dispatch.throttle_threshold, 10);
    assert_eq!(config.dispatch.burst, 5);
}

/// Unknown fields are rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_gateway_produces_error() {
    let toml = r#"
[gateway]
acess_token = "oops"
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("acess_token"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// Validation runs after deserialization and catches semantic errors.
#[test]
fn load_and_validate_rejects_base_url_without_token() {
    let toml = r#"
[gateway]
base_url = "https://gateway.example/v1"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("access_token"))
    );
}

#[test]
fn load_and_validate_accepts_defaults() {
    let config = load_and_validate_str("").expect("defaults must validate");
    assert!(config.gateway.base_url.is_none());
}
