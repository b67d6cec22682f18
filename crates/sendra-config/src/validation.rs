// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and positive throttle rates.

use sendra_core::SendraError;

use crate::model::SendraConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err` with all collected
/// validation errors (does not fail fast).
pub fn validate_config(config: &SendraConfig) -> Result<(), Vec<SendraError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(SendraError::Config(
            "storage.database_path must not be empty".to_string(),
        ));
    }

    if let Some(base_url) = &config.gateway.base_url {
        if base_url.trim().is_empty() {
            errors.push(SendraError::Config(
                "gateway.base_url must not be empty when set".to_string(),
            ));
        }
        if config
            .gateway
            .access_token
            .as_deref()
            .unwrap_or("")
            .trim()
            .is_empty()
        {
            errors.push(SendraError::Config(
                "gateway.access_token is required when gateway.base_url is set".to_string(),
            ));
        }
    }

    if config.gateway.send_timeout_secs == 0 {
        errors.push(SendraError::Config(
            "gateway.send_timeout_secs must be at least 1".to_string(),
        ));
    }

    if config.dispatch.messages_per_second <= 0.0 {
        errors.push(SendraError::Config(format!(
            "dispatch.messages_per_second must be positive, got {}",
            config.dispatch.messages_per_second
        )));
    }

    if config.dispatch.burst == 0 {
        errors.push(SendraError::Config(
            "dispatch.burst must be at least 1".to_string(),
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
