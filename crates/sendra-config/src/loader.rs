// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sendra.toml` > `~/.config/sendra/sendra.toml` > `/etc/sendra/sendra.toml`
//! with environment variable overrides via `SENDRA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SendraConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sendra/sendra.toml` (system-wide)
/// 3. `~/.config/sendra/sendra.toml` (user XDG config)
/// 4. `./sendra.toml` (local directory)
/// 5. `SENDRA_*` environment variables
pub fn load_config() -> Result<SendraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendraConfig::default()))
        .merge(Toml::file("/etc/sendra/sendra.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sendra/sendra.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sendra.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<SendraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SendraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SENDRA_GATEWAY_ACCESS_TOKEN` must map
/// to `gateway.access_token`, not `gateway.access.token`.
fn env_provider() -> Env {
    Env::prefixed("SENDRA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: SENDRA_GATEWAY_ACCESS_TOKEN -> "gateway_access_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("dispatch_", "dispatch.", 1);
        mapped.into()
    })
}
