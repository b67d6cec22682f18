// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Sendra bulk-messaging core.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use sendra_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

use sendra_core::SendraError;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{DispatchConfig, GatewayConfig, SendraConfig, StorageConfig};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Loads config from TOML files + env vars via Figment, then runs
/// post-deserialization validation. Returns either a valid
/// [`SendraConfig`] or the list of collected errors.
pub fn load_and_validate() -> Result<SendraConfig, Vec<SendraError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![SendraError::Config(err.to_string())]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<SendraConfig, Vec<SendraError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![SendraError::Config(err.to_string())]),
    }
}
