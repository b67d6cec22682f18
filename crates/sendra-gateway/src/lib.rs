// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP messaging gateway client for Sendra.
//!
//! Implements the [`sendra_core::MessagingGateway`] contract against a
//! provider-style REST API: bearer auth, per-call timeout, and a single
//! retry on transient errors.

pub mod client;
pub mod types;

pub use client::HttpGateway;
