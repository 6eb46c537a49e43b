// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # meter-reader-observability
//!
//! Logging setup for the meter reader host tools.
//!
//! The runtime and HAL crates log through the `log` facade so they stay
//! `no_std`. On the host this crate installs a `tracing-subscriber` that
//! receives those records, with per-crate debug flag support.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use init::*;

/// Known workspace crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "meter-reader",
    "meter-reader-runtime",
    "meter-reader-hal",
    "meter-reader-config",
    "inspect-model",
];
