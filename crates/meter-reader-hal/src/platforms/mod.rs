// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Platform implementations
//!
//! Each platform module implements the HAL traits defined in `crate::hal`.
//!
//! Available platforms:
//! - Host (desktop/CI, simulated heap budgets)
//! - ESP32 family (ESP32, ESP32-S3)

#[cfg(feature = "std")]
pub mod host;

#[cfg(feature = "esp32")]
pub mod esp32;

// Re-export platform types
#[cfg(feature = "std")]
pub use host::HostPlatform;

#[cfg(feature = "esp32")]
pub use esp32::Esp32Platform;
