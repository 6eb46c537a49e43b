// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # Meter Reader HAL
//!
//! Platform abstraction for the model loader.
//!
//! This crate provides:
//! - **HAL traits** (`hal` module) - heap regions, free-memory readings, time
//! - **Platform implementations** (`platforms` module) - host (std) and ESP32
//!
//! ## Usage
//!
//! ```no_run
//! use meter_reader_hal::prelude::*;
//!
//! let platform = HostPlatform::new();
//! let free = platform.available_memory_bytes();
//! let arena = platform.try_allocate(64 * 1024, MemoryRegion::Default);
//! assert!(arena.is_some() || free < 64 * 1024);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` - host platform backed by the system allocator with simulated budgets
//! - `esp32` - ESP-IDF platform (`heap_caps_*` allocation, `esp_timer`)

extern crate alloc;

/// Hardware abstraction traits shared by all platforms.
pub mod hal;

/// Concrete platform implementations (host, ESP32).
pub mod platforms;

// Re-export commonly used types
pub use hal::{MemoryProvider, MemoryRegion, Platform, TimeProvider};

#[cfg(feature = "std")]
pub use platforms::HostPlatform;

#[cfg(feature = "esp32")]
pub use platforms::Esp32Platform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::hal::*;
    pub use crate::platforms::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
