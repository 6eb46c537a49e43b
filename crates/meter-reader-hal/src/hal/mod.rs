// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hardware Abstraction Layer (HAL) trait definitions for embedded platforms
//!
//! Each platform provides:
//! - Time management (TimeProvider)
//! - Heap regions and free-memory readings (MemoryProvider)

/// Heap regions and allocation
pub mod memory;
/// Monotonic time
pub mod time;

// Re-export trait types
pub use memory::{MemoryProvider, MemoryRegion};
pub use time::TimeProvider;

/// Convenience trait combining the capabilities the model loader needs
pub trait Platform: TimeProvider + MemoryProvider {
    /// Get platform name (e.g., "ESP32", "ESP32-S3", "Host")
    fn name(&self) -> &'static str;

    /// Free heap in bytes, as reported in memory diagnostics
    ///
    /// Defaults to the internal region, which is what constrains the device.
    fn available_memory_bytes(&self) -> usize {
        self.free_bytes(MemoryRegion::Internal)
    }
}
