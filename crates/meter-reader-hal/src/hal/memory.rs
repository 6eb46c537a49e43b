// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use alloc::boxed::Box;
use core::fmt;

/// Heap region an allocation is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// General-purpose heap (may include external PSRAM on ESP32)
    Default,
    /// Fast on-chip RAM only
    Internal,
}

impl MemoryRegion {
    /// Get region name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryRegion::Default => "default",
            MemoryRegion::Internal => "internal",
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heap abstraction for embedded platforms
///
/// Allocations are zero-filled and never returned to the platform while the
/// process runs; dropping the box is the only release path.
pub trait MemoryProvider {
    /// Bytes currently free in `region`
    fn free_bytes(&self, region: MemoryRegion) -> usize;

    /// Allocate `size` zeroed bytes from `region`
    ///
    /// # Returns
    /// The buffer, or `None` if the region cannot satisfy the request
    fn try_allocate(&self, size: usize, region: MemoryRegion) -> Option<Box<[u8]>>;
}
