// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host platform implementation
//!
//! Backs allocations with the system allocator but enforces per-region
//! budgets so device memory limits can be reproduced on a desktop.

use std::boxed::Box;
use std::cell::Cell;
use std::time::Instant;
use std::vec::Vec;

use crate::hal::*;

/// Default general-heap budget (ESP32-S3 with 4 MB PSRAM)
pub const DEFAULT_HEAP_BYTES: usize = 4 * 1024 * 1024;

/// Default internal-RAM budget (ESP32-S3 usable SRAM)
pub const DEFAULT_INTERNAL_BYTES: usize = 320 * 1024;

/// Host platform structure
#[derive(Debug)]
pub struct HostPlatform {
    heap_free: Cell<usize>,
    internal_free: Cell<usize>,
    boot: Instant,
}

impl HostPlatform {
    /// Host platform with the default ESP32-S3-like budgets
    pub fn new() -> Self {
        Self::with_budgets(DEFAULT_HEAP_BYTES, DEFAULT_INTERNAL_BYTES)
    }

    /// Host platform with explicit budgets
    ///
    /// # Arguments
    /// * `heap_bytes` - Bytes available in the general-purpose heap
    /// * `internal_bytes` - Bytes available in internal RAM
    pub fn with_budgets(heap_bytes: usize, internal_bytes: usize) -> Self {
        Self {
            heap_free: Cell::new(heap_bytes),
            internal_free: Cell::new(internal_bytes),
            boot: Instant::now(),
        }
    }

    fn budget(&self, region: MemoryRegion) -> &Cell<usize> {
        match region {
            MemoryRegion::Default => &self.heap_free,
            MemoryRegion::Internal => &self.internal_free,
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for HostPlatform {
    fn get_time_us(&self) -> u64 {
        self.boot.elapsed().as_micros() as u64
    }
}

impl MemoryProvider for HostPlatform {
    fn free_bytes(&self, region: MemoryRegion) -> usize {
        self.budget(region).get()
    }

    fn try_allocate(&self, size: usize, region: MemoryRegion) -> Option<Box<[u8]>> {
        let budget = self.budget(region);
        if size > budget.get() {
            log::debug!(
                "Host {} region cannot satisfy {} bytes ({} free)",
                region,
                size,
                budget.get()
            );
            return None;
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).ok()?;
        buffer.resize(size, 0u8);

        budget.set(budget.get() - size);
        Some(buffer.into_boxed_slice())
    }
}

impl Platform for HostPlatform {
    fn name(&self) -> &'static str {
        "Host"
    }
}
