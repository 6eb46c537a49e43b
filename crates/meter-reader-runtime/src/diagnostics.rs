// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Memory diagnostics emitted after a successful load

use log::info;

/// Memory budget snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    /// Arena bytes asked for in configuration
    pub requested: usize,
    /// Arena bytes obtained
    pub actual: usize,
    /// Arena bytes occupied by the tensor plan
    pub arena_used: usize,
    /// Free internal heap after loading
    pub free_heap: usize,
    /// Serialized model size
    pub model_length: usize,
}

impl MemoryReport {
    /// Allocated arena size relative to model size, `None` for an empty model
    pub fn ratio(&self) -> Option<f32> {
        if self.model_length == 0 {
            return None;
        }
        Some(self.actual as f32 / self.model_length as f32)
    }

    /// Log the report at info level
    pub fn log(&self) {
        info!("Memory Status:");
        info!("  Requested Arena: {}B ({:.1}KB)", self.requested, kib(self.requested));
        info!("  Allocated Arena: {}B ({:.1}KB)", self.actual, kib(self.actual));
        info!("  Used Arena: {}B ({:.1}KB)", self.arena_used, kib(self.arena_used));
        info!("  Free Heap: {}B ({:.1}KB)", self.free_heap, kib(self.free_heap));
        if let Some(ratio) = self.ratio() {
            info!("  Arena/Model Ratio: {:.1}x", ratio);
        }
    }
}

fn kib(bytes: usize) -> f32 {
    bytes as f32 / 1024.0
}
