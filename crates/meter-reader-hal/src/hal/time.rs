// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Time abstraction for embedded platforms
pub trait TimeProvider {
    /// Get current time in microseconds since system boot
    ///
    /// # Returns
    /// Monotonic timestamp in microseconds
    fn get_time_us(&self) -> u64;

    /// Microseconds elapsed since `start_us`, saturating at zero
    fn elapsed_us(&self, start_us: u64) -> u64 {
        self.get_time_us().saturating_sub(start_us)
    }
}
