// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ESP32 platform implementation
//!
//! Supports ESP32 and ESP32-S3 (with or without PSRAM)

use std::boxed::Box;

use esp_idf_sys as sys;

use crate::hal::*;

/// ESP32 platform structure
#[derive(Debug, Default)]
pub struct Esp32Platform;

impl Esp32Platform {
    /// Initialize ESP32 platform
    ///
    /// # Example
    /// ```no_run
    /// let platform = meter_reader_hal::Esp32Platform::init();
    /// ```
    pub fn init() -> Self {
        sys::link_patches();
        log::info!("ESP32 platform initialized");
        Self
    }

    /// Get ESP32 chip model
    pub fn chip_model(&self) -> &'static str {
        #[cfg(feature = "esp32-s3")]
        {
            return "ESP32-S3";
        }
        #[allow(unreachable_code)]
        "ESP32"
    }

    fn caps(region: MemoryRegion) -> u32 {
        match region {
            MemoryRegion::Default => sys::MALLOC_CAP_DEFAULT | sys::MALLOC_CAP_8BIT,
            MemoryRegion::Internal => sys::MALLOC_CAP_INTERNAL | sys::MALLOC_CAP_8BIT,
        }
    }
}

impl TimeProvider for Esp32Platform {
    fn get_time_us(&self) -> u64 {
        unsafe { sys::esp_timer_get_time() as u64 }
    }
}

impl MemoryProvider for Esp32Platform {
    fn free_bytes(&self, region: MemoryRegion) -> usize {
        unsafe { sys::heap_caps_get_free_size(Self::caps(region)) as usize }
    }

    fn try_allocate(&self, size: usize, region: MemoryRegion) -> Option<Box<[u8]>> {
        if size == 0 {
            return None;
        }
        let ptr = unsafe { sys::heap_caps_calloc(1, size as _, Self::caps(region)) } as *mut u8;
        if ptr.is_null() {
            return None;
        }
        // SAFETY: heap_caps_calloc returned `size` zeroed bytes with
        // alignment >= 1. The ESP-IDF std allocator frees through `free`,
        // which accepts any heap_caps allocation.
        Some(unsafe { Box::from_raw(core::ptr::slice_from_raw_parts_mut(ptr, size)) })
    }
}

impl Platform for Esp32Platform {
    fn name(&self) -> &'static str {
        self.chip_model()
    }
}
