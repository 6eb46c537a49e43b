// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Meter Reader
//!
//! Loads a quantized TensorFlow Lite model for a camera-based meter reader
//! running on an ESP32: validates the model, registers the operators it
//! needs, carves out the tensor arena and reports the memory budget.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! meter-reader = "0.1"  # Default: host platform + config + logging
//! ```
//!
//! ## Feature Flags
//!
//! ### Platform Targets
//! - **`platform-std`** (default): Host platform with simulated heap budgets,
//!   TOML configuration and `tracing` console logging
//! - **`platform-esp32`**: ESP-IDF platform (`heap_caps_*`, `esp_timer`)
//!
//! ### Kernels
//! - **`esp-nn`**: Register ESP-NN optimized kernels
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meter_reader::prelude::*;
//!
//! # fn main() -> Result<(), LoadError> {
//! let model = std::fs::read("digits.tflite").unwrap_or_default();
//! let mut resolver = OpResolver::<DEFAULT_RESOLVER_CAPACITY>::new();
//! let mut reader = MeterReader::new(
//!     ModelBlob::new(&model),
//!     ArenaConfig::default(),
//!     HostPlatform::new(),
//! );
//! reader.setup(&mut resolver)?;
//! assert!(reader.update());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "platform-std"), no_std)]

// Re-export model loading
pub use meter_reader_runtime as runtime;

// Re-export platform layer
pub use meter_reader_hal as hal;

// Re-export host infrastructure
#[cfg(feature = "platform-std")]
pub use meter_reader_config as config;

#[cfg(feature = "platform-std")]
pub use meter_reader_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::hal::{MemoryProvider, MemoryRegion, Platform, TimeProvider};
    pub use crate::runtime::{
        survey_operators, Arena, ArenaConfig, ArenaPlacement, BuiltinOperator, ComponentState,
        Interpreter, LinearPlanner, LoadError, LoadErrorKind, MemoryReport, MeterReader,
        ModelBlob, OpResolver, ParsedModel, TensorPlanner, DEFAULT_RESOLVER_CAPACITY,
    };

    #[cfg(feature = "platform-std")]
    pub use crate::hal::HostPlatform;

    #[cfg(feature = "platform-esp32")]
    pub use crate::hal::Esp32Platform;

    #[cfg(feature = "platform-std")]
    pub use crate::config::{load_config, validate_config, MeterReaderConfig};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let resolver = OpResolver::<DEFAULT_RESOLVER_CAPACITY>::new();
        assert_eq!(resolver.capacity(), 10);
        assert_eq!(ArenaPlacement::default(), ArenaPlacement::Heap);
    }
}
