// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Meter Reader Runtime
//!
//! Prepares a quantized TFLite model for execution on a memory-constrained
//! device. The load sequence runs once:
//!
//! 1. **Validate** the flatbuffer and its schema version ([`ParsedModel`])
//! 2. **Survey** the operator kinds the graph invokes ([`survey_operators`])
//! 3. **Register** those kinds in a fixed-capacity registry ([`OpResolver`])
//! 4. **Allocate** the tensor arena ([`Arena`])
//! 5. **Bind** model, registry and arena, planning tensor memory ([`Interpreter`])
//! 6. **Report** the memory budget ([`MemoryReport`])
//!
//! [`MeterReader`] drives the sequence and keeps the outcome.
//!
//! ## Example
//!
//! ```no_run
//! use meter_reader_hal::HostPlatform;
//! use meter_reader_runtime::{ArenaConfig, MeterReader, ModelBlob, OpResolver};
//!
//! static MODEL: &[u8] = &[]; // include_bytes!("digits.tflite") on device
//!
//! let mut resolver = OpResolver::<10>::new();
//! let mut reader = MeterReader::new(
//!     ModelBlob::new(MODEL),
//!     ArenaConfig::default(),
//!     HostPlatform::new(),
//! );
//! if reader.setup(&mut resolver).is_ok() {
//!     while reader.update() {}
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` - `std::error::Error` impls
//! - `esp-nn` - register ESP-NN kernels instead of the reference kernels
//! - `fixtures` - [`fixtures::ModelBuilder`] for tests and host tools

extern crate alloc;

pub mod arena;
pub mod component;
pub mod diagnostics;
pub mod error;
mod flatbuffer;
pub mod interpreter;
pub mod model;
pub mod planner;
pub mod resolver;
pub mod schema;
pub mod survey;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use arena::{Arena, ArenaPlacement, ParsePlacementError};
pub use component::{ArenaConfig, ComponentState, MeterReader, DEFAULT_ARENA_SIZE};
pub use diagnostics::MemoryReport;
pub use error::{CorruptReason, LoadError, LoadErrorKind, PlanError, Result};
pub use interpreter::Interpreter;
pub use model::{ModelBlob, OperatorCode, ParsedModel, SubGraph, TensorIds, TensorInfo};
pub use planner::{LinearPlanner, TensorAllocation, TensorPlan, TensorPlanner};
pub use resolver::{KernelPath, OpResolver, Registration, SUPPORTED_OPERATORS};
pub use schema::{BuiltinOperator, TensorType, SCHEMA_VERSION};
pub use survey::survey_operators;

/// Registry capacity used by the component's default type
pub const DEFAULT_RESOLVER_CAPACITY: usize = 10;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
