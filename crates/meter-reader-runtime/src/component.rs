// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Meter reader component
//!
//! Runs the load sequence once at setup: validate, survey, register,
//! allocate, bind, report. Any failure leaves the component permanently
//! failed; there is no retry path.

use log::{debug, error, info, warn};
use meter_reader_hal::Platform;

use crate::arena::{Arena, ArenaPlacement};
use crate::diagnostics::MemoryReport;
use crate::error::{LoadError, Result};
use crate::interpreter::Interpreter;
use crate::model::{ModelBlob, ParsedModel};
use crate::planner::{LinearPlanner, TensorPlanner};
use crate::resolver::OpResolver;
use crate::survey::survey_operators;
use crate::DEFAULT_RESOLVER_CAPACITY;

/// Default tensor arena size
pub const DEFAULT_ARENA_SIZE: usize = 256 * 1024;

/// Arena sizing and placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bytes to request
    pub size_bytes: usize,
    /// Region policy
    pub placement: ArenaPlacement,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size_bytes: DEFAULT_ARENA_SIZE,
            placement: ArenaPlacement::default(),
        }
    }
}

/// Lifecycle state of the component
#[derive(Debug)]
pub enum ComponentState<'m, 'r, const N: usize> {
    /// Setup has not run
    Uninitialized,
    /// Model loaded and tensors planned
    Ready {
        /// Bound interpreter
        interpreter: Interpreter<'m, 'r, N>,
        /// Memory snapshot taken right after loading
        report: MemoryReport,
    },
    /// Setup failed; terminal
    Failed(LoadError),
}

/// Model-loading component of the meter reader
pub struct MeterReader<'m, 'r, P, T = LinearPlanner, const N: usize = DEFAULT_RESOLVER_CAPACITY> {
    blob: ModelBlob<'m>,
    config: ArenaConfig,
    platform: P,
    planner: T,
    state: ComponentState<'m, 'r, N>,
}

impl<'m, 'r, P: Platform, const N: usize> MeterReader<'m, 'r, P, LinearPlanner, N> {
    /// Component using the bundled linear planner
    pub fn new(blob: ModelBlob<'m>, config: ArenaConfig, platform: P) -> Self {
        Self::with_planner(blob, config, platform, LinearPlanner)
    }
}

impl<'m, 'r, P: Platform, T: TensorPlanner, const N: usize> MeterReader<'m, 'r, P, T, N> {
    /// Component using a custom tensor planner
    pub fn with_planner(blob: ModelBlob<'m>, config: ArenaConfig, platform: P, planner: T) -> Self {
        Self {
            blob,
            config,
            platform,
            planner,
            state: ComponentState::Uninitialized,
        }
    }

    /// Load the model
    ///
    /// The registry is filled with the model's operators and stays borrowed
    /// by the interpreter for the component's lifetime.
    ///
    /// # Errors
    /// The first failing stage's error; `AlreadyInitialized` on any call
    /// after the first, which leaves the state untouched.
    pub fn setup(&mut self, resolver: &'r mut OpResolver<N>) -> Result<()> {
        if !matches!(self.state, ComponentState::Uninitialized) {
            warn!("Setup already attempted, ignoring repeated call");
            return Err(LoadError::AlreadyInitialized);
        }

        info!("Setting up Meter Reader TFLite on {}...", self.platform.name());
        let start = self.platform.get_time_us();

        match self.load_model(resolver) {
            Ok((interpreter, report)) => {
                info!("Model loaded successfully");
                report.log();
                self.state = ComponentState::Ready {
                    interpreter,
                    report,
                };
                info!(
                    "Meter Reader TFLite setup complete ({} us)",
                    self.platform.elapsed_us(start)
                );
                Ok(())
            }
            Err(err) => {
                error!("Meter Reader TFLite setup failed: {}", err);
                self.state = ComponentState::Failed(err);
                Err(err)
            }
        }
    }

    fn load_model(
        &self,
        resolver: &'r mut OpResolver<N>,
    ) -> Result<(Interpreter<'m, 'r, N>, MemoryReport)> {
        let model = ParsedModel::validate(self.blob)?;
        let required = survey_operators(&model)?;
        resolver.register_required(&required)?;
        let resolver: &'r OpResolver<N> = resolver;

        let arena = Arena::allocate(self.config.size_bytes, self.config.placement, &self.platform)?;
        let requested = arena.requested_size();
        let actual = arena.actual_size();

        let interpreter = Interpreter::bind(model, resolver, arena, &self.planner)?;

        let report = MemoryReport {
            requested,
            actual,
            arena_used: interpreter.arena_used_bytes(),
            free_heap: self.platform.available_memory_bytes(),
            model_length: self.blob.len(),
        };
        Ok((interpreter, report))
    }

    /// Periodic hook
    ///
    /// Returns `false` without doing anything unless the model is loaded.
    pub fn update(&mut self) -> bool {
        match &self.state {
            ComponentState::Ready { .. } => {
                debug!("Meter reader update");
                true
            }
            _ => false,
        }
    }

    /// Current state
    pub fn state(&self) -> &ComponentState<'m, 'r, N> {
        &self.state
    }

    /// True once setup succeeded
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ComponentState::Ready { .. })
    }

    /// True once setup failed
    pub fn is_failed(&self) -> bool {
        matches!(self.state, ComponentState::Failed(_))
    }

    /// Setup failure, if any
    pub fn error(&self) -> Option<LoadError> {
        match self.state {
            ComponentState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Interpreter, once loaded
    pub fn interpreter(&self) -> Option<&Interpreter<'m, 'r, N>> {
        match &self.state {
            ComponentState::Ready { interpreter, .. } => Some(interpreter),
            _ => None,
        }
    }

    /// Memory report, once loaded
    pub fn memory_report(&self) -> Option<&MemoryReport> {
        match &self.state {
            ComponentState::Ready { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Arena configuration in use
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Platform the component runs on
    pub fn platform(&self) -> &P {
        &self.platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use crate::fixtures::{ModelBuilder, TensorSpec};
    use crate::schema::BuiltinOperator;
    use meter_reader_hal::{HostPlatform, MemoryProvider, MemoryRegion};

    fn config(size_bytes: usize) -> ArenaConfig {
        ArenaConfig {
            size_bytes,
            placement: ArenaPlacement::Heap,
        }
    }

    fn digit_model() -> std::vec::Vec<u8> {
        ModelBuilder::new()
            .tensor(TensorSpec::activation(&[1, 16, 16, 1], 9))
            .tensor(TensorSpec::constant(&[8, 3, 3, 1], 9, 72))
            .tensor(TensorSpec::activation(&[1, 14, 14, 8], 9))
            .tensor(TensorSpec::activation(&[1, 1568], 9))
            .tensor(TensorSpec::constant(&[10, 1568], 9, 15680))
            .tensor(TensorSpec::activation(&[1, 10], 9))
            .tensor(TensorSpec::activation(&[1, 10], 9))
            .operator(BuiltinOperator::CONV_2D, &[0, 1], &[2])
            .operator(BuiltinOperator::RESHAPE, &[2], &[3])
            .operator(BuiltinOperator::FULLY_CONNECTED, &[3, 4], &[5])
            .operator(BuiltinOperator::SOFTMAX, &[5], &[6])
            .inputs(&[0])
            .outputs(&[6])
            .build()
    }

    #[test]
    fn test_setup_success() {
        let bytes = digit_model();
        let mut resolver = OpResolver::<10>::new();
        let mut reader = MeterReader::new(
            ModelBlob::new(&bytes),
            config(64 * 1024),
            HostPlatform::new(),
        );

        assert!(!reader.update());
        reader.setup(&mut resolver).unwrap();
        assert!(reader.is_ready());
        assert!(reader.update());

        let interpreter = reader.interpreter().unwrap();
        assert_eq!(interpreter.resolver().len(), 4);
        let report = reader.memory_report().unwrap();
        assert_eq!(report.requested, 64 * 1024);
        assert_eq!(report.actual, report.requested);
        assert_eq!(report.model_length, bytes.len());
        assert!(report.arena_used <= report.actual);
    }

    #[test]
    fn test_setup_failure_is_terminal() {
        let mut resolver = OpResolver::<10>::new();
        let mut reader: MeterReader<'_, '_, _> =
            MeterReader::new(ModelBlob::missing(), config(1024), HostPlatform::new());

        let err = reader.setup(&mut resolver).unwrap_err();
        assert_eq!(err, LoadError::ModelUnavailable);
        assert!(reader.is_failed());
        assert_eq!(reader.error(), Some(LoadError::ModelUnavailable));
        assert!(!reader.update());
        assert!(reader.interpreter().is_none());
    }

    #[test]
    fn test_second_setup_rejected() {
        let bytes = digit_model();
        let platform = HostPlatform::with_budgets(1024 * 1024, 0);
        let mut first = OpResolver::<10>::new();
        let mut second = OpResolver::<10>::new();
        let mut reader = MeterReader::new(ModelBlob::new(&bytes), config(64 * 1024), platform);

        reader.setup(&mut first).unwrap();
        let free_after_first = reader.platform().free_bytes(MemoryRegion::Default);
        let err = reader.setup(&mut second).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::AlreadyInitialized);
        assert!(reader.is_ready());
        assert_eq!(
            reader.platform().free_bytes(MemoryRegion::Default),
            free_after_first
        );
        drop(reader);
        assert!(second.is_empty());
    }

    #[test]
    fn test_setup_with_too_small_arena() {
        let bytes = digit_model();
        let mut resolver = OpResolver::<10>::new();
        let mut reader = MeterReader::new(ModelBlob::new(&bytes), config(512), HostPlatform::new());
        let err = reader.setup(&mut resolver).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::TensorAllocationFailed);
        assert!(reader.is_failed());
    }
}
