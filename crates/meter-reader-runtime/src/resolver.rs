// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounded operator registry
//!
//! Maps the operator kinds a model needs to kernel registrations. Storage is
//! a fixed-capacity `heapless::Vec`, so the registry never grows past `N`
//! kinds and never allocates.

use heapless::Vec;
use log::{debug, error};

use crate::error::{LoadError, Result};
use crate::schema::BuiltinOperator;

/// Kernel implementation an operator is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPath {
    /// Portable reference kernels
    Reference,
    /// ESP-NN optimized kernels (ESP32 vector extensions)
    EspNn,
}

impl KernelPath {
    /// Kernel path selected at compile time by the `esp-nn` feature
    pub const fn compiled() -> Self {
        if cfg!(feature = "esp-nn") {
            KernelPath::EspNn
        } else {
            KernelPath::Reference
        }
    }

    /// Get path name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelPath::Reference => "reference",
            KernelPath::EspNn => "esp-nn",
        }
    }
}

/// One registered operator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Operator kind
    pub op: BuiltinOperator,
    /// Kernel the operator runs on
    pub kernel: KernelPath,
}

/// Add-only operator registry with capacity for `N` kinds
#[derive(Debug, Default)]
pub struct OpResolver<const N: usize> {
    registrations: Vec<Registration, N>,
}

impl<const N: usize> OpResolver<N> {
    /// Empty registry
    pub const fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Maximum number of kinds
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// True when `op` is registered
    pub fn contains(&self, op: BuiltinOperator) -> bool {
        self.find(op).is_some()
    }

    /// Registration for `op`, if any
    pub fn find(&self, op: BuiltinOperator) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.op == op)
    }

    /// Registrations in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    fn add(&mut self, op: BuiltinOperator) -> Result<()> {
        if self.contains(op) {
            return Ok(());
        }
        let registration = Registration {
            op,
            kernel: KernelPath::compiled(),
        };
        self.registrations.push(registration).map_err(|_| {
            error!("Operator registry full ({} kinds), cannot add {}", N, op);
            LoadError::RegistryFull { capacity: N }
        })?;
        debug!("Registered {} ({} kernel)", op, registration.kernel.as_str());
        Ok(())
    }

    /// Register the 2D convolution kernel
    pub fn add_conv_2d(&mut self) -> Result<()> {
        self.add(BuiltinOperator::CONV_2D)
    }

    /// Register the depthwise 2D convolution kernel
    pub fn add_depthwise_conv_2d(&mut self) -> Result<()> {
        self.add(BuiltinOperator::DEPTHWISE_CONV_2D)
    }

    /// Register the fully connected kernel
    pub fn add_fully_connected(&mut self) -> Result<()> {
        self.add(BuiltinOperator::FULLY_CONNECTED)
    }

    /// Register the softmax kernel
    pub fn add_softmax(&mut self) -> Result<()> {
        self.add(BuiltinOperator::SOFTMAX)
    }

    /// Register the reshape kernel
    pub fn add_reshape(&mut self) -> Result<()> {
        self.add(BuiltinOperator::RESHAPE)
    }

    /// Register the quantize kernel
    pub fn add_quantize(&mut self) -> Result<()> {
        self.add(BuiltinOperator::QUANTIZE)
    }

    /// Register the dequantize kernel
    pub fn add_dequantize(&mut self) -> Result<()> {
        self.add(BuiltinOperator::DEQUANTIZE)
    }

    /// Register one required operator kind
    ///
    /// # Errors
    /// - `UnsupportedOperator` for kinds outside the supported set
    /// - `RegistryFull` when no slot is left
    pub fn register(&mut self, op: BuiltinOperator) -> Result<()> {
        match op {
            BuiltinOperator::CONV_2D => self.add_conv_2d(),
            BuiltinOperator::DEPTHWISE_CONV_2D => self.add_depthwise_conv_2d(),
            BuiltinOperator::FULLY_CONNECTED => self.add_fully_connected(),
            BuiltinOperator::SOFTMAX => self.add_softmax(),
            BuiltinOperator::RESHAPE => self.add_reshape(),
            BuiltinOperator::QUANTIZE => self.add_quantize(),
            BuiltinOperator::DEQUANTIZE => self.add_dequantize(),
            other => {
                error!("Unsupported operator: {} ({})", other.name(), other.code());
                Err(LoadError::UnsupportedOperator {
                    name: other.name(),
                    code: other.code(),
                })
            }
        }
    }

    /// Register every kind in `ops`, stopping at the first failure
    ///
    /// Kinds registered before the failure stay registered.
    pub fn register_required(&mut self, ops: &[BuiltinOperator]) -> Result<()> {
        ops.iter().try_for_each(|op| self.register(*op))
    }
}

/// Kinds the registry can bind
pub const SUPPORTED_OPERATORS: [BuiltinOperator; 7] = [
    BuiltinOperator::CONV_2D,
    BuiltinOperator::DEPTHWISE_CONV_2D,
    BuiltinOperator::FULLY_CONNECTED,
    BuiltinOperator::SOFTMAX,
    BuiltinOperator::RESHAPE,
    BuiltinOperator::QUANTIZE,
    BuiltinOperator::DEQUANTIZE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;

    #[test]
    fn test_register_supported_set() {
        let mut resolver = OpResolver::<10>::new();
        resolver.register_required(&SUPPORTED_OPERATORS).unwrap();
        assert_eq!(resolver.len(), 7);
        for op in SUPPORTED_OPERATORS {
            assert!(resolver.contains(op), "{} missing", op);
            assert_eq!(resolver.find(op).unwrap().kernel, KernelPath::compiled());
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut resolver = OpResolver::<10>::new();
        resolver
            .register_required(&[
                BuiltinOperator::CONV_2D,
                BuiltinOperator::CONV_2D,
                BuiltinOperator::SOFTMAX,
                BuiltinOperator::CONV_2D,
            ])
            .unwrap();
        assert_eq!(resolver.len(), 2);
        let order: std::vec::Vec<_> = resolver.iter().map(|r| r.op).collect();
        assert_eq!(order, [BuiltinOperator::CONV_2D, BuiltinOperator::SOFTMAX]);
    }

    #[test]
    fn test_unsupported_operator_fails_fast() {
        let mut resolver = OpResolver::<10>::new();
        let err = resolver
            .register_required(&[
                BuiltinOperator::CONV_2D,
                BuiltinOperator::MAX_POOL_2D,
                BuiltinOperator::SOFTMAX,
            ])
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::UnsupportedOperator {
                name: "MAX_POOL_2D",
                code: 17
            }
        );
        assert!(resolver.contains(BuiltinOperator::CONV_2D));
        assert!(!resolver.contains(BuiltinOperator::SOFTMAX));
    }

    #[test]
    fn test_unknown_code_reports_unknown_name() {
        let mut resolver = OpResolver::<10>::new();
        let err = resolver
            .register(BuiltinOperator::from_code(999))
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::UnsupportedOperator {
                name: "UNKNOWN",
                code: 999
            }
        );
    }

    #[test]
    fn test_registry_full() {
        let mut resolver = OpResolver::<2>::new();
        let err = resolver
            .register_required(&SUPPORTED_OPERATORS)
            .unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::RegistryFull);
        assert_eq!(err, LoadError::RegistryFull { capacity: 2 });
        assert_eq!(resolver.len(), 2);
        // Already-present kinds never need a slot
        resolver.add_conv_2d().unwrap();
    }
}
