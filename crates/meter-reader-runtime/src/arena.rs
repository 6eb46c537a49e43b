// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tensor arena allocation
//!
//! The arena is a single zeroed block sized from configuration. It is never
//! resized or released while the component runs.

use alloc::boxed::Box;
use core::fmt;
use core::str::FromStr;

use log::{error, info, warn};
use meter_reader_hal::{MemoryProvider, MemoryRegion};

use crate::error::{LoadError, Result};

/// Where the arena may be carved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArenaPlacement {
    /// One attempt on the general-purpose heap
    #[default]
    Heap,
    /// Internal RAM only
    InternalOnly,
    /// Internal RAM first, general heap if that fails
    PreferInternal,
}

impl ArenaPlacement {
    /// Get placement name as string (same form `from_str` accepts)
    pub fn as_str(&self) -> &'static str {
        match self {
            ArenaPlacement::Heap => "heap",
            ArenaPlacement::InternalOnly => "internal",
            ArenaPlacement::PreferInternal => "prefer-internal",
        }
    }

    fn regions(self) -> &'static [MemoryRegion] {
        match self {
            ArenaPlacement::Heap => &[MemoryRegion::Default],
            ArenaPlacement::InternalOnly => &[MemoryRegion::Internal],
            ArenaPlacement::PreferInternal => &[MemoryRegion::Internal, MemoryRegion::Default],
        }
    }
}

impl fmt::Display for ArenaPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized placement name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePlacementError;

impl fmt::Display for ParsePlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected one of: heap, internal, prefer-internal")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParsePlacementError {}

impl FromStr for ArenaPlacement {
    type Err = ParsePlacementError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("heap") => Ok(ArenaPlacement::Heap),
            s if s.eq_ignore_ascii_case("internal") => Ok(ArenaPlacement::InternalOnly),
            s if s.eq_ignore_ascii_case("prefer-internal") => Ok(ArenaPlacement::PreferInternal),
            _ => Err(ParsePlacementError),
        }
    }
}

/// Working memory for tensor data
#[derive(Debug)]
pub struct Arena {
    buffer: Box<[u8]>,
    requested: usize,
    region: MemoryRegion,
}

impl Arena {
    /// Allocate `requested` bytes according to `placement`
    ///
    /// # Errors
    /// `ArenaAllocationFailed` when `requested` is zero or no allowed region
    /// can supply the block.
    pub fn allocate<M: MemoryProvider + ?Sized>(
        requested: usize,
        placement: ArenaPlacement,
        memory: &M,
    ) -> Result<Self> {
        log_kernel_path();

        if requested == 0 {
            error!("Tensor arena size must be greater than zero");
            return Err(LoadError::ArenaAllocationFailed {
                requested,
                placement,
                region: None,
            });
        }

        let mut last = None;
        for &region in placement.regions() {
            last = Some(region);
            if let Some(buffer) = memory.try_allocate(requested, region) {
                info!(
                    "Allocated tensor arena: {} bytes ({} region)",
                    buffer.len(),
                    region
                );
                return Ok(Self {
                    buffer,
                    requested,
                    region,
                });
            }
            warn!(
                "Could not allocate {} bytes from {} region ({} free)",
                requested,
                region,
                memory.free_bytes(region)
            );
        }

        error!("Failed to allocate tensor arena of {} bytes", requested);
        Err(LoadError::ArenaAllocationFailed {
            requested,
            placement,
            region: last,
        })
    }

    /// Bytes asked for
    pub fn requested_size(&self) -> usize {
        self.requested
    }

    /// Bytes obtained
    pub fn actual_size(&self) -> usize {
        self.buffer.len()
    }

    /// Region the arena lives in
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    /// Arena contents
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Arena contents, mutable
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

fn log_kernel_path() {
    if cfg!(feature = "esp-nn") {
        info!("ESP-NN optimizations enabled");
    } else {
        warn!("ESP-NN not enabled, using default kernels");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use meter_reader_hal::HostPlatform;

    #[test]
    fn test_allocate_from_heap() {
        let platform = HostPlatform::with_budgets(64 * 1024, 0);
        let arena = Arena::allocate(16 * 1024, ArenaPlacement::Heap, &platform).unwrap();
        assert_eq!(arena.requested_size(), 16 * 1024);
        assert_eq!(arena.actual_size(), arena.requested_size());
        assert_eq!(arena.region(), MemoryRegion::Default);
        assert!(arena.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_zero_size_rejected() {
        let platform = HostPlatform::new();
        let err = Arena::allocate(0, ArenaPlacement::Heap, &platform).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::ArenaAllocationFailed);
    }

    #[test]
    fn test_exhausted_heap() {
        let platform = HostPlatform::with_budgets(1024, 1024 * 1024);
        let err = Arena::allocate(4096, ArenaPlacement::Heap, &platform).unwrap_err();
        assert_eq!(
            err,
            LoadError::ArenaAllocationFailed {
                requested: 4096,
                placement: ArenaPlacement::Heap,
                region: Some(MemoryRegion::Default),
            }
        );
    }

    #[test]
    fn test_prefer_internal_falls_back_to_heap() {
        let platform = HostPlatform::with_budgets(8192, 1024);
        let arena = Arena::allocate(4096, ArenaPlacement::PreferInternal, &platform).unwrap();
        assert_eq!(arena.region(), MemoryRegion::Default);

        let platform = HostPlatform::with_budgets(8192, 8192);
        let arena = Arena::allocate(4096, ArenaPlacement::PreferInternal, &platform).unwrap();
        assert_eq!(arena.region(), MemoryRegion::Internal);
    }

    #[test]
    fn test_internal_only_never_touches_heap() {
        let platform = HostPlatform::with_budgets(1024 * 1024, 1024);
        let err = Arena::allocate(4096, ArenaPlacement::InternalOnly, &platform).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::ArenaAllocationFailed);
        assert_eq!(platform.free_bytes(MemoryRegion::Default), 1024 * 1024);
    }

    #[test]
    fn test_placement_parse() {
        assert_eq!("heap".parse(), Ok(ArenaPlacement::Heap));
        assert_eq!(" Internal ".parse(), Ok(ArenaPlacement::InternalOnly));
        assert_eq!(
            "prefer-internal".parse(),
            Ok(ArenaPlacement::PreferInternal)
        );
        assert_eq!("psram".parse::<ArenaPlacement>(), Err(ParsePlacementError));
        assert_eq!(ArenaPlacement::PreferInternal.to_string(), "prefer-internal");
    }
}
