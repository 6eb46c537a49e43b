// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for model loading

use core::fmt;

use meter_reader_hal::MemoryRegion;

use crate::arena::ArenaPlacement;

/// Flat taxonomy of load failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// No model bytes were supplied
    ModelUnavailable,
    /// Model bytes are not a readable TFLite flatbuffer
    ModelCorrupt,
    /// Model schema version differs from the compiled-in one
    SchemaMismatch,
    /// Model does not contain exactly one subgraph
    UnsupportedTopology,
    /// Model uses an operator outside the supported set
    UnsupportedOperator,
    /// Operator registry has no free slot
    RegistryFull,
    /// Tensor arena could not be allocated
    ArenaAllocationFailed,
    /// Tensor-memory planning failed
    TensorAllocationFailed,
    /// Setup was already attempted
    AlreadyInitialized,
}

/// Why a model buffer could not be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptReason {
    /// Buffer is shorter than the flatbuffer header
    TooSmall {
        /// Buffer length
        len: usize,
    },
    /// A read or offset points outside the buffer
    OutOfBounds {
        /// Position of the failed read
        position: usize,
        /// Buffer length
        len: usize,
    },
    /// A table's vtable is malformed
    BadVtable {
        /// Position of the table
        table: usize,
    },
    /// File identifier present but not `TFL3`
    BadIdentifier([u8; 4]),
    /// A required table or vector is absent
    MissingField {
        /// Table name
        table: &'static str,
        /// Field name
        field: &'static str,
    },
    /// An index refers past the end of its table
    IndexOutOfRange {
        /// What the index refers to
        what: &'static str,
        /// Offending index
        index: usize,
        /// Table length
        len: usize,
    },
    /// String is not valid UTF-8
    InvalidUtf8,
}

/// Tensor-memory planning failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// An operator in the graph has no registered kernel
    MissingKernel {
        /// Symbolic operator name
        name: &'static str,
        /// Numeric builtin code
        code: i32,
    },
    /// Arena cannot hold the planned tensors
    ArenaTooSmall {
        /// Bytes the plan needs
        required: usize,
        /// Bytes the arena has
        available: usize,
    },
    /// Tensor element type has no fixed size
    UnsupportedTensorType {
        /// Tensor index in the subgraph
        tensor: usize,
        /// Raw TensorType code
        type_code: i8,
    },
    /// Tensor shape has an unknown (negative) dimension
    DynamicShape {
        /// Tensor index in the subgraph
        tensor: usize,
    },
    /// Model structure broke during planning
    Corrupt(CorruptReason),
}

/// Load errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// Null or zero-length model blob
    ModelUnavailable,

    /// Malformed model buffer
    ModelCorrupt(CorruptReason),

    /// Schema version mismatch
    SchemaMismatch {
        /// Version found in the model
        found: u32,
        /// Version this runtime understands
        expected: u32,
    },

    /// Subgraph count other than one
    UnsupportedTopology {
        /// Number of subgraphs in the model
        subgraphs: usize,
    },

    /// Operator kind outside the supported set
    UnsupportedOperator {
        /// Symbolic operator name
        name: &'static str,
        /// Numeric builtin code
        code: i32,
    },

    /// Registry capacity exhausted
    RegistryFull {
        /// Compile-time registry capacity
        capacity: usize,
    },

    /// Arena allocation failed
    ArenaAllocationFailed {
        /// Requested arena size in bytes
        requested: usize,
        /// Placement policy in effect
        placement: ArenaPlacement,
        /// Last region attempted, if any
        region: Option<MemoryRegion>,
    },

    /// Tensor planning failed
    TensorAllocationFailed(PlanError),

    /// Setup already ran (successfully or not)
    AlreadyInitialized,
}

impl LoadError {
    /// Flat error kind
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::ModelUnavailable => LoadErrorKind::ModelUnavailable,
            LoadError::ModelCorrupt(_) => LoadErrorKind::ModelCorrupt,
            LoadError::SchemaMismatch { .. } => LoadErrorKind::SchemaMismatch,
            LoadError::UnsupportedTopology { .. } => LoadErrorKind::UnsupportedTopology,
            LoadError::UnsupportedOperator { .. } => LoadErrorKind::UnsupportedOperator,
            LoadError::RegistryFull { .. } => LoadErrorKind::RegistryFull,
            LoadError::ArenaAllocationFailed { .. } => LoadErrorKind::ArenaAllocationFailed,
            LoadError::TensorAllocationFailed(_) => LoadErrorKind::TensorAllocationFailed,
            LoadError::AlreadyInitialized => LoadErrorKind::AlreadyInitialized,
        }
    }
}

impl From<CorruptReason> for LoadError {
    fn from(reason: CorruptReason) -> Self {
        LoadError::ModelCorrupt(reason)
    }
}

impl From<CorruptReason> for PlanError {
    fn from(reason: CorruptReason) -> Self {
        PlanError::Corrupt(reason)
    }
}

impl From<PlanError> for LoadError {
    fn from(err: PlanError) -> Self {
        LoadError::TensorAllocationFailed(err)
    }
}

impl fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptReason::TooSmall { len } => {
                write!(f, "buffer of {} bytes is too small for a flatbuffer", len)
            }
            CorruptReason::OutOfBounds { position, len } => {
                write!(f, "read at {} is outside the {}-byte buffer", position, len)
            }
            CorruptReason::BadVtable { table } => {
                write!(f, "malformed vtable for table at {}", table)
            }
            CorruptReason::BadIdentifier(id) => {
                write!(f, "file identifier {:?} is not TFL3", id)
            }
            CorruptReason::MissingField { table, field } => {
                write!(f, "{}.{} is missing", table, field)
            }
            CorruptReason::IndexOutOfRange { what, index, len } => {
                write!(f, "{} index {} out of range (len {})", what, index, len)
            }
            CorruptReason::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::MissingKernel { name, code } => {
                write!(f, "no kernel registered for {} ({})", name, code)
            }
            PlanError::ArenaTooSmall { required, available } => {
                write!(
                    f,
                    "arena too small: {} bytes required, {} available",
                    required, available
                )
            }
            PlanError::UnsupportedTensorType { tensor, type_code } => {
                write!(f, "tensor {} has unsupported type {}", tensor, type_code)
            }
            PlanError::DynamicShape { tensor } => {
                write!(f, "tensor {} has a dynamic shape", tensor)
            }
            PlanError::Corrupt(reason) => write!(f, "model corrupt: {}", reason),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::ModelUnavailable => write!(f, "No model data available"),
            LoadError::ModelCorrupt(reason) => {
                write!(f, "Model data is corrupt or invalid: {}", reason)
            }
            LoadError::SchemaMismatch { found, expected } => {
                write!(
                    f,
                    "Model schema version mismatch: found {}, expected {}",
                    found, expected
                )
            }
            LoadError::UnsupportedTopology { subgraphs } => {
                write!(
                    f,
                    "Only single subgraph models are supported (model has {})",
                    subgraphs
                )
            }
            LoadError::UnsupportedOperator { name, code } => {
                write!(f, "Unsupported operator: {} ({})", name, code)
            }
            LoadError::RegistryFull { capacity } => {
                write!(f, "Operator registry full ({} kinds)", capacity)
            }
            LoadError::ArenaAllocationFailed {
                requested,
                placement,
                region,
            } => {
                write!(
                    f,
                    "Failed to allocate tensor arena of {} bytes (placement {}",
                    requested, placement
                )?;
                match region {
                    Some(region) => write!(f, ", last region {})", region),
                    None => write!(f, ")"),
                }
            }
            LoadError::TensorAllocationFailed(err) => {
                write!(f, "Failed to allocate tensors: {}", err)
            }
            LoadError::AlreadyInitialized => write!(f, "Model load already attempted"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CorruptReason {}

#[cfg(feature = "std")]
impl std::error::Error for PlanError {}

#[cfg(feature = "std")]
impl std::error::Error for LoadError {}

/// Result type for load operations
pub type Result<T> = core::result::Result<T, LoadError>;
