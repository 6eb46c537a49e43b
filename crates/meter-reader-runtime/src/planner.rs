// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tensor-memory planning
//!
//! `TensorPlanner` is the seam to the inference runtime's allocator. The
//! bundled `LinearPlanner` checks kernel coverage and places every
//! non-constant tensor back to back in the arena, which is an upper bound
//! on what a lifetime-aware planner needs.

use alloc::vec::Vec;

use log::debug;

use crate::error::PlanError;
use crate::model::ParsedModel;
use crate::resolver::OpResolver;

/// Alignment of every tensor placed in the arena
pub const TENSOR_ALIGNMENT: usize = 16;

/// Per-tensor runtime bookkeeping kept in the arena
pub const TENSOR_OVERHEAD_BYTES: usize = 64;

/// Per-invocation runtime bookkeeping kept in the arena
pub const NODE_OVERHEAD_BYTES: usize = 32;

/// Placement of one tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorAllocation {
    /// Tensor index in the subgraph
    pub tensor: usize,
    /// Byte offset in the arena
    pub offset: usize,
    /// Bytes reserved
    pub size: usize,
}

/// Result of a successful planning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TensorPlan {
    /// Arena-resident tensors in placement order
    pub allocations: Vec<TensorAllocation>,
    /// Arena bytes the plan occupies, bookkeeping included
    pub used_bytes: usize,
}

/// Tensor-memory planning collaborator
pub trait TensorPlanner {
    /// Plan tensor memory for `model` inside `arena`
    ///
    /// # Errors
    /// Any [`PlanError`]; the caller reports it as a tensor allocation failure.
    fn plan<const N: usize>(
        &self,
        model: &ParsedModel<'_>,
        resolver: &OpResolver<N>,
        arena: &mut [u8],
    ) -> Result<TensorPlan, PlanError>;
}

/// Sequential placement without buffer reuse
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPlanner;

impl LinearPlanner {
    /// New planner
    pub const fn new() -> Self {
        Self
    }
}

const fn align_up(value: usize, alignment: usize) -> Option<usize> {
    match value.checked_add(alignment - 1) {
        Some(v) => Some(v / alignment * alignment),
        None => None,
    }
}

fn overflow(available: usize) -> PlanError {
    PlanError::ArenaTooSmall {
        required: usize::MAX,
        available,
    }
}

impl TensorPlanner for LinearPlanner {
    fn plan<const N: usize>(
        &self,
        model: &ParsedModel<'_>,
        resolver: &OpResolver<N>,
        arena: &mut [u8],
    ) -> Result<TensorPlan, PlanError> {
        let subgraph = model.subgraph(0)?;

        for index in 0..subgraph.operator_count() {
            let opcode_index = subgraph.opcode_index(index)?;
            let op = model.operator_code(opcode_index)?.builtin;
            if !resolver.contains(op) {
                return Err(PlanError::MissingKernel {
                    name: op.name(),
                    code: op.code(),
                });
            }
        }

        let available = arena.len();
        let mut allocations = Vec::new();
        let mut cursor = 0usize;

        for index in 0..subgraph.tensor_count() {
            let tensor = subgraph.tensor(index)?;
            if model.buffer_has_data(tensor.buffer)? {
                // Weights stay in the model buffer
                continue;
            }

            let elements = tensor
                .element_count()
                .ok_or(PlanError::DynamicShape { tensor: index })?;
            let size = tensor
                .tensor_type
                .and_then(|t| t.bytes_for(elements))
                .ok_or(PlanError::UnsupportedTensorType {
                    tensor: index,
                    type_code: tensor.type_code,
                })?;

            let offset = align_up(cursor, TENSOR_ALIGNMENT).ok_or_else(|| overflow(available))?;
            cursor = offset.checked_add(size).ok_or_else(|| overflow(available))?;
            allocations.push(TensorAllocation {
                tensor: index,
                offset,
                size,
            });
        }

        let bookkeeping = subgraph
            .tensor_count()
            .checked_mul(TENSOR_OVERHEAD_BYTES)
            .and_then(|t| {
                subgraph
                    .operator_count()
                    .checked_mul(NODE_OVERHEAD_BYTES)
                    .and_then(|n| t.checked_add(n))
            })
            .ok_or_else(|| overflow(available))?;
        let required = align_up(cursor, TENSOR_ALIGNMENT)
            .and_then(|c| c.checked_add(bookkeeping))
            .ok_or_else(|| overflow(available))?;

        if required > available {
            return Err(PlanError::ArenaTooSmall {
                required,
                available,
            });
        }

        // Tensors start zeroed on every plan
        arena[..required].fill(0);

        debug!(
            "Planned {} arena tensors, {} of {} bytes used",
            allocations.len(),
            required,
            available
        );

        Ok(TensorPlan {
            allocations,
            used_bytes: required,
        })
    }
}
