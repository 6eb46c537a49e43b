// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime binder
//!
//! Ties a validated model, a populated registry and an arena together and
//! runs tensor planning exactly once.

use log::error;

use crate::arena::Arena;
use crate::error::{CorruptReason, LoadError, Result};
use crate::model::{ParsedModel, SubGraph, TensorIds};
use crate::planner::{TensorPlan, TensorPlanner};
use crate::resolver::OpResolver;

/// Model bound to its registry and arena, with tensors planned
#[derive(Debug)]
pub struct Interpreter<'m, 'r, const N: usize> {
    model: ParsedModel<'m>,
    subgraph: SubGraph<'m>,
    resolver: &'r OpResolver<N>,
    arena: Arena,
    plan: TensorPlan,
}

impl<'m, 'r, const N: usize> Interpreter<'m, 'r, N> {
    /// Bind and plan
    ///
    /// The arena is consumed; on failure it is dropped with the error.
    ///
    /// # Errors
    /// `TensorAllocationFailed` when `planner` rejects the model.
    pub fn bind<P: TensorPlanner>(
        model: ParsedModel<'m>,
        resolver: &'r OpResolver<N>,
        mut arena: Arena,
        planner: &P,
    ) -> Result<Self> {
        let subgraph = model.subgraph(0)?;
        let plan = planner
            .plan(&model, resolver, arena.as_mut_slice())
            .map_err(|err| {
                error!("AllocateTensors() failed: {}", err);
                LoadError::TensorAllocationFailed(err)
            })?;

        Ok(Self {
            model,
            subgraph,
            resolver,
            arena,
            plan,
        })
    }

    /// Bound model
    pub fn model(&self) -> &ParsedModel<'m> {
        &self.model
    }

    /// Bound registry
    pub fn resolver(&self) -> &'r OpResolver<N> {
        self.resolver
    }

    /// Bound arena
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Tensor plan produced at bind time
    pub fn plan(&self) -> &TensorPlan {
        &self.plan
    }

    /// Arena bytes occupied after planning
    pub fn arena_used_bytes(&self) -> usize {
        self.plan.used_bytes
    }

    /// Number of tensors in the graph
    pub fn tensor_count(&self) -> usize {
        self.subgraph.tensor_count()
    }

    /// Graph input tensor indices
    pub fn inputs(&self) -> core::result::Result<TensorIds<'m>, CorruptReason> {
        self.subgraph.inputs()
    }

    /// Graph output tensor indices
    pub fn outputs(&self) -> core::result::Result<TensorIds<'m>, CorruptReason> {
        self.subgraph.outputs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaPlacement;
    use crate::error::PlanError;
    use crate::fixtures::{ModelBuilder, TensorSpec};
    use crate::model::ModelBlob;
    use crate::planner::LinearPlanner;
    use crate::schema::BuiltinOperator;
    use meter_reader_hal::HostPlatform;

    fn model_bytes() -> std::vec::Vec<u8> {
        ModelBuilder::new()
            .tensor(TensorSpec::activation(&[1, 8, 8, 1], 9))
            .tensor(TensorSpec::constant(&[4, 3, 3, 1], 9, 36))
            .tensor(TensorSpec::activation(&[1, 6, 6, 4], 9))
            .operator(BuiltinOperator::CONV_2D, &[0, 1], &[2])
            .inputs(&[0])
            .outputs(&[2])
            .build()
    }

    #[test]
    fn test_bind_success() {
        let bytes = model_bytes();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let mut resolver = OpResolver::<10>::new();
        resolver.add_conv_2d().unwrap();
        let platform = HostPlatform::new();
        let arena = Arena::allocate(4096, ArenaPlacement::Heap, &platform).unwrap();

        let interpreter = Interpreter::bind(model, &resolver, arena, &LinearPlanner).unwrap();
        assert_eq!(interpreter.tensor_count(), 3);
        assert!(interpreter.arena_used_bytes() > 0);
        assert!(interpreter.arena_used_bytes() <= interpreter.arena().actual_size());
        assert_eq!(interpreter.inputs().unwrap().get(0), Some(0));
        assert_eq!(interpreter.outputs().unwrap().get(0), Some(2));
        assert_eq!(interpreter.resolver().len(), 1);
    }

    #[test]
    fn test_bind_reports_tensor_allocation_failure() {
        let bytes = model_bytes();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let mut resolver = OpResolver::<10>::new();
        resolver.add_conv_2d().unwrap();
        let platform = HostPlatform::new();
        let arena = Arena::allocate(64, ArenaPlacement::Heap, &platform).unwrap();

        let err = Interpreter::bind(model, &resolver, arena, &LinearPlanner).unwrap_err();
        assert!(matches!(
            err,
            LoadError::TensorAllocationFailed(PlanError::ArenaTooSmall { available: 64, .. })
        ));
    }
}
