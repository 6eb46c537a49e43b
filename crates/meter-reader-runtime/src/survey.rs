// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Operator survey
//!
//! Lists the operator kind of every invocation in the model's graph.

use alloc::vec::Vec;

use log::{debug, error};

use crate::error::{LoadError, Result};
use crate::model::ParsedModel;
use crate::schema::BuiltinOperator;

/// Operator kinds required by `model`, in invocation order
///
/// Duplicates are kept; the registry collapses them.
///
/// # Errors
/// - `UnsupportedTopology` unless the model has exactly one subgraph
/// - `ModelCorrupt` when an invocation refers past the operator-code table
pub fn survey_operators(model: &ParsedModel<'_>) -> Result<Vec<BuiltinOperator>> {
    let subgraphs = model.subgraph_count();
    if subgraphs != 1 {
        error!("Only single subgraph models are supported (model has {})", subgraphs);
        return Err(LoadError::UnsupportedTopology { subgraphs });
    }

    let subgraph = model.subgraph(0)?;
    let mut required = Vec::with_capacity(subgraph.operator_count());

    for index in 0..subgraph.operator_count() {
        let opcode = model.operator_code(subgraph.opcode_index(index)?)?;
        match opcode.custom_code {
            Some(custom) if opcode.builtin == BuiltinOperator::CUSTOM => {
                debug!("Model requires op: {} ({})", opcode.builtin, custom)
            }
            _ => debug!("Model requires op: {}", opcode.builtin),
        }
        required.push(opcode.builtin);
    }

    Ok(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use crate::fixtures::{ModelBuilder, TensorSpec};
    use crate::model::ModelBlob;

    #[test]
    fn test_survey_keeps_order_and_duplicates() {
        let bytes = ModelBuilder::new()
            .tensor(TensorSpec::activation(&[1, 4], 9))
            .operator(BuiltinOperator::CONV_2D, &[0], &[0])
            .operator(BuiltinOperator::RESHAPE, &[0], &[0])
            .operator(BuiltinOperator::CONV_2D, &[0], &[0])
            .build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let ops = survey_operators(&model).unwrap();
        assert_eq!(
            ops,
            [
                BuiltinOperator::CONV_2D,
                BuiltinOperator::RESHAPE,
                BuiltinOperator::CONV_2D
            ]
        );
    }

    #[test]
    fn test_survey_rejects_multiple_subgraphs() {
        let bytes = ModelBuilder::new()
            .tensor(TensorSpec::activation(&[4], 9))
            .operator(BuiltinOperator::SOFTMAX, &[0], &[0])
            .extra_subgraphs(1)
            .build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let err = survey_operators(&model).unwrap_err();
        assert_eq!(err, LoadError::UnsupportedTopology { subgraphs: 2 });
    }

    #[test]
    fn test_survey_rejects_zero_subgraphs() {
        let bytes = ModelBuilder::new().without_subgraph().build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let err = survey_operators(&model).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::UnsupportedTopology);
    }

    #[test]
    fn test_survey_absent_subgraphs_field() {
        let bytes = ModelBuilder::new().omit_subgraphs().build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let err = survey_operators(&model).unwrap_err();
        assert_eq!(err, LoadError::UnsupportedTopology { subgraphs: 0 });
    }

    #[test]
    fn test_survey_empty_graph() {
        let bytes = ModelBuilder::new().build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        assert!(survey_operators(&model).unwrap().is_empty());
    }
}
