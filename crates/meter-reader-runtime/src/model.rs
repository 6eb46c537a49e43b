// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Model validation
//!
//! Interprets a TFLite flatbuffer in place and checks its schema version.
//! The whole table structure the loader relies on is walked once during
//! validation, so later accessors only fail on buffers that were mutated
//! underneath the view (which `&[u8]` rules out).

use log::{error, info};

use crate::error::{CorruptReason, LoadError, Result};
use crate::flatbuffer::{self, Table, Vector};
use crate::schema::{BuiltinOperator, TensorType, FILE_IDENTIFIER, SCHEMA_VERSION};

/// Reads on an already validated model only fail on corruption
type ReadResult<T> = core::result::Result<T, CorruptReason>;

// Model table slots
const MODEL_VERSION: usize = 0;
const MODEL_OPERATOR_CODES: usize = 1;
const MODEL_SUBGRAPHS: usize = 2;
const MODEL_DESCRIPTION: usize = 3;
const MODEL_BUFFERS: usize = 4;

// OperatorCode table slots
const OPCODE_DEPRECATED_BUILTIN: usize = 0;
const OPCODE_CUSTOM_CODE: usize = 1;
const OPCODE_VERSION: usize = 2;
const OPCODE_BUILTIN: usize = 3;

// SubGraph table slots
const SUBGRAPH_TENSORS: usize = 0;
const SUBGRAPH_INPUTS: usize = 1;
const SUBGRAPH_OUTPUTS: usize = 2;
const SUBGRAPH_OPERATORS: usize = 3;
const SUBGRAPH_NAME: usize = 4;

// Tensor table slots
const TENSOR_SHAPE: usize = 0;
const TENSOR_TYPE: usize = 1;
const TENSOR_BUFFER: usize = 2;
const TENSOR_NAME: usize = 3;
const TENSOR_IS_VARIABLE: usize = 5;

// Operator table slots
const OPERATOR_OPCODE_INDEX: usize = 0;
const OPERATOR_INPUTS: usize = 1;
const OPERATOR_OUTPUTS: usize = 2;

// Buffer table slots
const BUFFER_DATA: usize = 0;
const BUFFER_OFFSET: usize = 1;
const BUFFER_SIZE: usize = 2;

/// Raw model bytes as handed over by the asset supplier
///
/// `None` stands for a missing (null) model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelBlob<'a> {
    data: Option<&'a [u8]>,
}

impl<'a> ModelBlob<'a> {
    /// Blob over `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data: Some(data) }
    }

    /// Blob with no backing data
    pub const fn missing() -> Self {
        Self { data: None }
    }

    /// Declared length in bytes (0 when missing)
    pub fn len(&self) -> usize {
        self.data.map_or(0, <[u8]>::len)
    }

    /// True when there is nothing to load
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backing bytes, if any
    pub fn bytes(&self) -> Option<&'a [u8]> {
        self.data
    }
}

impl<'a> From<&'a [u8]> for ModelBlob<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a> From<Option<&'a [u8]>> for ModelBlob<'a> {
    fn from(data: Option<&'a [u8]>) -> Self {
        Self { data }
    }
}

/// Validated, zero-copy view of a TFLite model
#[derive(Debug, Clone, Copy)]
pub struct ParsedModel<'a> {
    bytes: &'a [u8],
    root: Table<'a>,
    version: u32,
}

impl<'a> ParsedModel<'a> {
    /// Validate `blob` and return a view over it
    ///
    /// # Errors
    /// - `ModelUnavailable` for a missing or empty blob
    /// - `ModelCorrupt` when the bytes are not a readable TFLite flatbuffer
    /// - `SchemaMismatch` when the schema version is not [`SCHEMA_VERSION`]
    pub fn validate(blob: ModelBlob<'a>) -> Result<Self> {
        let bytes = match blob.bytes() {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                error!("No model data available");
                return Err(LoadError::ModelUnavailable);
            }
        };

        info!("Loading model ({} bytes)", bytes.len());

        let model = Self::interpret(bytes).map_err(|reason| {
            error!(
                "Failed to get model from buffer. The model data may be corrupt or invalid: {}",
                reason
            );
            LoadError::ModelCorrupt(reason)
        })?;

        if model.version != SCHEMA_VERSION {
            error!(
                "Model schema version mismatch: model has {}, runtime expects {}",
                model.version, SCHEMA_VERSION
            );
            return Err(LoadError::SchemaMismatch {
                found: model.version,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(model)
    }

    fn interpret(bytes: &'a [u8]) -> ReadResult<Self> {
        let root = flatbuffer::root(bytes)?;

        // Identifier is optional in flatbuffers; a foreign one is not.
        if let Some(id) = flatbuffer::identifier(bytes) {
            if id != FILE_IDENTIFIER && id != [0; 4] {
                return Err(CorruptReason::BadIdentifier(id));
            }
        }

        let version = root.u32_or(MODEL_VERSION, 0)?;
        let model = Self {
            bytes,
            root,
            version,
        };
        model.verify()?;
        Ok(model)
    }

    /// Walk every table the loader and planner read
    fn verify(&self) -> ReadResult<()> {
        let opcodes = self.opcode_vector()?;
        for index in 0..opcodes.len() {
            OperatorCode::read(opcodes.table(index, "operator code")?)?;
        }

        let buffer_count = match self.root.vector(MODEL_BUFFERS)? {
            Some(buffers) => {
                for index in 0..buffers.len() {
                    let buffer = buffers.table(index, "buffer")?;
                    if let Some(data) = buffer.vector(BUFFER_DATA)? {
                        data.bytes(1)?;
                    }
                    buffer.u64_or(BUFFER_OFFSET, 0)?;
                    buffer.u64_or(BUFFER_SIZE, 0)?;
                }
                buffers.len()
            }
            None => 0,
        };

        self.root.string(MODEL_DESCRIPTION)?;

        if let Some(subgraphs) = self.subgraph_vector()? {
            for index in 0..subgraphs.len() {
                let subgraph = SubGraph {
                    table: subgraphs.table(index, "subgraph")?,
                };
                subgraph.verify(opcodes.len(), buffer_count)?;
            }
        }
        Ok(())
    }

    fn opcode_vector(&self) -> ReadResult<Vector<'a>> {
        self.root
            .vector(MODEL_OPERATOR_CODES)?
            .ok_or(CorruptReason::MissingField {
                table: "Model",
                field: "operator_codes",
            })
    }

    /// Absent means no subgraphs, which the survey rejects as a topology
    fn subgraph_vector(&self) -> ReadResult<Option<Vector<'a>>> {
        self.root.vector(MODEL_SUBGRAPHS)
    }

    /// Schema version stored in the model
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Size of the underlying buffer in bytes
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Free-form description written by the converter
    pub fn description(&self) -> Option<&'a str> {
        self.root.string(MODEL_DESCRIPTION).ok().flatten()
    }

    /// Number of entries in the operator-code table
    pub fn operator_code_count(&self) -> usize {
        self.opcode_vector().map_or(0, |v| v.len())
    }

    /// Operator code at `index` in the operator-code table
    pub fn operator_code(&self, index: usize) -> ReadResult<OperatorCode<'a>> {
        let table = self.opcode_vector()?.table(index, "operator code")?;
        OperatorCode::read(table)
    }

    /// Number of subgraphs
    pub fn subgraph_count(&self) -> usize {
        match self.subgraph_vector() {
            Ok(Some(subgraphs)) => subgraphs.len(),
            _ => 0,
        }
    }

    /// Subgraph at `index`
    pub fn subgraph(&self, index: usize) -> ReadResult<SubGraph<'a>> {
        let table = match self.subgraph_vector()? {
            Some(subgraphs) => subgraphs.table(index, "subgraph")?,
            None => {
                return Err(CorruptReason::IndexOutOfRange {
                    what: "subgraph",
                    index,
                    len: 0,
                })
            }
        };
        Ok(SubGraph { table })
    }

    /// True when buffer `index` carries constant data
    ///
    /// Buffer 0 is the schema's empty sentinel.
    pub fn buffer_has_data(&self, index: u32) -> ReadResult<bool> {
        if index == 0 {
            return Ok(false);
        }
        let buffers = match self.root.vector(MODEL_BUFFERS)? {
            Some(buffers) => buffers,
            None => return Ok(false),
        };
        let buffer = buffers.table(index as usize, "buffer")?;
        let inline = buffer.vector(BUFFER_DATA)?.map_or(false, |d| !d.is_empty());
        // Models over 2 GB keep data outside the flatbuffer (offset/size)
        let external = buffer.u64_or(BUFFER_SIZE, 0)? > 0;
        Ok(inline || external)
    }
}

/// One entry of the model's operator-code table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorCode<'a> {
    /// Effective builtin operator
    pub builtin: BuiltinOperator,
    /// Custom operator name (only for `CUSTOM`)
    pub custom_code: Option<&'a str>,
    /// Operator version
    pub version: i32,
}

impl<'a> OperatorCode<'a> {
    fn read(table: Table<'a>) -> ReadResult<Self> {
        let deprecated = table.i8_or(OPCODE_DEPRECATED_BUILTIN, 0)?;
        let builtin = table.i32_or(OPCODE_BUILTIN, 0)?;
        Ok(Self {
            builtin: BuiltinOperator::resolve(deprecated, builtin),
            custom_code: table.string(OPCODE_CUSTOM_CODE)?,
            version: table.i32_or(OPCODE_VERSION, 1)?,
        })
    }
}

/// A computation graph within the model
#[derive(Debug, Clone, Copy)]
pub struct SubGraph<'a> {
    table: Table<'a>,
}

impl<'a> SubGraph<'a> {
    fn verify(&self, opcode_count: usize, buffer_count: usize) -> ReadResult<()> {
        self.table.string(SUBGRAPH_NAME)?;

        let tensors = self.tensor_vector()?;
        for index in 0..tensors.len() {
            let tensor = self.tensor(index)?;
            // Buffer 0 is the empty sentinel even when the table is missing
            let buffer = tensor.buffer as usize;
            if buffer != 0 && buffer >= buffer_count {
                return Err(CorruptReason::IndexOutOfRange {
                    what: "buffer",
                    index: buffer,
                    len: buffer_count,
                });
            }
        }

        for slot in [SUBGRAPH_INPUTS, SUBGRAPH_OUTPUTS] {
            if let Some(ids) = self.table.vector(slot)? {
                for i in 0..ids.len() {
                    let id = ids.i32(i, "subgraph io")?;
                    check_tensor_index(id, tensors.len())?;
                }
            }
        }

        let operators = self.operator_vector()?;
        for index in 0..operators.len() {
            let op = operators.table(index, "operator")?;
            let opcode_index = op.u32_or(OPERATOR_OPCODE_INDEX, 0)? as usize;
            if opcode_index >= opcode_count {
                return Err(CorruptReason::IndexOutOfRange {
                    what: "opcode",
                    index: opcode_index,
                    len: opcode_count,
                });
            }
            for slot in [OPERATOR_INPUTS, OPERATOR_OUTPUTS] {
                if let Some(ids) = op.vector(slot)? {
                    for i in 0..ids.len() {
                        check_tensor_index(ids.i32(i, "operator io")?, tensors.len())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn tensor_vector(&self) -> ReadResult<Vector<'a>> {
        self.table
            .vector(SUBGRAPH_TENSORS)?
            .ok_or(CorruptReason::MissingField {
                table: "SubGraph",
                field: "tensors",
            })
    }

    fn operator_vector(&self) -> ReadResult<Vector<'a>> {
        self.table
            .vector(SUBGRAPH_OPERATORS)?
            .ok_or(CorruptReason::MissingField {
                table: "SubGraph",
                field: "operators",
            })
    }

    /// Subgraph name, if set
    pub fn name(&self) -> Option<&'a str> {
        self.table.string(SUBGRAPH_NAME).ok().flatten()
    }

    /// Number of operator invocations
    pub fn operator_count(&self) -> usize {
        self.operator_vector().map_or(0, |v| v.len())
    }

    /// Operator-code index used by invocation `index`
    pub fn opcode_index(&self, index: usize) -> ReadResult<usize> {
        let op = self.operator_vector()?.table(index, "operator")?;
        Ok(op.u32_or(OPERATOR_OPCODE_INDEX, 0)? as usize)
    }

    /// Number of tensors
    pub fn tensor_count(&self) -> usize {
        self.tensor_vector().map_or(0, |v| v.len())
    }

    /// Tensor metadata at `index`
    pub fn tensor(&self, index: usize) -> ReadResult<TensorInfo<'a>> {
        let table = self.tensor_vector()?.table(index, "tensor")?;
        let type_code = table.i8_or(TENSOR_TYPE, 0)?;
        let shape = match table.vector(TENSOR_SHAPE)? {
            Some(shape) => Some(shape.bytes(4)?),
            None => None,
        };
        Ok(TensorInfo {
            shape_bytes: shape.unwrap_or(&[]),
            type_code,
            tensor_type: TensorType::from_code(type_code),
            buffer: table.u32_or(TENSOR_BUFFER, 0)?,
            name: table.string(TENSOR_NAME)?,
            is_variable: table.bool_or(TENSOR_IS_VARIABLE, false)?,
        })
    }

    /// Graph input tensor indices
    pub fn inputs(&self) -> ReadResult<TensorIds<'a>> {
        self.ids(SUBGRAPH_INPUTS)
    }

    /// Graph output tensor indices
    pub fn outputs(&self) -> ReadResult<TensorIds<'a>> {
        self.ids(SUBGRAPH_OUTPUTS)
    }

    fn ids(&self, slot: usize) -> ReadResult<TensorIds<'a>> {
        Ok(TensorIds {
            vector: self.table.vector(slot)?,
        })
    }
}

fn check_tensor_index(id: i32, len: usize) -> ReadResult<()> {
    // -1 marks an optional tensor that is not present
    if id < -1 || (id >= 0 && id as usize >= len) {
        return Err(CorruptReason::IndexOutOfRange {
            what: "tensor",
            index: id.max(0) as usize,
            len,
        });
    }
    Ok(())
}

/// Tensor indices of a graph's inputs or outputs
#[derive(Debug, Clone, Copy)]
pub struct TensorIds<'a> {
    vector: Option<Vector<'a>>,
}

impl TensorIds<'_> {
    /// Number of indices
    pub fn len(&self) -> usize {
        self.vector.map_or(0, |v| v.len())
    }

    /// True when there are no indices
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at `i`
    pub fn get(&self, i: usize) -> Option<i32> {
        self.vector.and_then(|v| v.i32(i, "tensor id").ok())
    }
}

/// Tensor metadata needed for memory planning
#[derive(Debug, Clone, Copy)]
pub struct TensorInfo<'a> {
    shape_bytes: &'a [u8],
    /// Raw schema type byte
    pub type_code: i8,
    /// Decoded element type
    pub tensor_type: Option<TensorType>,
    /// Index into the model's buffer table
    pub buffer: u32,
    /// Tensor name, if set
    pub name: Option<&'a str>,
    /// Variable tensors persist across invocations
    pub is_variable: bool,
}

impl TensorInfo<'_> {
    /// Dimensions, outermost first
    pub fn shape(&self) -> impl Iterator<Item = i32> + '_ {
        self.shape_bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Number of elements, `None` when a dimension is unknown (negative)
    pub fn element_count(&self) -> Option<usize> {
        self.shape().try_fold(1usize, |acc, dim| {
            usize::try_from(dim).ok().and_then(|d| acc.checked_mul(d))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use crate::fixtures::{ModelBuilder, TensorSpec};

    fn simple_model() -> alloc::vec::Vec<u8> {
        ModelBuilder::new()
            .tensor(TensorSpec::activation(&[1, 8], 9))
            .tensor(TensorSpec::activation(&[1, 4], 9))
            .operator(BuiltinOperator::FULLY_CONNECTED, &[0], &[1])
            .operator(BuiltinOperator::SOFTMAX, &[1], &[1])
            .build()
    }

    #[test]
    fn test_missing_and_empty_blob() {
        let err = ParsedModel::validate(ModelBlob::missing()).unwrap_err();
        assert_eq!(err, LoadError::ModelUnavailable);
        let err = ParsedModel::validate(ModelBlob::new(&[])).unwrap_err();
        assert_eq!(err, LoadError::ModelUnavailable);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let err = ParsedModel::validate(ModelBlob::new(&[0xFF; 64])).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::ModelCorrupt);
        let err = ParsedModel::validate(ModelBlob::new(&[1, 2, 3])).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::ModelCorrupt);
    }

    #[test]
    fn test_truncated_model_is_corrupt() {
        let bytes = simple_model();
        for cut in [8, bytes.len() / 2, bytes.len() - 4] {
            let err = ParsedModel::validate(ModelBlob::new(&bytes[..cut])).unwrap_err();
            assert_eq!(err.kind(), LoadErrorKind::ModelCorrupt, "cut at {}", cut);
        }
    }

    #[test]
    fn test_schema_mismatch() {
        let bytes = ModelBuilder::new().version(2).build();
        let err = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap_err();
        assert_eq!(
            err,
            LoadError::SchemaMismatch {
                found: 2,
                expected: SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn test_valid_model_accessors() {
        let bytes = simple_model();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        assert_eq!(model.version(), SCHEMA_VERSION);
        assert_eq!(model.byte_len(), bytes.len());
        assert_eq!(model.subgraph_count(), 1);
        assert_eq!(model.operator_code_count(), 2);
        assert_eq!(
            model.operator_code(0).unwrap().builtin,
            BuiltinOperator::FULLY_CONNECTED
        );

        let subgraph = model.subgraph(0).unwrap();
        assert_eq!(subgraph.operator_count(), 2);
        assert_eq!(subgraph.opcode_index(1).unwrap(), 1);
        assert_eq!(subgraph.tensor_count(), 2);
        let tensor = subgraph.tensor(0).unwrap();
        assert_eq!(tensor.element_count(), Some(8));
        assert_eq!(tensor.tensor_type, Some(TensorType::Int8));
    }

    #[test]
    fn test_opcode_index_out_of_range_is_corrupt() {
        let bytes = ModelBuilder::new()
            .tensor(TensorSpec::activation(&[4], 9))
            .raw_operator(5, &[0], &[0])
            .build();
        let err = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ModelCorrupt(CorruptReason::IndexOutOfRange { what: "opcode", .. })
        ));
    }

    #[test]
    fn test_tensor_buffer_out_of_range_is_corrupt() {
        let bytes = ModelBuilder::new()
            .tensor(TensorSpec::activation(&[4], 9))
            .tensor(TensorSpec::activation(&[4], 9).buffer(7))
            .operator(BuiltinOperator::SOFTMAX, &[0], &[1])
            .build();
        let err = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap_err();
        assert_eq!(
            err,
            LoadError::ModelCorrupt(CorruptReason::IndexOutOfRange {
                what: "buffer",
                index: 7,
                len: 1
            })
        );
    }

    #[test]
    fn test_corrupt_tensor_table_caught_by_validate() {
        let bytes = simple_model();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let tensors = model.subgraph(0).unwrap().tensor_vector().unwrap();
        let table = tensors.table(1, "tensor").unwrap();

        // Point the tensor's buffer field past the end of the model
        let mut corrupt = bytes.clone();
        let field = table.field(TENSOR_BUFFER).unwrap().unwrap();
        corrupt[field..field + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = ParsedModel::validate(ModelBlob::new(&corrupt)).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::ModelCorrupt);
    }

    #[test]
    fn test_shared_tensor_vtable() {
        let bytes = ModelBuilder::new()
            .shared_tensor_vtable()
            .tensor(TensorSpec::activation(&[1, 8], 9).named("input"))
            .tensor(TensorSpec::constant(&[8, 4], 9, 32))
            .tensor(TensorSpec::activation(&[1, 4], 2))
            .operator(BuiltinOperator::FULLY_CONNECTED, &[0, 1], &[2])
            .build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        let subgraph = model.subgraph(0).unwrap();
        assert_eq!(subgraph.tensor_count(), 3);

        let input = subgraph.tensor(0).unwrap();
        assert_eq!(input.name, Some("input"));
        assert_eq!(input.element_count(), Some(8));
        let weights = subgraph.tensor(1).unwrap();
        assert_eq!(weights.name, Some(""));
        assert!(model.buffer_has_data(weights.buffer).unwrap());
        let output = subgraph.tensor(2).unwrap();
        assert_eq!(output.tensor_type, Some(TensorType::Int32));
        assert_eq!(output.buffer, 0);
    }

    #[test]
    fn test_absent_subgraphs_field_means_none() {
        let bytes = ModelBuilder::new().omit_subgraphs().build();
        let model = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap();
        assert_eq!(model.subgraph_count(), 0);
        assert!(matches!(
            model.subgraph(0),
            Err(CorruptReason::IndexOutOfRange { what: "subgraph", len: 0, .. })
        ));
    }

    #[test]
    fn test_foreign_identifier_rejected() {
        let mut bytes = simple_model();
        bytes[4..8].copy_from_slice(b"ONNX");
        let err = ParsedModel::validate(ModelBlob::new(&bytes)).unwrap_err();
        assert_eq!(
            err,
            LoadError::ModelCorrupt(CorruptReason::BadIdentifier(*b"ONNX"))
        );
    }
}
