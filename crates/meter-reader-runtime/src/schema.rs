// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! TFLite schema constants: version, file identifier, builtin operators and
//! tensor types.

use core::fmt;

/// Schema version this runtime is compiled against
pub const SCHEMA_VERSION: u32 = 3;

/// Flatbuffer file identifier of TFLite models
pub const FILE_IDENTIFIER: [u8; 4] = *b"TFL3";

/// Names of builtin operators, indexed by code
const BUILTIN_NAMES: [&str; 128] = [
    "ADD",
    "AVERAGE_POOL_2D",
    "CONCATENATION",
    "CONV_2D",
    "DEPTHWISE_CONV_2D",
    "DEPTH_TO_SPACE",
    "DEQUANTIZE",
    "EMBEDDING_LOOKUP",
    "FLOOR",
    "FULLY_CONNECTED",
    "HASHTABLE_LOOKUP",
    "L2_NORMALIZATION",
    "L2_POOL_2D",
    "LOCAL_RESPONSE_NORMALIZATION",
    "LOGISTIC",
    "LSH_PROJECTION",
    "LSTM",
    "MAX_POOL_2D",
    "MUL",
    "RELU",
    "RELU_N1_TO_1",
    "RELU6",
    "RESHAPE",
    "RESIZE_BILINEAR",
    "RNN",
    "SOFTMAX",
    "SPACE_TO_DEPTH",
    "SVDF",
    "TANH",
    "CONCAT_EMBEDDINGS",
    "SKIP_GRAM",
    "CALL",
    "CUSTOM",
    "EMBEDDING_LOOKUP_SPARSE",
    "PAD",
    "UNIDIRECTIONAL_SEQUENCE_RNN",
    "GATHER",
    "BATCH_TO_SPACE_ND",
    "SPACE_TO_BATCH_ND",
    "TRANSPOSE",
    "MEAN",
    "SUB",
    "DIV",
    "SQUEEZE",
    "UNIDIRECTIONAL_SEQUENCE_LSTM",
    "STRIDED_SLICE",
    "BIDIRECTIONAL_SEQUENCE_RNN",
    "EXP",
    "TOPK_V2",
    "SPLIT",
    "LOG_SOFTMAX",
    "DELEGATE",
    "BIDIRECTIONAL_SEQUENCE_LSTM",
    "CAST",
    "PRELU",
    "MAXIMUM",
    "ARG_MAX",
    "MINIMUM",
    "LESS",
    "NEG",
    "PADV2",
    "GREATER",
    "GREATER_EQUAL",
    "LESS_EQUAL",
    "SELECT",
    "SLICE",
    "SIN",
    "TRANSPOSE_CONV",
    "SPARSE_TO_DENSE",
    "TILE",
    "EXPAND_DIMS",
    "EQUAL",
    "NOT_EQUAL",
    "LOG",
    "SUM",
    "SQRT",
    "RSQRT",
    "SHAPE",
    "POW",
    "ARG_MIN",
    "FAKE_QUANT",
    "REDUCE_PROD",
    "REDUCE_MAX",
    "PACK",
    "LOGICAL_OR",
    "ONE_HOT",
    "LOGICAL_AND",
    "LOGICAL_NOT",
    "UNPACK",
    "REDUCE_MIN",
    "FLOOR_DIV",
    "REDUCE_ANY",
    "SQUARE",
    "ZEROS_LIKE",
    "FILL",
    "FLOOR_MOD",
    "RANGE",
    "RESIZE_NEAREST_NEIGHBOR",
    "LEAKY_RELU",
    "SQUARED_DIFFERENCE",
    "MIRROR_PAD",
    "ABS",
    "SPLIT_V",
    "UNIQUE",
    "CEIL",
    "REVERSE_V2",
    "ADD_N",
    "GATHER_ND",
    "COS",
    "WHERE",
    "RANK",
    "ELU",
    "REVERSE_SEQUENCE",
    "MATRIX_DIAG",
    "QUANTIZE",
    "MATRIX_SET_DIAG",
    "ROUND",
    "HARD_SWISH",
    "IF",
    "WHILE",
    "NON_MAX_SUPPRESSION_V4",
    "NON_MAX_SUPPRESSION_V5",
    "SCATTER_ND",
    "SELECT_V2",
    "DENSIFY",
    "SEGMENT_SUM",
    "BATCH_MATMUL",
    "PLACEHOLDER_FOR_GREATER_OP_CODES",
];

/// TFLite builtin operator code
///
/// Codes without a name in this runtime's table are kept as-is and print as
/// `UNKNOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuiltinOperator(i32);

impl BuiltinOperator {
    pub const ADD: Self = Self(0);
    pub const AVERAGE_POOL_2D: Self = Self(1);
    pub const CONV_2D: Self = Self(3);
    pub const DEPTHWISE_CONV_2D: Self = Self(4);
    pub const DEQUANTIZE: Self = Self(6);
    pub const FULLY_CONNECTED: Self = Self(9);
    pub const LOGISTIC: Self = Self(14);
    pub const MAX_POOL_2D: Self = Self(17);
    pub const RELU: Self = Self(19);
    pub const RESHAPE: Self = Self(22);
    pub const SOFTMAX: Self = Self(25);
    pub const TANH: Self = Self(28);
    pub const CUSTOM: Self = Self(32);
    pub const QUANTIZE: Self = Self(114);
    pub const HARD_SWISH: Self = Self(117);
    pub const PLACEHOLDER_FOR_GREATER_OP_CODES: Self = Self(127);

    /// Wrap a raw builtin code
    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    /// Raw builtin code
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Symbolic name, `UNKNOWN` for codes outside the name table
    pub fn name(self) -> &'static str {
        usize::try_from(self.0)
            .ok()
            .and_then(|idx| BUILTIN_NAMES.get(idx).copied())
            .unwrap_or("UNKNOWN")
    }

    /// Effective operator of an OperatorCode table
    ///
    /// Schema 3a stores codes above 127 in `builtin_code` and leaves the
    /// legacy byte at the placeholder; older files only set the legacy byte.
    pub fn resolve(deprecated_builtin_code: i8, builtin_code: i32) -> Self {
        Self(core::cmp::max(deprecated_builtin_code as i32, builtin_code))
    }
}

impl fmt::Display for BuiltinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// TFLite tensor element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorType {
    Float32,
    Float16,
    Int32,
    UInt8,
    Int64,
    String,
    Bool,
    Int16,
    Complex64,
    Int8,
    Float64,
    Complex128,
    UInt64,
    Resource,
    Variant,
    UInt32,
    UInt16,
    Int4,
}

impl TensorType {
    /// Decode a schema type byte
    pub fn from_code(code: i8) -> Option<Self> {
        Some(match code {
            0 => TensorType::Float32,
            1 => TensorType::Float16,
            2 => TensorType::Int32,
            3 => TensorType::UInt8,
            4 => TensorType::Int64,
            5 => TensorType::String,
            6 => TensorType::Bool,
            7 => TensorType::Int16,
            8 => TensorType::Complex64,
            9 => TensorType::Int8,
            10 => TensorType::Float64,
            11 => TensorType::Complex128,
            12 => TensorType::UInt64,
            13 => TensorType::Resource,
            14 => TensorType::Variant,
            15 => TensorType::UInt32,
            16 => TensorType::UInt16,
            17 => TensorType::Int4,
            _ => return None,
        })
    }

    /// Bytes needed for `elements` values, `None` for variable-size types
    pub fn bytes_for(self, elements: usize) -> Option<usize> {
        let size = match self {
            TensorType::Bool | TensorType::Int8 | TensorType::UInt8 => 1,
            TensorType::Float16 | TensorType::Int16 | TensorType::UInt16 => 2,
            TensorType::Float32 | TensorType::Int32 | TensorType::UInt32 => 4,
            TensorType::Float64
            | TensorType::Int64
            | TensorType::UInt64
            | TensorType::Complex64 => 8,
            TensorType::Complex128 => 16,
            // Two values per byte
            TensorType::Int4 => return Some(elements.div_ceil(2)),
            TensorType::String | TensorType::Resource | TensorType::Variant => return None,
        };
        elements.checked_mul(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(BuiltinOperator::CONV_2D.name(), "CONV_2D");
        assert_eq!(BuiltinOperator::QUANTIZE.name(), "QUANTIZE");
        assert_eq!(BuiltinOperator::SOFTMAX.name(), "SOFTMAX");
        assert_eq!(BuiltinOperator::from_code(-3).name(), "UNKNOWN");
        assert_eq!(BuiltinOperator::from_code(4096).name(), "UNKNOWN");
    }

    #[test]
    fn test_resolve_prefers_larger_code() {
        assert_eq!(BuiltinOperator::resolve(3, 0), BuiltinOperator::CONV_2D);
        assert_eq!(BuiltinOperator::resolve(0, 114), BuiltinOperator::QUANTIZE);
        assert_eq!(
            BuiltinOperator::resolve(127, 150).code(),
            150,
            "extended codes come from builtin_code"
        );
    }

    #[test]
    fn test_tensor_sizes() {
        assert_eq!(TensorType::Int8.bytes_for(10), Some(10));
        assert_eq!(TensorType::Float32.bytes_for(10), Some(40));
        assert_eq!(TensorType::Int4.bytes_for(3), Some(2));
        assert_eq!(TensorType::String.bytes_for(1), None);
        assert_eq!(TensorType::from_code(9), Some(TensorType::Int8));
        assert_eq!(TensorType::from_code(99), None);
    }
}
