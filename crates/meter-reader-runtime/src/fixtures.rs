// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! TFLite model builder for tests and host tooling
//!
//! Emits a schema-conformant flatbuffer with one operator-code table, one
//! (or more, or zero) identical subgraphs and a buffer table. Objects are
//! laid out front to back: every vtable directly precedes its table and
//! every child follows its parent, so all offsets are forward. The one
//! exception is [`ModelBuilder::shared_tensor_vtable`], which emits a single
//! vtable after the tensor tables the way deduplicating converters do.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::schema::{BuiltinOperator, FILE_IDENTIFIER, SCHEMA_VERSION};

/// One tensor of the generated subgraph
#[derive(Debug, Clone)]
pub struct TensorSpec {
    shape: Vec<i32>,
    type_code: i8,
    data_len: Option<usize>,
    name: Option<String>,
    buffer: Option<u32>,
}

impl TensorSpec {
    /// Tensor that lives in the arena
    pub fn activation(shape: &[i32], type_code: i8) -> Self {
        Self {
            shape: shape.to_vec(),
            type_code,
            data_len: None,
            name: None,
            buffer: None,
        }
    }

    /// Tensor backed by `data_len` bytes of constant data in the model
    pub fn constant(shape: &[i32], type_code: i8, data_len: usize) -> Self {
        Self {
            data_len: Some(data_len),
            ..Self::activation(shape, type_code)
        }
    }

    /// Set the tensor name
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Point the tensor at buffer `index` instead of the generated one
    pub fn buffer(mut self, index: u32) -> Self {
        self.buffer = Some(index);
        self
    }
}

#[derive(Debug, Clone)]
struct OperatorSpec {
    opcode_index: u32,
    inputs: Vec<i32>,
    outputs: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
struct OpcodeSpec {
    code: i32,
    custom: Option<String>,
}

/// Builder for in-memory TFLite models
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    version: u32,
    identifier: [u8; 4],
    description: Option<String>,
    opcodes: Vec<OpcodeSpec>,
    tensors: Vec<TensorSpec>,
    operators: Vec<OperatorSpec>,
    inputs: Vec<i32>,
    outputs: Vec<i32>,
    subgraphs: Option<usize>,
    shared_tensor_vtable: bool,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    /// Schema-3 model with one empty subgraph
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            identifier: FILE_IDENTIFIER,
            description: None,
            opcodes: Vec::new(),
            tensors: Vec::new(),
            operators: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            subgraphs: Some(1),
            shared_tensor_vtable: false,
        }
    }

    /// Override the schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Override the file identifier
    pub fn file_identifier(mut self, identifier: [u8; 4]) -> Self {
        self.identifier = identifier;
        self
    }

    /// Set the model description
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a tensor
    pub fn tensor(mut self, tensor: TensorSpec) -> Self {
        self.tensors.push(tensor);
        self
    }

    /// Append an invocation of builtin `op`
    pub fn operator(self, op: BuiltinOperator, inputs: &[i32], outputs: &[i32]) -> Self {
        self.with_opcode(
            OpcodeSpec {
                code: op.code(),
                custom: None,
            },
            inputs,
            outputs,
        )
    }

    /// Append an invocation of custom operator `name`
    pub fn custom_operator(self, name: &str, inputs: &[i32], outputs: &[i32]) -> Self {
        self.with_opcode(
            OpcodeSpec {
                code: BuiltinOperator::CUSTOM.code(),
                custom: Some(name.into()),
            },
            inputs,
            outputs,
        )
    }

    /// Append an invocation with an explicit operator-code index
    pub fn raw_operator(mut self, opcode_index: u32, inputs: &[i32], outputs: &[i32]) -> Self {
        self.operators.push(OperatorSpec {
            opcode_index,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });
        self
    }

    fn with_opcode(mut self, opcode: OpcodeSpec, inputs: &[i32], outputs: &[i32]) -> Self {
        let index = match self.opcodes.iter().position(|o| *o == opcode) {
            Some(index) => index,
            None => {
                self.opcodes.push(opcode);
                self.opcodes.len() - 1
            }
        };
        self.raw_operator(index as u32, inputs, outputs)
    }

    /// Graph input tensors
    pub fn inputs(mut self, inputs: &[i32]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    /// Graph output tensors
    pub fn outputs(mut self, outputs: &[i32]) -> Self {
        self.outputs = outputs.to_vec();
        self
    }

    /// Repeat the subgraph `extra` more times
    pub fn extra_subgraphs(mut self, extra: usize) -> Self {
        self.subgraphs = Some(1 + extra);
        self
    }

    /// Emit an empty subgraph table
    pub fn without_subgraph(mut self) -> Self {
        self.subgraphs = Some(0);
        self
    }

    /// Leave the subgraphs field out of the model table
    pub fn omit_subgraphs(mut self) -> Self {
        self.subgraphs = None;
        self
    }

    /// Write one vtable, placed after the tensor tables, for all tensors
    ///
    /// Unnamed tensors get an empty name so every tensor has the same layout.
    pub fn shared_tensor_vtable(mut self) -> Self {
        self.shared_tensor_vtable = true;
        self
    }

    /// Serialize the model
    pub fn build(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.put_u32(0);
        w.buf.extend_from_slice(&self.identifier);

        let mut model_fields = vec![Field::U32(self.version), Field::Offset];
        model_fields.push(match self.subgraphs {
            Some(_) => Field::Offset,
            None => Field::Absent,
        });
        model_fields.push(if self.description.is_some() {
            Field::Offset
        } else {
            Field::Absent
        });
        model_fields.push(Field::Offset);
        let (model, slots) = w.table(&model_fields);
        w.link(0, model);
        let mut slots = slots.into_iter();
        let opcodes_slot = slots.next();
        let subgraphs_slot = self.subgraphs.and_then(|_| slots.next());
        let description_slot = self.description.as_ref().and_then(|_| slots.next());
        let buffers_slot = slots.next();

        if let Some(slot) = opcodes_slot {
            self.write_opcodes(&mut w, slot);
        }
        if let (Some(slot), Some(count)) = (subgraphs_slot, self.subgraphs) {
            let (vector, entries) = w.table_vector(count);
            w.link(slot, vector);
            for entry in entries {
                self.write_subgraph(&mut w, entry);
            }
        }
        if let (Some(slot), Some(description)) = (description_slot, &self.description) {
            let string = w.byte_vector(description.as_bytes(), true);
            w.link(slot, string);
        }
        if let Some(slot) = buffers_slot {
            self.write_buffers(&mut w, slot);
        }
        w.buf
    }

    fn write_opcodes(&self, w: &mut Writer, slot: usize) {
        let (vector, entries) = w.table_vector(self.opcodes.len());
        w.link(slot, vector);
        for (opcode, entry) in self.opcodes.iter().zip(entries) {
            // Codes past the legacy byte range sit at the placeholder there
            let legacy = opcode.code.clamp(0, 127) as u8;
            let custom = match opcode.custom {
                Some(_) => Field::Offset,
                None => Field::Absent,
            };
            let (table, slots) = w.table(&[
                Field::U8(legacy),
                custom,
                Field::I32(1),
                Field::I32(opcode.code),
            ]);
            w.link(entry, table);
            if let (Some(name), Some(&name_slot)) = (&opcode.custom, slots.first()) {
                let string = w.byte_vector(name.as_bytes(), true);
                w.link(name_slot, string);
            }
        }
    }

    fn write_subgraph(&self, w: &mut Writer, entry: usize) {
        let (table, slots) = w.table(&[
            Field::Offset,
            Field::Offset,
            Field::Offset,
            Field::Offset,
            Field::Offset,
        ]);
        w.link(entry, table);

        let (tensors, entries) = w.table_vector(self.tensors.len());
        w.link(slots[0], tensors);
        let shared = self.shared_tensor_vtable;
        let mut tables = Vec::with_capacity(self.tensors.len());
        let mut next_buffer = 1u32;
        for (tensor, entry) in self.tensors.iter().zip(entries) {
            let generated = match tensor.data_len {
                Some(_) => {
                    next_buffer += 1;
                    next_buffer - 1
                }
                None => 0,
            };
            let buffer = tensor.buffer.unwrap_or(generated);
            tables.push(write_tensor(w, entry, tensor, buffer, shared));
        }
        if shared && !tables.is_empty() {
            let vtable = w.vtable(&tensor_fields(None, 0, 0, true));
            for table in tables {
                w.set_vtable(table, vtable);
            }
        }

        let inputs = w.i32_vector(&self.inputs);
        w.link(slots[1], inputs);
        let outputs = w.i32_vector(&self.outputs);
        w.link(slots[2], outputs);

        let (operators, entries) = w.table_vector(self.operators.len());
        w.link(slots[3], operators);
        for (op, entry) in self.operators.iter().zip(entries) {
            let (table, op_slots) =
                w.table(&[Field::U32(op.opcode_index), Field::Offset, Field::Offset]);
            w.link(entry, table);
            let inputs = w.i32_vector(&op.inputs);
            w.link(op_slots[0], inputs);
            let outputs = w.i32_vector(&op.outputs);
            w.link(op_slots[1], outputs);
        }

        let name = w.byte_vector(b"main", true);
        w.link(slots[4], name);
    }

    fn write_buffers(&self, w: &mut Writer, slot: usize) {
        let constants: Vec<usize> = self.tensors.iter().filter_map(|t| t.data_len).collect();
        let (vector, entries) = w.table_vector(1 + constants.len());
        w.link(slot, vector);
        let mut entries = entries.into_iter();

        // Buffer 0 is the empty sentinel
        if let Some(entry) = entries.next() {
            let (table, _) = w.table(&[]);
            w.link(entry, table);
        }
        for (len, entry) in constants.into_iter().zip(entries) {
            let (table, slots) = w.table(&[Field::Offset]);
            w.link(entry, table);
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let data = w.byte_vector(&data, false);
            w.link(slots[0], data);
        }
    }
}

fn tensor_fields(name: Option<&str>, type_code: i8, buffer: u32, shared: bool) -> [Field; 4] {
    let name = match (name, shared) {
        (None, false) => Field::Absent,
        _ => Field::Offset,
    };
    [Field::Offset, Field::U8(type_code as u8), Field::U32(buffer), name]
}

/// Returns the tensor table position
fn write_tensor(
    w: &mut Writer,
    entry: usize,
    tensor: &TensorSpec,
    buffer: u32,
    shared: bool,
) -> usize {
    let fields = tensor_fields(tensor.name.as_deref(), tensor.type_code, buffer, shared);
    let (table, slots) = if shared {
        w.table_body(&fields)
    } else {
        w.table(&fields)
    };
    w.link(entry, table);
    let shape = w.i32_vector(&tensor.shape);
    w.link(slots[0], shape);
    if let Some(&name_slot) = slots.get(1) {
        let name = tensor.name.as_deref().unwrap_or("");
        let string = w.byte_vector(name.as_bytes(), true);
        w.link(name_slot, string);
    }
    table
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Absent,
    U8(u8),
    U32(u32),
    I32(i32),
    /// Forward reference, patched with `Writer::link`
    Offset,
}

#[derive(Debug, Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn pad(&mut self, extra: usize) {
        while (self.buf.len() + extra) % 4 != 0 {
            self.buf.push(0);
        }
    }

    fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a vtable and its table; returns the table position and the
    /// positions of its `Offset` slots in field order
    fn table(&mut self, fields: &[Field]) -> (usize, Vec<usize>) {
        let vtable = self.vtable(fields);
        let (table, slots) = self.table_body(fields);
        self.set_vtable(table, vtable);
        (table, slots)
    }

    /// Write the vtable describing `fields`; every field is 4 bytes wide
    fn vtable(&mut self, fields: &[Field]) -> usize {
        let vtable_len = 4 + 2 * fields.len();
        let mut offsets = Vec::with_capacity(fields.len());
        let mut table_len = 4usize;
        for field in fields {
            match field {
                Field::Absent => offsets.push(0u16),
                _ => {
                    offsets.push(table_len as u16);
                    table_len += 4;
                }
            }
        }

        self.pad(vtable_len);
        let vtable = self.buf.len();
        self.put_u16(vtable_len as u16);
        self.put_u16(table_len as u16);
        for offset in offsets {
            self.put_u16(offset);
        }
        vtable
    }

    /// Patch the soffset of `table` to refer to `vtable` (either side)
    fn set_vtable(&mut self, table: usize, vtable: usize) {
        let soffset = table as i32 - vtable as i32;
        self.buf[table..table + 4].copy_from_slice(&soffset.to_le_bytes());
    }

    /// Table fields without a vtable; the soffset is left for `set_vtable`
    fn table_body(&mut self, fields: &[Field]) -> (usize, Vec<usize>) {
        self.pad(0);
        let table = self.buf.len();
        self.put_u32(0);
        let mut slots = Vec::new();
        for field in fields {
            match *field {
                Field::Absent => {}
                Field::U8(value) => self.buf.extend_from_slice(&[value, 0, 0, 0]),
                Field::U32(value) => self.put_u32(value),
                Field::I32(value) => self.buf.extend_from_slice(&value.to_le_bytes()),
                Field::Offset => {
                    slots.push(self.buf.len());
                    self.put_u32(0);
                }
            }
        }
        (table, slots)
    }

    /// Vector of `len` table references; returns its position and the slots
    fn table_vector(&mut self, len: usize) -> (usize, Vec<usize>) {
        self.pad(0);
        let vector = self.buf.len();
        self.put_u32(len as u32);
        let slots = (0..len)
            .map(|_| {
                let slot = self.buf.len();
                self.put_u32(0);
                slot
            })
            .collect();
        (vector, slots)
    }

    fn i32_vector(&mut self, values: &[i32]) -> usize {
        self.pad(0);
        let vector = self.buf.len();
        self.put_u32(values.len() as u32);
        for value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
        vector
    }

    fn byte_vector(&mut self, bytes: &[u8], nul_terminated: bool) -> usize {
        self.pad(0);
        let vector = self.buf.len();
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        if nul_terminated {
            self.buf.push(0);
        }
        vector
    }

    /// Point the uoffset at `slot` to `target`
    fn link(&mut self, slot: usize, target: usize) {
        let relative = (target - slot) as u32;
        self.buf[slot..slot + 4].copy_from_slice(&relative.to_le_bytes());
    }
}
