use crate::error::RuntimeError;
use crate::opcode::instruction::{decode_a, decode_b, decode_c};
use crate::opcode::OpCode;
use memory::Value;

use super::stack::StackOps;

pub trait DataOps {
    fn handle_data(&mut self, op: OpCode, instruction: u32, base: usize)
        -> Result<(), RuntimeError>;

    /// `ds[key]`; missing keys and out-of-range indices give nil.
    fn get(&self, ds: Value, key: Value) -> Result<Value, RuntimeError>;

    /// `ds[key] = value` for arrays, buffers and tables.
    fn put(&mut self, ds: Value, key: Value, value: Value) -> Result<(), RuntimeError>;

    fn length(&self, ds: Value) -> Result<i32, RuntimeError>;
}

impl DataOps for super::vm::VM {
    fn handle_data(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;

        match op {
            OpCode::Get => {
                // R[A] = R[B][R[C]]
                let c = decode_c(instruction) as usize;
                let ds = self.get_reg(base, b)?;
                let key = self.get_reg(base, c)?;
                let v = self.get(ds, key)?;
                self.set_reg(base, a, v)?;
            }

            OpCode::GetIndex => {
                // R[A] = R[B][C], C read as an unsigned byte
                let index = decode_c(instruction) as i32;
                let ds = self.get_reg(base, b)?;
                let v = self.get(ds, Value::int(index))?;
                self.set_reg(base, a, v)?;
            }

            OpCode::Put => {
                // R[A][R[B]] = R[C]
                let c = decode_c(instruction) as usize;
                let ds = self.get_reg(base, a)?;
                let key = self.get_reg(base, b)?;
                let value = self.get_reg(base, c)?;
                self.put(ds, key, value)?;
            }

            OpCode::Length => {
                let ds = self.get_reg(base, b)?;
                let len = self.length(ds)?;
                self.set_reg(base, a, Value::int(len))?;
            }

            other => {
                return Err(RuntimeError::InvalidOperand(format!(
                    "{} is not a data instruction",
                    other
                )))
            }
        }

        Ok(())
    }

    fn get(&self, ds: Value, key: Value) -> Result<Value, RuntimeError> {
        match ds {
            Value::Array(_) | Value::Tuple(_) => {
                let index = expect_index(ds, key)?;
                let items = self.heap.sequence(ds).unwrap_or_default();
                Ok(index
                    .and_then(|i| items.get(i).copied())
                    .unwrap_or_default())
            }
            Value::String(_) | Value::Symbol(_) | Value::Buffer(_) => {
                let index = expect_index(ds, key)?;
                let bytes = self.heap.bytes(ds).unwrap_or_default();
                Ok(index
                    .and_then(|i| bytes.get(i))
                    .map_or(Value::Nil, |&b| Value::int(b as i32)))
            }
            Value::Table(h) => Ok(self.heap.table_get(h, key).unwrap_or_default()),
            Value::Struct(h) => Ok(self.heap.struct_get(h, key).unwrap_or_default()),
            other => Err(RuntimeError::TypeMismatch(format!(
                "cannot get from {}",
                other.type_of()
            ))),
        }
    }

    fn put(&mut self, ds: Value, key: Value, value: Value) -> Result<(), RuntimeError> {
        match ds {
            Value::Array(h) => {
                let index = expect_index(ds, key)?.ok_or_else(|| {
                    RuntimeError::OutOfBounds(format!("negative array index {}", key_int(key)))
                })?;
                let max_len = self.config.max_sequence_len;
                let arr = self
                    .heap
                    .get_array_mut(h)
                    .ok_or_else(|| RuntimeError::Unknown("dangling array handle".into()))?;
                if index >= arr.len() {
                    check_growth(ds, index, max_len)?;
                    arr.resize(index + 1, Value::Nil);
                }
                arr[index] = value;
                Ok(())
            }
            Value::Buffer(h) => {
                let index = expect_index(ds, key)?.ok_or_else(|| {
                    RuntimeError::OutOfBounds(format!("negative buffer index {}", key_int(key)))
                })?;
                let byte = match value {
                    Value::Integer(i) => i as u8,
                    other => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "buffer values must be integers, got {}",
                            other.type_of()
                        )))
                    }
                };
                let max_len = self.config.max_sequence_len;
                let buf = self
                    .heap
                    .get_buffer_mut(h)
                    .ok_or_else(|| RuntimeError::Unknown("dangling buffer handle".into()))?;
                if index >= buf.len() {
                    check_growth(ds, index, max_len)?;
                    buf.resize(index + 1, 0);
                }
                buf[index] = byte;
                Ok(())
            }
            Value::Table(h) => {
                self.heap.table_put(h, key, value);
                Ok(())
            }
            other => Err(RuntimeError::TypeMismatch(format!(
                "cannot put into {}",
                other.type_of()
            ))),
        }
    }

    fn length(&self, ds: Value) -> Result<i32, RuntimeError> {
        let len = match ds {
            Value::String(_) | Value::Symbol(_) | Value::Buffer(_) => {
                self.heap.bytes(ds).map_or(0, <[u8]>::len)
            }
            Value::Array(_) | Value::Tuple(_) => self.heap.sequence(ds).map_or(0, <[Value]>::len),
            Value::Table(h) => self.heap.get_table(h).map_or(0, |d| d.len()),
            Value::Struct(h) => self.heap.get_struct(h).map_or(0, |s| s.dict.len()),
            other => {
                return Err(RuntimeError::TypeMismatch(format!(
                    "cannot take length of {}",
                    other.type_of()
                )))
            }
        };
        Ok(len as i32)
    }
}

/// Integer key as an index; `None` for negative keys.
fn expect_index(ds: Value, key: Value) -> Result<Option<usize>, RuntimeError> {
    match key {
        Value::Integer(i) => Ok(usize::try_from(i).ok()),
        other => Err(RuntimeError::TypeMismatch(format!(
            "expected integer key for {}, got {}",
            ds.type_of(),
            other.type_of()
        ))),
    }
}

fn key_int(key: Value) -> i32 {
    key.as_int().unwrap_or_default()
}

fn check_growth(ds: Value, index: usize, max_len: usize) -> Result<(), RuntimeError> {
    if index >= max_len {
        return Err(RuntimeError::OutOfRange(format!(
            "index {} would grow {} past {} elements",
            index,
            ds.type_of(),
            max_len
        )));
    }
    Ok(())
}
