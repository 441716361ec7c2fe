//! Quick-assembler: turns pre-encoded instruction words into a callable
//! function value bound in an environment, bypassing the compiler.

use crate::env::Environment;
use crate::error::RuntimeError;
use crate::machine::VM;
use crate::opcode::{instruction::*, OpCode, OperandFormat};
use memory::{FuncDef, FuncFlags, Value};
use tracing::{trace, warn};

/// Build a function from `bytecode`, copied verbatim, and bind it under
/// `name` with no documentation. Returns the function value.
pub fn quick_asm(
    vm: &mut VM,
    env: &Environment,
    flags: FuncFlags,
    name: &str,
    arity: u32,
    slots: u32,
    bytecode: &[u32],
) -> Value {
    if cfg!(debug_assertions) {
        if let Err(e) = validate(bytecode, slots) {
            warn!(name, error = %e, "assembled function failed validation");
        }
    }

    let def = FuncDef {
        name: name.to_string(),
        arity,
        flags,
        slot_count: slots,
        bytecode: bytecode.to_vec(),
        constants: Vec::new(),
    };
    let func = Value::Function(vm.heap.alloc_function(def));
    env.def(vm, name, func, None);
    trace!(name, arity, slots, words = bytecode.len(), "assembled");
    func
}

/// Check that every opcode is known, every register operand is below
/// `slots`, and every jump lands inside the sequence.
pub fn validate(bytecode: &[u32], slots: u32) -> Result<(), RuntimeError> {
    let len = bytecode.len() as i64;
    for (idx, &word) in bytecode.iter().enumerate() {
        let byte = decode_opcode(word);
        let op = OpCode::from_u8(byte).ok_or(RuntimeError::InvalidOpcode(byte))?;

        let registers = match op.format() {
            OperandFormat::None | OperandFormat::J => vec![],
            OperandFormat::A | OperandFormat::AI => vec![decode_a(word)],
            OperandFormat::AB | OperandFormat::ABI => vec![decode_a(word), decode_b(word)],
            OperandFormat::ABC => vec![decode_a(word), decode_b(word), decode_c(word)],
        };
        if let Some(&reg) = registers.iter().find(|&&r| r as u32 >= slots) {
            return Err(RuntimeError::InvalidOperand(format!(
                "{} at {} uses register {} of {}",
                op, idx, reg, slots
            )));
        }

        if op.is_jump() {
            let offset = match op.format() {
                OperandFormat::J => decode_imm24(word),
                _ => decode_imm16(word) as i32,
            };
            let target = idx as i64 + offset as i64;
            if !(0..len).contains(&target) {
                return Err(RuntimeError::OutOfBounds(format!(
                    "{} at {} jumps to {} outside 0..{}",
                    op, idx, target, len
                )));
            }
        }
    }
    Ok(())
}

/// One-line rendering of an instruction word.
pub fn disassemble(word: u32) -> String {
    let byte = decode_opcode(word);
    let Some(op) = OpCode::from_u8(byte) else {
        return format!("<invalid opcode {}>", byte);
    };
    let (a, b, c) = (decode_a(word), decode_b(word), decode_c(word));
    match op.format() {
        OperandFormat::None => op.name().to_string(),
        OperandFormat::A => format!("{:<28} R{}", op.name(), a),
        OperandFormat::AB => format!("{:<28} R{}, R{}", op.name(), a, b),
        OperandFormat::ABC => format!("{:<28} R{}, R{}, R{}", op.name(), a, b, c),
        OperandFormat::AI => format!("{:<28} R{}, {}", op.name(), a, decode_imm16(word)),
        OperandFormat::ABI if op == OpCode::GetIndex => {
            format!("{:<28} R{}, R{}, {}", op.name(), a, b, c)
        }
        OperandFormat::ABI => {
            format!("{:<28} R{}, R{}, {}", op.name(), a, b, decode_imm8(word))
        }
        OperandFormat::J => format!("{:<28} {:+}", op.name(), decode_imm24(word)),
    }
}
