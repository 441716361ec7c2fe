//! Hand-assembled function families.
//!
//! Each family is one instruction template parameterized by an opcode and
//! a few constants. The operator tables below are the data; the template
//! functions return the instruction words and [`load_templates`] binds
//! every member into an environment.
//!
//! Register conventions: variadic functions receive their rest arguments
//! as a tuple in the register after the fixed parameters.

use crate::assembler::quick_asm;
use crate::env::Environment;
use crate::machine::{VM, SIGNAL_DEBUG, SIGNAL_YIELD};
use crate::opcode::{instruction::*, OpCode};
use memory::FuncFlags;
use tracing::debug;

/// Built-in tag stored in the low bits of an assembled function's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Builtin {
    Debug = 1,
    Error,
    Yield,
    Resume,
    Get,
    Put,
    Length,
    Bnot,
    Apply,
    Reducer,
    Comparator,
}

impl Builtin {
    pub fn flags(self, vararg: bool) -> FuncFlags {
        FuncFlags::new(self as u16, vararg)
    }
}

pub struct ReducerSpec {
    pub name: &'static str,
    pub op: OpCode,
    pub nullary: i16,
    pub unary: i16,
}

pub struct ComparatorSpec {
    pub name: &'static str,
    pub op: OpCode,
    pub invert: bool,
}

pub const REDUCERS: &[ReducerSpec] = &[
    ReducerSpec { name: "+", op: OpCode::Add, nullary: 0, unary: 0 },
    ReducerSpec { name: "-", op: OpCode::Subtract, nullary: 0, unary: 0 },
    ReducerSpec { name: "*", op: OpCode::Multiply, nullary: 1, unary: 1 },
    ReducerSpec { name: "/", op: OpCode::Divide, nullary: 1, unary: 1 },
    ReducerSpec { name: "&", op: OpCode::Band, nullary: -1, unary: -1 },
    ReducerSpec { name: "|", op: OpCode::Bor, nullary: 0, unary: 0 },
    ReducerSpec { name: "^", op: OpCode::Bxor, nullary: 0, unary: 0 },
    ReducerSpec { name: "<<", op: OpCode::ShiftLeft, nullary: 1, unary: 1 },
    ReducerSpec { name: ">>", op: OpCode::ShiftRight, nullary: 1, unary: 1 },
    ReducerSpec { name: ">>>", op: OpCode::ShiftRightUnsigned, nullary: 1, unary: 1 },
];

pub const COMPARATORS: &[ComparatorSpec] = &[
    ComparatorSpec { name: "order>", op: OpCode::GreaterThan, invert: false },
    ComparatorSpec { name: "order<", op: OpCode::LessThan, invert: false },
    ComparatorSpec { name: "order>=", op: OpCode::LessThan, invert: true },
    ComparatorSpec { name: "order<=", op: OpCode::GreaterThan, invert: true },
    ComparatorSpec { name: "=", op: OpCode::Equals, invert: false },
    ComparatorSpec { name: "not=", op: OpCode::Equals, invert: true },
    ComparatorSpec { name: ">", op: OpCode::NumericGreaterThan, invert: false },
    ComparatorSpec { name: "<", op: OpCode::NumericLessThan, invert: false },
    ComparatorSpec { name: ">=", op: OpCode::NumericGreaterThanEqual, invert: false },
    ComparatorSpec { name: "<=", op: OpCode::NumericLessThanEqual, invert: false },
    ComparatorSpec { name: "==", op: OpCode::NumericEqual, invert: false },
    ComparatorSpec { name: "not==", op: OpCode::NumericEqual, invert: true },
];

/// Registers used by the variadic templates.
pub const TEMPLATE_SLOTS: u32 = 6;

/// Variadic left fold of `op`. R0 holds the argument tuple.
///
/// - no arguments: `nullary`
/// - one argument `x`: `op(unary, x)`
/// - otherwise: `op(...op(op(a, b), c)..., z)`
pub fn reducer(op: OpCode, nullary: i16, unary: i16) -> Vec<u32> {
    vec![
        // R1 = #args
        encode_ab(OpCode::Length, 1, 0),
        encode_abi(OpCode::EqualsImmediate, 2, 1, 0),
        encode_ai(OpCode::JumpIfNot, 2, 3),
        encode_ai(OpCode::LoadInteger, 3, nullary),
        encode_a(OpCode::Return, 3),
        // one argument
        encode_abi(OpCode::EqualsImmediate, 2, 1, 1),
        encode_ai(OpCode::JumpIfNot, 2, 5),
        encode_ai(OpCode::LoadInteger, 3, unary),
        encode_abc(OpCode::GetIndex, 4, 0, 0),
        encode_abc(op, 3, 3, 4),
        encode_a(OpCode::Return, 3),
        // R3 = accumulator, R5 = index
        encode_abc(OpCode::GetIndex, 3, 0, 0),
        encode_ai(OpCode::LoadInteger, 5, 1),
        encode_abc(OpCode::Get, 4, 0, 5),
        encode_abc(op, 3, 3, 4),
        encode_abi(OpCode::AddImmediate, 5, 5, 1),
        encode_abc(OpCode::EqualsInteger, 2, 5, 1),
        encode_ai(OpCode::JumpIfNot, 2, -4),
        encode_a(OpCode::Return, 3),
    ]
}

/// Variadic pairwise chain of the boolean `op`. Fewer than two arguments
/// yield true. The first failing pair yields false (true when inverted);
/// a chain where every pair passes yields true (false when inverted).
pub fn comparator(op: OpCode, invert: bool) -> Vec<u32> {
    let (pass, fail) = if invert {
        (OpCode::LoadFalse, OpCode::LoadTrue)
    } else {
        (OpCode::LoadTrue, OpCode::LoadFalse)
    };
    vec![
        encode_ab(OpCode::Length, 1, 0),
        encode_abi(OpCode::LessThanImmediate, 2, 1, 2),
        encode_ai(OpCode::JumpIf, 2, 14),
        // R3 = previous, R4 = current, R5 = index
        encode_abc(OpCode::GetIndex, 3, 0, 0),
        encode_ai(OpCode::LoadInteger, 5, 1),
        encode_abc(OpCode::Get, 4, 0, 5),
        encode_abc(op, 2, 3, 4),
        encode_ai(OpCode::JumpIfNot, 2, 7),
        encode_abi(OpCode::AddImmediate, 5, 5, 1),
        encode_ab(OpCode::MoveNear, 3, 4),
        encode_abc(OpCode::EqualsInteger, 2, 5, 1),
        encode_ai(OpCode::JumpIfNot, 2, -6),
        // every pair passed
        encode_a(pass, 2),
        encode_a(OpCode::Return, 2),
        // a pair failed
        encode_a(fail, 2),
        encode_a(OpCode::Return, 2),
        // short chain
        encode_a(OpCode::LoadTrue, 2),
        encode_a(OpCode::Return, 2),
    ]
}

/// `(apply f a... seq)`: push each leading argument, spread `seq`, then
/// tail call `f`. R0 is `f`, R1 the tuple of remaining arguments.
pub fn apply() -> Vec<u32> {
    vec![
        encode_ab(OpCode::Length, 2, 1),
        encode_abi(OpCode::EqualsImmediate, 3, 2, 0),
        encode_ai(OpCode::JumpIf, 3, 9),
        encode_ai(OpCode::LoadInteger, 4, 0),
        // loop: R5 = args[R4]
        encode_abc(OpCode::Get, 5, 1, 4),
        encode_abi(OpCode::AddImmediate, 4, 4, 1),
        encode_abc(OpCode::EqualsInteger, 3, 4, 2),
        encode_ai(OpCode::JumpIf, 3, 3),
        encode_a(OpCode::Push, 5),
        encode_jump(OpCode::Jump, -5),
        // last argument is spread
        encode_a(OpCode::PushArray, 5),
        encode_a(OpCode::TailCall, 0),
    ]
}

/// A fixed-shape function: name, tag, arity, slot count and code.
struct Fixed {
    name: &'static str,
    tag: Builtin,
    arity: u32,
    slots: u32,
    code: Vec<u32>,
}

fn fixed_functions() -> Vec<Fixed> {
    vec![
        Fixed {
            name: "debug",
            tag: Builtin::Debug,
            arity: 0,
            slots: 1,
            code: vec![
                encode_abc(OpCode::Signal, 0, 0, SIGNAL_DEBUG),
                encode_op(OpCode::ReturnNil),
            ],
        },
        Fixed {
            name: "error",
            tag: Builtin::Error,
            arity: 1,
            slots: 1,
            code: vec![encode_a(OpCode::Error, 0)],
        },
        Fixed {
            name: "yield",
            tag: Builtin::Yield,
            arity: 1,
            slots: 2,
            code: vec![
                encode_abc(OpCode::Signal, 0, 0, SIGNAL_YIELD),
                encode_a(OpCode::Return, 0),
            ],
        },
        Fixed {
            name: "resume",
            tag: Builtin::Resume,
            arity: 2,
            slots: 2,
            code: vec![
                encode_abc(OpCode::Resume, 0, 0, 1),
                encode_a(OpCode::Return, 0),
            ],
        },
        Fixed {
            name: "get",
            tag: Builtin::Get,
            arity: 2,
            slots: 2,
            code: vec![encode_abc(OpCode::Get, 0, 0, 1), encode_a(OpCode::Return, 0)],
        },
        Fixed {
            name: "put",
            tag: Builtin::Put,
            arity: 3,
            slots: 3,
            code: vec![encode_abc(OpCode::Put, 0, 1, 2), encode_a(OpCode::Return, 0)],
        },
        Fixed {
            name: "length",
            tag: Builtin::Length,
            arity: 1,
            slots: 1,
            code: vec![encode_ab(OpCode::Length, 0, 0), encode_a(OpCode::Return, 0)],
        },
        Fixed {
            name: "~",
            tag: Builtin::Bnot,
            arity: 1,
            slots: 1,
            code: vec![encode_ab(OpCode::Bnot, 0, 0), encode_a(OpCode::Return, 0)],
        },
    ]
}

/// Assemble and bind every templated function into `env`.
pub fn load_templates(vm: &mut VM, env: &Environment) {
    let fixed = fixed_functions();
    for f in &fixed {
        quick_asm(vm, env, f.tag.flags(false), f.name, f.arity, f.slots, &f.code);
    }
    quick_asm(
        vm,
        env,
        Builtin::Apply.flags(true),
        "apply",
        1,
        TEMPLATE_SLOTS,
        &apply(),
    );

    for r in REDUCERS {
        let code = reducer(r.op, r.nullary, r.unary);
        quick_asm(vm, env, Builtin::Reducer.flags(true), r.name, 0, TEMPLATE_SLOTS, &code);
    }
    for c in COMPARATORS {
        let code = comparator(c.op, c.invert);
        quick_asm(vm, env, Builtin::Comparator.flags(true), c.name, 0, TEMPLATE_SLOTS, &code);
    }

    debug!(
        fixed = fixed.len() + 1,
        reducers = REDUCERS.len(),
        comparators = COMPARATORS.len(),
        "templates assembled"
    );
}
