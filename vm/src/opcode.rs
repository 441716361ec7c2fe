//! OpCode definitions for the Tern VM
//!
//! Instructions are 32-bit words with the opcode in the low byte:
//!
//! Format A:    [C:8][B:8][A:8][op:8]   registers A, B, C
//! Format AI:   [imm16 ][A:8][op:8]     register A + signed 16-bit immediate
//! Format ABI:  [imm8][B:8][A:8][op:8]  registers A, B + signed 8-bit immediate
//! Format J:    [   imm24   ][op:8]     signed 24-bit jump offset
//!
//! Jump offsets are relative to the index of the jump instruction itself.

use std::fmt;

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// No operation
    Noop = 0,
    /// Raise R[A] as an error
    Error = 1,
    /// Suspend the fiber with signal C and value R[B]; R[A] = resumed value
    Signal = 2,
    /// R[A] = resume(R[B], R[C])
    Resume = 3,
    /// R[A] = R[B][R[C]]
    Get = 4,
    /// R[A][R[B]] = R[C]
    Put = 5,
    /// R[A] = length(R[B])
    Length = 6,
    /// R[A] = ~R[B]
    Bnot = 7,

    // ===== Calls =====
    /// Return R[A]
    Return = 8,
    /// Return nil
    ReturnNil = 9,
    /// Push R[A] onto the pending argument list
    Push = 10,
    /// Append every item of array/tuple R[A] to the pending argument list
    PushArray = 11,
    /// R[A] = R[B](pending...)
    Call = 12,
    /// Replace the current frame with R[A](pending...)
    TailCall = 13,

    // ===== Loads & Moves =====
    /// R[A] = imm16
    LoadInteger = 14,
    LoadTrue = 15,
    LoadFalse = 16,
    LoadNil = 17,
    /// R[A] = R[B]
    MoveNear = 18,

    // ===== Flow Control =====
    /// IP += imm24
    Jump = 19,
    /// If R[A] truthy then IP += imm16
    JumpIf = 20,
    /// If R[A] falsey then IP += imm16
    JumpIfNot = 21,

    // ===== Immediates =====
    /// R[A] = R[B] == imm8
    EqualsImmediate = 22,
    /// R[A] = R[B] < imm8
    LessThanImmediate = 23,
    /// R[A] = int(R[B]) == int(R[C])
    EqualsInteger = 24,
    /// R[A] = R[B] + imm8
    AddImmediate = 25,
    /// R[A] = R[B][imm8]
    GetIndex = 26,

    // ===== Arithmetic =====
    Add = 30,
    Subtract = 31,
    Multiply = 32,
    Divide = 33,
    Band = 34,
    Bor = 35,
    Bxor = 36,
    ShiftLeft = 37,
    ShiftRight = 38,
    ShiftRightUnsigned = 39,

    // ===== Comparison =====
    /// R[A] = R[B] order> R[C] (total order)
    GreaterThan = 40,
    /// R[A] = R[B] order< R[C] (total order)
    LessThan = 41,
    /// R[A] = R[B] = R[C] (strict equality)
    Equals = 42,
    NumericGreaterThan = 43,
    NumericLessThan = 44,
    NumericGreaterThanEqual = 45,
    NumericLessThanEqual = 46,
    NumericEqual = 47,
}

/// Operand layout of an instruction, used by validation and disassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandFormat {
    None,
    A,
    AB,
    ABC,
    /// Register A plus signed 16-bit jump offset or immediate
    AI,
    /// Registers A, B plus signed 8-bit immediate
    ABI,
    /// Signed 24-bit jump offset
    J,
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        use OpCode::*;
        let op = match byte {
            0 => Noop,
            1 => Error,
            2 => Signal,
            3 => Resume,
            4 => Get,
            5 => Put,
            6 => Length,
            7 => Bnot,
            8 => Return,
            9 => ReturnNil,
            10 => Push,
            11 => PushArray,
            12 => Call,
            13 => TailCall,
            14 => LoadInteger,
            15 => LoadTrue,
            16 => LoadFalse,
            17 => LoadNil,
            18 => MoveNear,
            19 => Jump,
            20 => JumpIf,
            21 => JumpIfNot,
            22 => EqualsImmediate,
            23 => LessThanImmediate,
            24 => EqualsInteger,
            25 => AddImmediate,
            26 => GetIndex,
            30 => Add,
            31 => Subtract,
            32 => Multiply,
            33 => Divide,
            34 => Band,
            35 => Bor,
            36 => Bxor,
            37 => ShiftLeft,
            38 => ShiftRight,
            39 => ShiftRightUnsigned,
            40 => GreaterThan,
            41 => LessThan,
            42 => Equals,
            43 => NumericGreaterThan,
            44 => NumericLessThan,
            45 => NumericGreaterThanEqual,
            46 => NumericLessThanEqual,
            47 => NumericEqual,
            _ => return None,
        };
        Some(op)
    }

    /// Convert opcode to byte value
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Noop => "NOOP",
            OpCode::Error => "ERROR",
            OpCode::Signal => "SIGNAL",
            OpCode::Resume => "RESUME",
            OpCode::Get => "GET",
            OpCode::Put => "PUT",
            OpCode::Length => "LENGTH",
            OpCode::Bnot => "BNOT",
            OpCode::Return => "RETURN",
            OpCode::ReturnNil => "RETURN_NIL",
            OpCode::Push => "PUSH",
            OpCode::PushArray => "PUSH_ARRAY",
            OpCode::Call => "CALL",
            OpCode::TailCall => "TAILCALL",
            OpCode::LoadInteger => "LOAD_INTEGER",
            OpCode::LoadTrue => "LOAD_TRUE",
            OpCode::LoadFalse => "LOAD_FALSE",
            OpCode::LoadNil => "LOAD_NIL",
            OpCode::MoveNear => "MOVE_NEAR",
            OpCode::Jump => "JUMP",
            OpCode::JumpIf => "JUMP_IF",
            OpCode::JumpIfNot => "JUMP_IF_NOT",
            OpCode::EqualsImmediate => "EQUALS_IMMEDIATE",
            OpCode::LessThanImmediate => "LESS_THAN_IMMEDIATE",
            OpCode::EqualsInteger => "EQUALS_INTEGER",
            OpCode::AddImmediate => "ADD_IMMEDIATE",
            OpCode::GetIndex => "GET_INDEX",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Band => "BAND",
            OpCode::Bor => "BOR",
            OpCode::Bxor => "BXOR",
            OpCode::ShiftLeft => "SHIFT_LEFT",
            OpCode::ShiftRight => "SHIFT_RIGHT",
            OpCode::ShiftRightUnsigned => "SHIFT_RIGHT_UNSIGNED",
            OpCode::GreaterThan => "GREATER_THAN",
            OpCode::LessThan => "LESS_THAN",
            OpCode::Equals => "EQUALS",
            OpCode::NumericGreaterThan => "NUMERIC_GREATER_THAN",
            OpCode::NumericLessThan => "NUMERIC_LESS_THAN",
            OpCode::NumericGreaterThanEqual => "NUMERIC_GREATER_THAN_EQUAL",
            OpCode::NumericLessThanEqual => "NUMERIC_LESS_THAN_EQUAL",
            OpCode::NumericEqual => "NUMERIC_EQUAL",
        }
    }

    pub fn format(self) -> OperandFormat {
        use OpCode::*;
        match self {
            Noop | ReturnNil => OperandFormat::None,
            Error | Return | Push | PushArray | TailCall | LoadTrue | LoadFalse | LoadNil => {
                OperandFormat::A
            }
            Length | Bnot | Call | MoveNear => OperandFormat::AB,
            LoadInteger | JumpIf | JumpIfNot => OperandFormat::AI,
            Signal | EqualsImmediate | LessThanImmediate | AddImmediate | GetIndex => {
                OperandFormat::ABI
            }
            Jump => OperandFormat::J,
            Resume | Get | Put | EqualsInteger | Add | Subtract | Multiply | Divide | Band
            | Bor | Bxor | ShiftLeft | ShiftRight | ShiftRightUnsigned | GreaterThan
            | LessThan | Equals | NumericGreaterThan | NumericLessThan
            | NumericGreaterThanEqual | NumericLessThanEqual | NumericEqual => OperandFormat::ABC,
        }
    }

    /// True for instructions whose immediate is a relative jump offset.
    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpIf | OpCode::JumpIfNot)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Instruction encoding/decoding utilities
pub mod instruction {
    use super::OpCode;

    #[inline]
    pub fn encode_op(op: OpCode) -> u32 {
        op as u32
    }

    #[inline]
    pub fn encode_a(op: OpCode, a: u8) -> u32 {
        (op as u32) | ((a as u32) << 8)
    }

    #[inline]
    pub fn encode_ab(op: OpCode, a: u8, b: u8) -> u32 {
        encode_a(op, a) | ((b as u32) << 16)
    }

    #[inline]
    pub fn encode_abc(op: OpCode, a: u8, b: u8, c: u8) -> u32 {
        encode_ab(op, a, b) | ((c as u32) << 24)
    }

    /// Register A plus a signed 16-bit immediate in the high half.
    #[inline]
    pub fn encode_ai(op: OpCode, a: u8, imm: i16) -> u32 {
        encode_a(op, a) | ((imm as u16 as u32) << 16)
    }

    /// Registers A, B plus a signed 8-bit immediate in the top byte.
    #[inline]
    pub fn encode_abi(op: OpCode, a: u8, b: u8, imm: i8) -> u32 {
        encode_ab(op, a, b) | ((imm as u8 as u32) << 24)
    }

    /// Signed 24-bit offset in bits 8..32. Offsets outside the 24-bit
    /// range are truncated.
    #[inline]
    pub fn encode_jump(op: OpCode, offset: i32) -> u32 {
        (op as u32) | ((offset as u32) << 8)
    }

    #[inline]
    pub fn decode_opcode(instruction: u32) -> u8 {
        (instruction & 0xFF) as u8
    }

    #[inline]
    pub fn decode_a(instruction: u32) -> u8 {
        ((instruction >> 8) & 0xFF) as u8
    }

    #[inline]
    pub fn decode_b(instruction: u32) -> u8 {
        ((instruction >> 16) & 0xFF) as u8
    }

    #[inline]
    pub fn decode_c(instruction: u32) -> u8 {
        (instruction >> 24) as u8
    }

    /// Signed 16-bit immediate of an AI instruction
    #[inline]
    pub fn decode_imm16(instruction: u32) -> i16 {
        (instruction >> 16) as u16 as i16
    }

    /// Signed 8-bit immediate of an ABI instruction
    #[inline]
    pub fn decode_imm8(instruction: u32) -> i8 {
        (instruction >> 24) as u8 as i8
    }

    /// Signed 24-bit jump offset, sign-extended via arithmetic shift
    #[inline]
    pub fn decode_imm24(instruction: u32) -> i32 {
        (instruction as i32) >> 8
    }
}
