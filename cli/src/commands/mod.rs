pub mod disassemble;
pub mod env;
pub mod native;
