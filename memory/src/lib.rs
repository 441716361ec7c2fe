pub mod dict;
pub mod fiber;
pub mod heap;
pub mod value;

#[cfg(test)]
mod value_tests;

pub use dict::Dict;
pub use fiber::{Fiber, FiberStatus, Frame};
pub use heap::{AbstractObj, AbstractType, FuncDef, FuncFlags, Function, Heap, Struct, Tuple};
pub use value::{Value, ValueType};
