use crate::error::RuntimeError;
use crate::machine::VM;
use memory::Value;

// The unified signature for every native function, built in or loaded from
// a native module.
// args: the call's arguments in order.
// Return: Result<Value, RuntimeError> (RuntimeError for type mismatches, etc.)
pub type NativeFn = fn(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError>;

/// Symbol every native module must export. It is called with the target
/// environment table as its only argument.
pub const NATIVE_ENTRY: &str = "_tern_init";

#[derive(Clone)]
pub struct NativeObj {
    pub name: String,
    pub func: NativeFn,
    pub arity: isize, // -1 for variadic
}
