use crate::native::{NativeFn, NativeObj};
use memory::Value;
use tracing::trace;

/// Trait for native function registration
pub trait NativeRegistry {
    /// Register a native and return the cfunction value that calls it.
    /// `arity` is -1 for variadic natives.
    fn define_native(&mut self, name: &str, func: NativeFn, arity: isize) -> Value;

    fn native_name(&self, idx: u32) -> Option<&str>;
}

impl NativeRegistry for super::vm::VM {
    fn define_native(&mut self, name: &str, func: NativeFn, arity: isize) -> Value {
        self.natives.push(NativeObj {
            name: name.to_string(),
            func,
            arity,
        });
        let native_idx = (self.natives.len() - 1) as u32;
        trace!(name, native_idx, arity, "native registered");
        Value::CFunction(native_idx)
    }

    fn native_name(&self, idx: u32) -> Option<&str> {
        self.natives.get(idx as usize).map(|n| n.name.as_str())
    }
}
