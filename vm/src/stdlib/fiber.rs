use super::{define_natives, Library};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::machine::{FiberOps, VM};
use crate::specs::NativeMeta;
use memory::Value;

fn native_fiber_new(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    vm.new_fiber(args[0])
}

fn native_fiber_status(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let status = match args[0] {
        Value::Fiber(h) => vm
            .heap
            .get_fiber(h)
            .map(|f| f.status)
            .ok_or_else(|| RuntimeError::Unknown(format!("dangling fiber handle {}", h)))?,
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "fiber/status expects a fiber, got {}",
                other.type_of()
            )))
        }
    };
    Ok(vm.symbol_value(status.name()))
}

const FIBER_NATIVES: &[NativeMeta] = &[
    NativeMeta {
        name: "fiber/new",
        func: native_fiber_new,
        arity: 1,
        doc: "(fiber/new func)\n\n\
              Create a fiber that runs func when first resumed. The value \
              passed to that resume becomes func's argument when func takes \
              one.",
    },
    NativeMeta {
        name: "fiber/status",
        func: native_fiber_status,
        arity: 1,
        doc: "(fiber/status fib)\n\n\
              Return the status of fib: :new :pending :alive :debug :dead \
              or :error.",
    },
];

pub struct FiberLib;

impl Library for FiberLib {
    fn name(&self) -> &'static str {
        "fiber"
    }

    fn load(&self, vm: &mut VM, env: &Environment) -> Result<(), RuntimeError> {
        define_natives(vm, env, FIBER_NATIVES);
        Ok(())
    }
}
