//! Native libraries.
//!
//! `core` is the primitive library every environment starts with. The
//! others are auxiliary libraries loaded through the [`Library`] trait
//! during bootstrap.

pub mod core;
pub mod fiber;
pub mod math;

use crate::env::Environment;
use crate::error::RuntimeError;
use crate::machine::{NativeRegistry, VM};
use crate::specs::{NativeMeta, CORE_NATIVES};
use tracing::debug;

/// A module that populates an environment with its bindings.
pub trait Library {
    fn name(&self) -> &'static str;
    fn load(&self, vm: &mut VM, env: &Environment) -> Result<(), RuntimeError>;
}

/// Register every native in `natives` under its name, with its doc.
pub fn define_natives(vm: &mut VM, env: &Environment, natives: &[NativeMeta]) {
    for meta in natives {
        let f = vm.define_native(meta.name, meta.func, meta.arity);
        env.def(vm, meta.name, f, Some(meta.doc));
    }
}

/// The primitive library.
pub fn load_core(vm: &mut VM, env: &Environment) {
    define_natives(vm, env, CORE_NATIVES);
    debug!(count = CORE_NATIVES.len(), "core natives registered");
}

/// Auxiliary libraries shipped with the VM, in load order.
pub fn default_libraries() -> Vec<Box<dyn Library>> {
    vec![Box::new(math::MathLib), Box::new(fiber::FiberLib)]
}
