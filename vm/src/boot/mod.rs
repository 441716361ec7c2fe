//! Root environment construction.

use crate::env::Environment;
use crate::error::{BootstrapError, RuntimeError};
use crate::machine::VM;
use crate::stdlib::{load_core, Library};
use crate::templates::load_templates;
use memory::Value;
use tracing::{debug, info};

/// Bootstrap program run against every freshly built root environment.
pub const BOOT_SOURCE: &[u8] = include_bytes!("core.tern");
pub const BOOT_NAME: &str = "core.tern";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Executes source text against an environment. The compiler lives outside
/// this crate and plugs in here.
pub trait SourceRunner {
    fn run(
        &mut self,
        vm: &mut VM,
        env: &Environment,
        source: &[u8],
        name: &str,
    ) -> Result<(), RuntimeError>;
}

/// Build the root environment.
///
/// Registers the primitive library and the assembled functions, roots the
/// environment, loads `libs` in order, binds `_env`, then runs the boot
/// program through `runner`. A failing library or boot program is fatal:
/// the environment is unrooted and no environment is returned.
pub fn core_env(
    vm: &mut VM,
    libs: &[Box<dyn Library>],
    runner: &mut dyn SourceRunner,
) -> Result<Environment, BootstrapError> {
    let env = Environment::new(vm);

    load_core(vm, &env);
    load_templates(vm, &env);
    let version = vm.string_value(VERSION);
    env.def(vm, "tern.version", version, Some("The version number of the running tern."));

    vm.roots.push(env.value());

    match populate(vm, &env, libs, runner) {
        Ok(()) => {
            info!(bindings = env.len(vm), version = VERSION, "root environment ready");
            Ok(env)
        }
        Err(e) => {
            unroot(vm, env.value());
            Err(e)
        }
    }
}

fn populate(
    vm: &mut VM,
    env: &Environment,
    libs: &[Box<dyn Library>],
    runner: &mut dyn SourceRunner,
) -> Result<(), BootstrapError> {
    for lib in libs {
        let name = lib.name();
        lib.load(vm, env)
            .map_err(|source| BootstrapError::Library { name, source })?;
        debug!(library = name, "library loaded");
    }

    env.def(
        vm,
        "_env",
        env.value(),
        Some("The environment table for the current scope."),
    );

    runner
        .run(vm, env, BOOT_SOURCE, BOOT_NAME)
        .map_err(|source| BootstrapError::Bootstrap {
            name: BOOT_NAME.to_string(),
            source,
        })?;
    debug!(program = BOOT_NAME, "bootstrap program finished");
    Ok(())
}

fn unroot(vm: &mut VM, value: Value) {
    if let Some(pos) = vm.roots.iter().rposition(|&r| r == value) {
        vm.roots.remove(pos);
    }
}
