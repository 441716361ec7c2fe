use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::Write;
use tracing::info;
use vm::{Environment, VM};

/// Load the module at `path`, run its entry point against `env`, and report
/// the bindings it added.
pub fn load_module(vm: &mut VM, env: &Environment, path: &str, out: &mut dyn Write) -> Result<()> {
    let before: BTreeSet<String> = env.names(vm).into_iter().collect();

    let native = env
        .get(vm, "native")
        .context("`native` is not bound")?;
    let arg = vm.string_value(path);
    let init = vm
        .call(native, &[arg])
        .with_context(|| format!("Failed to load {}", path))?;
    vm.call(init, &[env.value()])
        .with_context(|| format!("Entry point of {} failed", path))?;

    let added: Vec<String> = env
        .names(vm)
        .into_iter()
        .filter(|n| !before.contains(n))
        .collect();
    info!(path, added = added.len(), "native module initialised");

    writeln!(out, "loaded {} ({} new bindings)", path, added.len())?;
    for name in added {
        writeln!(out, "  {}", name)?;
    }
    Ok(())
}
