use anyhow::{anyhow, Result};
use std::io::Write;
use vm::{Environment, VM};

/// One line per binding: name and kind.
pub fn list_names(vm: &VM, env: &Environment, out: &mut dyn Write) -> Result<()> {
    for name in env.names(vm) {
        let kind = env
            .get(vm, &name)
            .map_or("?", |v| v.type_of().short_name());
        writeln!(out, "{:<20} {}", name, kind)?;
    }
    Ok(())
}

pub fn show_doc(vm: &VM, env: &Environment, name: &str, out: &mut dyn Write) -> Result<()> {
    let binding = env
        .lookup(vm, name)
        .ok_or_else(|| anyhow!("`{}` is not bound", name))?;
    match binding.doc {
        Some(doc) => writeln!(out, "{}", doc)?,
        None => writeln!(out, "{}\n\nNo documentation.", vm.val_to_string(binding.value))?,
    }
    Ok(())
}
