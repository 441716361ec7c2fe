use anyhow::{anyhow, bail, Result};
use memory::Value;
use std::io::Write;
use vm::assembler::disassemble;
use vm::{Environment, VM};

pub fn disassemble_binding(vm: &VM, env: &Environment, name: &str, out: &mut dyn Write) -> Result<()> {
    let value = env
        .get(vm, name)
        .ok_or_else(|| anyhow!("`{}` is not bound", name))?;
    let handle = match value {
        Value::Function(h) => h,
        other => bail!("`{}` is a {}, not an assembled function", name, other.type_of()),
    };
    let func = vm
        .heap
        .get_function(handle)
        .ok_or_else(|| anyhow!("dangling function handle {}", handle))?;
    let def = &func.def;

    writeln!(
        out,
        "== Disassembly of {} (arity {}{}, {} slots) ==",
        def.name,
        def.arity,
        if def.flags.is_vararg() { "+" } else { "" },
        def.slot_count
    )?;
    for (i, word) in def.bytecode.iter().enumerate() {
        writeln!(out, "{:04} {:08X}  {}", i, word, disassemble(*word))?;
    }
    Ok(())
}
