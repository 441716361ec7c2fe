use std::io::Write;
use tempfile::NamedTempFile;

use cli::commands::{disassemble, env, native};
use cli::{boot, load_config};
use vm::VmConfig;

fn write_temp_config(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::with_suffix(".toml").unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn output(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    f(&mut buf)?;
    Ok(String::from_utf8(buf).unwrap())
}

// ======================================================================
// load_config
// ======================================================================

#[test]
fn config_defaults_without_file() {
    assert_eq!(load_config(None).unwrap(), VmConfig::default());
}

#[test]
fn config_from_file() {
    let f = write_temp_config("stress_gc = true\nmax_call_depth = 32\n");
    let cfg = load_config(Some(f.path())).unwrap();
    assert!(cfg.stress_gc);
    assert_eq!(cfg.max_call_depth, 32);
    assert_eq!(cfg.max_fiber_depth, VmConfig::default().max_fiber_depth);
}

#[test]
fn config_unknown_key_is_error() {
    let f = write_temp_config("no_such_key = 1\n");
    let err = load_config(Some(f.path())).unwrap_err();
    assert!(format!("{err}").contains("Invalid config"), "got: {err}");
}

#[test]
fn config_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(format!("{err}").contains("Failed to read config"), "got: {err}");
}

// ======================================================================
// names / doc
// ======================================================================

#[test]
fn names_lists_primitives_with_kinds() {
    let (vm, root) = boot(VmConfig::default()).unwrap();
    let text = output(|out| env::list_names(&vm, &root, out)).unwrap();
    let line = |name: &str| {
        text.lines()
            .find(|l| l.split_whitespace().next() == Some(name))
            .unwrap_or_else(|| panic!("{} missing from:\n{}", name, text))
            .to_string()
    };
    assert!(line("print").ends_with("cfunction"));
    assert!(line("+").ends_with("function"));
    assert!(line("math/pi").ends_with("real"));
}

#[test]
fn doc_prints_documentation() {
    let (vm, root) = boot(VmConfig::default()).unwrap();
    let text = output(|out| env::show_doc(&vm, &root, "gensym", out)).unwrap();
    assert!(text.starts_with("(gensym)"), "got: {text}");
}

#[test]
fn doc_of_undocumented_binding() {
    let (vm, root) = boot(VmConfig::default()).unwrap();
    let text = output(|out| env::show_doc(&vm, &root, "apply", out)).unwrap();
    assert!(text.starts_with("<function apply>"), "got: {text}");
    assert!(text.contains("No documentation."));
}

#[test]
fn doc_of_unbound_name_is_error() {
    let (vm, root) = boot(VmConfig::default()).unwrap();
    let err = output(|out| env::show_doc(&vm, &root, "nope", out)).unwrap_err();
    assert!(format!("{err}").contains("not bound"));
}

// ======================================================================
// disasm
// ======================================================================

#[test]
fn disasm_reducer() {
    let (vm, root) = boot(VmConfig::default()).unwrap();
    let text = output(|out| disassemble::disassemble_binding(&vm, &root, "+", out)).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("== Disassembly of + (arity 0+, 6 slots) =="));
    assert_eq!(lines.count(), 19);
    assert!(text.contains("LENGTH"), "got:\n{text}");
}

#[test]
fn disasm_rejects_cfunction() {
    let (vm, root) = boot(VmConfig::default()).unwrap();
    let err = output(|out| disassemble::disassemble_binding(&vm, &root, "print", out)).unwrap_err();
    assert!(format!("{err}").contains("not an assembled function"));
}

// ======================================================================
// native
// ======================================================================

#[test]
fn native_missing_module_is_error() {
    let (mut vm, root) = boot(VmConfig::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.so");
    let err = output(|out| native::load_module(&mut vm, &root, path.to_str().unwrap(), out))
        .unwrap_err();
    assert!(format!("{err}").contains("Failed to load"), "got: {err}");
}
