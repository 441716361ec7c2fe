use memory::Value;
use vm::stdlib::Library;
use vm::{
    core_env, default_libraries, BootstrapError, Environment, RuntimeError, SourceRunner, BOOT_NAME,
    BOOT_SOURCE, VERSION, VM,
};

struct NoopRunner;

impl SourceRunner for NoopRunner {
    fn run(&mut self, _: &mut VM, _: &Environment, _: &[u8], _: &str) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Remembers what it was asked to run and binds a marker.
#[derive(Default)]
struct RecordingRunner {
    seen: Vec<(Vec<u8>, String)>,
}

impl SourceRunner for RecordingRunner {
    fn run(
        &mut self,
        vm: &mut VM,
        env: &Environment,
        source: &[u8],
        name: &str,
    ) -> Result<(), RuntimeError> {
        self.seen.push((source.to_vec(), name.to_string()));
        env.def(vm, "booted", Value::bool(true), None);
        Ok(())
    }
}

struct FailingRunner;

impl SourceRunner for FailingRunner {
    fn run(&mut self, _: &mut VM, _: &Environment, _: &[u8], _: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::Unknown("unexpected token".into()))
    }
}

struct BrokenLib;

impl Library for BrokenLib {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn load(&self, _vm: &mut VM, _env: &Environment) -> Result<(), RuntimeError> {
        Err(RuntimeError::Unknown("cannot initialise".into()))
    }
}

fn boot() -> (VM, Environment) {
    let mut vm = VM::new();
    let env = core_env(&mut vm, &default_libraries(), &mut NoopRunner).expect("bootstrap failed");
    (vm, env)
}

const PRIMITIVES: &[&str] = &[
    "native", "print", "describe", "string", "symbol", "buffer", "table", "array", "tuple",
    "struct", "scan-number", "scan-integer", "scan-real", "gensym", "gccollect", "gcinterval",
    "gcsetinterval", "type", "next", "hash",
];

const ASSEMBLED: &[&str] = &[
    "debug", "error", "yield", "resume", "get", "put", "length", "~", "apply", "+", "-", "*", "/",
    "&", "|", "^", "<<", ">>", ">>>", "order>", "order<", "order>=", "order<=", "=", "not=", ">",
    "<", ">=", "<=", "==", "not==",
];

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn test_every_primitive_is_bound() {
    let (vm, env) = boot();
    for name in PRIMITIVES.iter().chain(ASSEMBLED) {
        assert!(env.get(&vm, name).is_some(), "{} is unbound", name);
    }
}

#[test]
fn test_primitives_are_documented() {
    let (vm, env) = boot();
    for name in PRIMITIVES {
        let binding = env.lookup(&vm, name).unwrap();
        assert!(matches!(binding.value, Value::CFunction(_)), "{}", name);
        let doc = binding.doc.unwrap_or_else(|| panic!("{} has no doc", name));
        assert!(doc.starts_with(&format!("({}", name)), "{}: {}", name, doc);
    }
}

#[test]
fn test_assembled_functions_have_no_doc() {
    let (vm, env) = boot();
    for name in ASSEMBLED {
        let binding = env.lookup(&vm, name).unwrap();
        assert!(matches!(binding.value, Value::Function(_)), "{}", name);
        assert_eq!(binding.doc, None, "{}", name);
    }
}

#[test]
fn test_env_and_version_bindings() {
    let (mut vm, env) = boot();
    assert_eq!(env.get(&vm, "_env"), Some(env.value()));
    assert!(env.doc(&vm, "_env").is_some());

    let version = env.get(&vm, "tern.version").unwrap();
    assert_eq!(vm.val_to_string(version), VERSION);
    assert!(env.doc(&vm, "tern.version").is_some());

    let binding = vm.val_to_string(env.value());
    assert!(binding.starts_with("<table 0x"), "{}", binding);
    assert!(vm.roots.contains(&env.value()));
}

#[test]
fn test_libraries_are_loaded() {
    let (vm, env) = boot();
    for name in ["math/sqrt", "math/pi", "math/rng", "fiber/new", "fiber/status"] {
        assert!(env.get(&vm, name).is_some(), "{} is unbound", name);
    }
}

#[test]
fn test_core_only_without_libraries() {
    let mut vm = VM::new();
    let env = core_env(&mut vm, &[], &mut NoopRunner).unwrap();
    assert!(env.get(&vm, "+").is_some());
    assert!(env.get(&vm, "math/sqrt").is_none());
    assert!(env.get(&vm, "_env").is_some());
}

#[test]
fn test_names_are_sorted_and_complete() {
    let (vm, env) = boot();
    let names = env.names(&vm);
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert_eq!(names.len(), env.len(&vm));
    assert!(names.iter().any(|n| n == "order<="));
}

#[test]
fn test_redefinition_replaces_binding() {
    let (mut vm, env) = boot();
    let before = env.len(&vm);
    env.def(&mut vm, "+", Value::int(1), Some("shadowed"));
    assert_eq!(env.len(&vm), before);
    assert_eq!(env.get(&vm, "+"), Some(Value::int(1)));
    assert_eq!(env.doc(&vm, "+").as_deref(), Some("shadowed"));
}

// ============================================================================
// Boot program
// ============================================================================

#[test]
fn test_runner_receives_boot_program() {
    let mut vm = VM::new();
    let mut runner = RecordingRunner::default();
    let env = core_env(&mut vm, &default_libraries(), &mut runner).unwrap();

    assert_eq!(runner.seen.len(), 1);
    assert_eq!(runner.seen[0].0, BOOT_SOURCE);
    assert_eq!(runner.seen[0].1, BOOT_NAME);
    assert_eq!(env.get(&vm, "booted"), Some(Value::bool(true)));
}

#[test]
fn test_boot_program_is_not_empty() {
    let source = std::str::from_utf8(BOOT_SOURCE).unwrap();
    assert!(source.contains("(def "));
}

#[test]
fn test_failing_boot_program_is_fatal() {
    let mut vm = VM::new();
    let err = core_env(&mut vm, &default_libraries(), &mut FailingRunner).unwrap_err();
    let BootstrapError::Bootstrap { name, source } = err else {
        panic!("expected a bootstrap failure, got {:?}", err);
    };
    assert_eq!(name, BOOT_NAME);
    assert!(source.to_string().contains("unexpected token"));
    assert!(vm.roots.is_empty(), "environment stays rooted");
}

#[test]
fn test_failing_library_is_fatal() {
    let mut vm = VM::new();
    let libs: Vec<Box<dyn Library>> = vec![Box::new(BrokenLib)];
    let mut runner = RecordingRunner::default();
    let err = core_env(&mut vm, &libs, &mut runner).unwrap_err();
    assert!(matches!(err, BootstrapError::Library { name: "broken", .. }));
    assert!(runner.seen.is_empty(), "boot program ran after a library failed");
    assert!(vm.roots.is_empty());
}

#[test]
fn test_two_environments_are_independent() {
    let mut vm = VM::new();
    let a = core_env(&mut vm, &[], &mut NoopRunner).unwrap();
    let b = core_env(&mut vm, &[], &mut NoopRunner).unwrap();
    assert_ne!(a, b);
    a.def(&mut vm, "only-in-a", Value::int(1), None);
    assert!(b.get(&vm, "only-in-a").is_none());
    assert_eq!(vm.roots.len(), 2);
}
