use memory::Value;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use vm::{core_env, default_libraries, Environment, RuntimeError, SourceRunner, VM};

struct NoopRunner;

impl SourceRunner for NoopRunner {
    fn run(&mut self, _: &mut VM, _: &Environment, _: &[u8], _: &str) -> Result<(), RuntimeError> {
        Ok(())
    }
}

fn boot() -> (VM, Environment) {
    let mut vm = VM::new();
    let env = core_env(&mut vm, &default_libraries(), &mut NoopRunner).expect("bootstrap failed");
    (vm, env)
}

fn call(vm: &mut VM, env: &Environment, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let f = env.get(vm, name).unwrap_or_else(|| panic!("{} is unbound", name));
    vm.call(f, args)
}

/// Shared sink so a test can read what `print` wrote.
#[derive(Clone, Default)]
struct Capture(Rc<RefCell<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn text(vm: &VM, v: Value) -> String {
    String::from_utf8_lossy(vm.heap.bytes(v).expect("not a byte sequence")).into_owned()
}

// ============================================================================
// Output and strings
// ============================================================================

#[test]
fn test_print_concatenates_and_ends_line() {
    let (mut vm, env) = boot();
    let capture = Capture::default();
    vm.set_output(Box::new(capture.clone()));

    let s = vm.string_value("x = ");
    let r = call(&mut vm, &env, "print", &[s, Value::int(3), Value::Nil]).unwrap();
    assert_eq!(r, Value::Nil);
    assert_eq!(capture.0.borrow().as_slice(), b"x = 3nil\n");
}

#[test]
fn test_describe_quotes_strings() {
    let (mut vm, env) = boot();
    let s = vm.string_value("a\"b\n");
    let d = call(&mut vm, &env, "describe", &[s]).unwrap();
    assert_eq!(text(&vm, d), "\"a\\\"b\\n\"");

    let b = call(&mut vm, &env, "buffer", &[s]).unwrap();
    let d = call(&mut vm, &env, "describe", &[b]).unwrap();
    assert_eq!(text(&vm, d), "@\"a\\\"b\\n\"");
}

#[test]
fn test_describe_functions() {
    let (mut vm, env) = boot();
    let plus = env.get(&vm, "+").unwrap();
    let print = env.get(&vm, "print").unwrap();
    let d = call(&mut vm, &env, "describe", &[plus]).unwrap();
    assert_eq!(text(&vm, d), "<function +>");
    let d = call(&mut vm, &env, "describe", &[print]).unwrap();
    assert_eq!(text(&vm, d), "<cfunction print>");
}

#[test]
fn test_describe_keeps_reals_fractional() {
    let (mut vm, env) = boot();
    let cases = [
        (Value::real(1.0), "1.0"),
        (Value::real(-0.0), "-0.0"),
        (Value::real(2.5), "2.5"),
        (Value::int(1), "1"),
    ];
    for (v, expected) in cases {
        let d = call(&mut vm, &env, "describe", &[v]).unwrap();
        assert_eq!(text(&vm, d), expected);
    }
    let inf = env.get(&vm, "math/inf").unwrap();
    let d = call(&mut vm, &env, "describe", &[inf]).unwrap();
    assert_eq!(text(&vm, d), "inf");

    let joined = call(&mut vm, &env, "string", &[Value::real(3.0)]).unwrap();
    assert_eq!(text(&vm, joined), "3.0");
}

#[test]
fn test_string_symbol_buffer_concatenate() {
    let (mut vm, env) = boot();
    let s = vm.string_value("ab");
    let args = [s, Value::int(12), Value::bool(true)];

    let joined = call(&mut vm, &env, "string", &args).unwrap();
    assert!(matches!(joined, Value::String(_)));
    assert_eq!(text(&vm, joined), "ab12true");

    let sym = call(&mut vm, &env, "symbol", &args).unwrap();
    assert!(matches!(sym, Value::Symbol(_)));
    assert_eq!(sym, vm.symbol_value("ab12true"), "symbols are interned");

    let buf = call(&mut vm, &env, "buffer", &args).unwrap();
    assert!(matches!(buf, Value::Buffer(_)));
    assert_eq!(text(&vm, buf), "ab12true");

    let empty = call(&mut vm, &env, "string", &[]).unwrap();
    assert_eq!(text(&vm, empty), "");
}

// ============================================================================
// Data structures
// ============================================================================

#[test]
fn test_table_and_struct_constructors() {
    let (mut vm, env) = boot();
    let k = vm.symbol_value(":k");

    let t = call(&mut vm, &env, "table", &[k, Value::int(1)]).unwrap();
    assert!(matches!(t, Value::Table(_)));
    assert_eq!(call(&mut vm, &env, "get", &[t, k]).unwrap(), Value::int(1));

    let s = call(&mut vm, &env, "struct", &[k, Value::int(2)]).unwrap();
    assert!(matches!(s, Value::Struct(_)));
    assert_eq!(call(&mut vm, &env, "get", &[s, k]).unwrap(), Value::int(2));
    assert_eq!(call(&mut vm, &env, "get", &[s, Value::int(0)]).unwrap(), Value::Nil);
}

#[test]
fn test_later_duplicate_key_wins() {
    let (mut vm, env) = boot();
    let a = vm.symbol_value(":a");
    for name in ["table", "struct"] {
        let ds = call(&mut vm, &env, name, &[a, Value::int(1), a, Value::int(2)]).unwrap();
        assert_eq!(call(&mut vm, &env, "get", &[ds, a]).unwrap(), Value::int(2), "{}", name);
        assert_eq!(call(&mut vm, &env, "length", &[ds]).unwrap(), Value::int(1), "{}", name);
    }
}

#[test]
fn test_two_pairs_give_two_bindings() {
    let (mut vm, env) = boot();
    let a = vm.symbol_value(":a");
    let b = vm.symbol_value(":b");
    for name in ["table", "struct"] {
        let ds = call(&mut vm, &env, name, &[a, Value::int(1), b, Value::int(2)]).unwrap();
        assert_eq!(call(&mut vm, &env, "length", &[ds]).unwrap(), Value::int(2), "{}", name);

        let mut keys = Vec::new();
        let mut key = call(&mut vm, &env, "next", &[ds, Value::Nil]).unwrap();
        while !key.is_nil() {
            keys.push(key);
            key = call(&mut vm, &env, "next", &[ds, key]).unwrap();
        }
        assert_eq!(keys.len(), 2, "{}", name);
        assert!(keys.contains(&a) && keys.contains(&b), "{}", name);
        assert_eq!(call(&mut vm, &env, "get", &[ds, a]).unwrap(), Value::int(1));
        assert_eq!(call(&mut vm, &env, "get", &[ds, b]).unwrap(), Value::int(2));
    }
}

#[test]
fn test_odd_key_value_count_is_rejected() {
    let (mut vm, env) = boot();
    for name in ["table", "struct"] {
        let err = call(&mut vm, &env, name, &[Value::int(1)]).unwrap_err();
        assert!(matches!(err, RuntimeError::ArityMismatch(_)), "{}", name);
    }
}

#[test]
fn test_get_put_length() {
    let (mut vm, env) = boot();
    let arr = call(&mut vm, &env, "array", &[Value::int(10), Value::int(20)]).unwrap();
    assert_eq!(call(&mut vm, &env, "length", &[arr]).unwrap(), Value::int(2));
    assert_eq!(call(&mut vm, &env, "get", &[arr, Value::int(1)]).unwrap(), Value::int(20));
    assert_eq!(call(&mut vm, &env, "get", &[arr, Value::int(5)]).unwrap(), Value::Nil);

    // put returns the data structure and grows arrays
    let r = call(&mut vm, &env, "put", &[arr, Value::int(3), Value::int(40)]).unwrap();
    assert_eq!(r, arr);
    assert_eq!(
        vm.sequence_items(arr).unwrap(),
        vec![Value::int(10), Value::int(20), Value::Nil, Value::int(40)]
    );

    let s = vm.string_value("hello");
    assert_eq!(call(&mut vm, &env, "length", &[s]).unwrap(), Value::int(5));
    assert_eq!(call(&mut vm, &env, "get", &[s, Value::int(1)]).unwrap(), Value::int(b'e' as i32));
}

#[test]
fn test_put_past_growth_limit_is_range_error() {
    let (mut vm, env) = boot();
    let arr = call(&mut vm, &env, "array", &[]).unwrap();
    let err = call(&mut vm, &env, "put", &[arr, Value::int(2_000_000_000), Value::int(1)])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::OutOfRange(_)), "got {:?}", err);
    assert_eq!(call(&mut vm, &env, "length", &[arr]).unwrap(), Value::int(0));

    let s = vm.string_value("");
    let buf = call(&mut vm, &env, "buffer", &[s]).unwrap();
    let err = call(&mut vm, &env, "put", &[buf, Value::int(i32::MAX), Value::int(1)])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::OutOfRange(_)), "got {:?}", err);

    vm.config.max_sequence_len = 4;
    call(&mut vm, &env, "put", &[arr, Value::int(3), Value::int(1)]).unwrap();
    let err = call(&mut vm, &env, "put", &[arr, Value::int(4), Value::int(1)]).unwrap_err();
    assert!(matches!(err, RuntimeError::OutOfRange(_)));
}

#[test]
fn test_put_on_immutable_is_type_error() {
    let (mut vm, env) = boot();
    let t = call(&mut vm, &env, "tuple", &[Value::int(1)]).unwrap();
    let err = call(&mut vm, &env, "put", &[t, Value::int(0), Value::int(2)]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

#[test]
fn test_length_of_table_counts_entries() {
    let (mut vm, env) = boot();
    let t = call(&mut vm, &env, "table", &[]).unwrap();
    for i in 0..5 {
        call(&mut vm, &env, "put", &[t, Value::int(i), Value::bool(true)]).unwrap();
    }
    assert_eq!(call(&mut vm, &env, "length", &[t]).unwrap(), Value::int(5));
}

#[test]
fn test_bnot() {
    let (mut vm, env) = boot();
    assert_eq!(call(&mut vm, &env, "~", &[Value::int(0)]).unwrap(), Value::int(-1));
    assert_eq!(call(&mut vm, &env, "~", &[Value::int(5)]).unwrap(), Value::int(-6));
    let err = call(&mut vm, &env, "~", &[Value::real(1.0)]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

#[test]
fn test_next_walks_every_key_once() {
    let (mut vm, env) = boot();
    let args: Vec<Value> = (0..6).flat_map(|i| [Value::int(i), Value::int(i * i)]).collect();
    let t = call(&mut vm, &env, "table", &args).unwrap();

    let mut seen = Vec::new();
    let mut key = call(&mut vm, &env, "next", &[t, Value::Nil]).unwrap();
    while !key.is_nil() {
        seen.push(key.as_int().unwrap());
        key = call(&mut vm, &env, "next", &[t, key]).unwrap();
    }
    seen.sort();
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);

    let empty = call(&mut vm, &env, "struct", &[]).unwrap();
    assert_eq!(call(&mut vm, &env, "next", &[empty, Value::Nil]).unwrap(), Value::Nil);

    let err = call(&mut vm, &env, "next", &[Value::int(1), Value::Nil]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

// ============================================================================
// Scanning
// ============================================================================

#[test]
fn test_scan_primitives() {
    let (mut vm, env) = boot();
    let int_src = vm.string_value("42");
    let real_src = vm.string_value("2.5");
    let junk = vm.string_value("4x2");

    assert_eq!(call(&mut vm, &env, "scan-number", &[int_src]).unwrap(), Value::int(42));
    assert_eq!(call(&mut vm, &env, "scan-number", &[real_src]).unwrap(), Value::real(2.5));
    assert_eq!(call(&mut vm, &env, "scan-number", &[junk]).unwrap(), Value::Nil);

    assert_eq!(call(&mut vm, &env, "scan-integer", &[int_src]).unwrap(), Value::int(42));
    assert_eq!(call(&mut vm, &env, "scan-integer", &[real_src]).unwrap(), Value::Nil);

    assert_eq!(call(&mut vm, &env, "scan-real", &[int_src]).unwrap(), Value::real(42.0));
    assert_eq!(call(&mut vm, &env, "scan-real", &[real_src]).unwrap(), Value::real(2.5));

    let err = call(&mut vm, &env, "scan-number", &[Value::int(1)]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

// ============================================================================
// Reflection
// ============================================================================

#[test]
fn test_gensym_is_fresh() {
    let (mut vm, env) = boot();
    let taken = vm.symbol_value("_000001");
    let a = call(&mut vm, &env, "gensym", &[]).unwrap();
    let b = call(&mut vm, &env, "gensym", &[]).unwrap();
    assert!(matches!(a, Value::Symbol(_)));
    assert_ne!(a, b);
    assert_ne!(a, taken);
    assert_ne!(b, taken);
}

#[test]
fn test_type_names() {
    let (mut vm, env) = boot();
    let s = vm.string_value("s");
    let plus = env.get(&vm, "+").unwrap();
    let print = env.get(&vm, "print").unwrap();
    let rng = call(&mut vm, &env, "math/rng", &[Value::int(1)]).unwrap();

    let cases = [
        (Value::Nil, ":nil"),
        (Value::bool(false), ":boolean"),
        (Value::int(1), ":integer"),
        (Value::real(1.0), ":real"),
        (s, ":string"),
        (plus, ":function"),
        (print, ":cfunction"),
        (env.value(), ":table"),
        (rng, "core/rng"),
    ];
    for (v, expected) in cases {
        let t = call(&mut vm, &env, "type", &[v]).unwrap();
        assert!(matches!(t, Value::Symbol(_)));
        assert_eq!(vm.val_to_string(t), expected);
    }
}

#[test]
fn test_hash_follows_equality() {
    let (mut vm, env) = boot();
    let a = vm.string_value("same");
    let b = vm.string_value("same");
    let c = vm.string_value("different");
    let ha = call(&mut vm, &env, "hash", &[a]).unwrap();
    let hb = call(&mut vm, &env, "hash", &[b]).unwrap();
    let hc = call(&mut vm, &env, "hash", &[c]).unwrap();
    assert_eq!(ha, hb);
    assert_ne!(ha, hc);
    assert!(ha.is_int());
}

#[test]
fn test_hash_is_stable_and_structural() {
    let (mut vm, env) = boot();
    let h1 = call(&mut vm, &env, "hash", &[Value::int(1)]).unwrap();
    let h2 = call(&mut vm, &env, "hash", &[Value::int(1)]).unwrap();
    assert_eq!(h1, h2);

    let s = vm.string_value("x");
    let t1 = call(&mut vm, &env, "tuple", &[Value::int(1), s, Value::real(0.0)]).unwrap();
    let s2 = vm.string_value("x");
    let t2 = call(&mut vm, &env, "tuple", &[Value::int(1), s2, Value::real(-0.0)]).unwrap();
    assert_ne!(t1, t2, "distinct allocations");
    let ht1 = call(&mut vm, &env, "hash", &[t1]).unwrap();
    let ht2 = call(&mut vm, &env, "hash", &[t2]).unwrap();
    assert_eq!(ht1, ht2);
    assert_eq!(call(&mut vm, &env, "=", &[t1, t2]).unwrap(), Value::bool(true));
}

#[test]
fn test_gc_interval_round_trip() {
    let (mut vm, env) = boot();
    call(&mut vm, &env, "gcsetinterval", &[Value::int(1234)]).unwrap();
    assert_eq!(call(&mut vm, &env, "gcinterval", &[]).unwrap(), Value::int(1234));

    let err = call(&mut vm, &env, "gcsetinterval", &[Value::int(-1)]).unwrap_err();
    assert!(matches!(err, RuntimeError::OutOfRange(_)));
    let err = call(&mut vm, &env, "gcsetinterval", &[Value::real(1.0)]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

#[test]
fn test_native_arity_is_checked() {
    let (mut vm, env) = boot();
    let err = call(&mut vm, &env, "type", &[]).unwrap_err();
    assert!(matches!(err, RuntimeError::ArityMismatch(_)));
}

// ============================================================================
// Math library
// ============================================================================

#[test]
fn test_math_functions() {
    let (mut vm, env) = boot();
    assert_eq!(call(&mut vm, &env, "math/sqrt", &[Value::int(16)]).unwrap(), Value::real(4.0));
    assert_eq!(call(&mut vm, &env, "math/floor", &[Value::real(2.7)]).unwrap(), Value::real(2.0));
    assert_eq!(call(&mut vm, &env, "math/abs", &[Value::int(-3)]).unwrap(), Value::int(3));
    assert_eq!(
        call(&mut vm, &env, "math/pow", &[Value::int(2), Value::int(10)]).unwrap(),
        Value::real(1024.0)
    );
    assert_eq!(env.get(&vm, "math/pi"), Some(Value::real(std::f64::consts::PI)));

    let err = call(&mut vm, &env, "math/sqrt", &[Value::Nil]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

#[test]
fn test_remainder() {
    let (mut vm, env) = boot();
    assert_eq!(call(&mut vm, &env, "%", &[Value::int(7), Value::int(3)]).unwrap(), Value::int(1));
    assert_eq!(call(&mut vm, &env, "%", &[Value::int(-7), Value::int(3)]).unwrap(), Value::int(-1));
    assert_eq!(
        call(&mut vm, &env, "%", &[Value::int(i32::MIN), Value::int(-1)]).unwrap(),
        Value::int(0)
    );
    assert_eq!(
        call(&mut vm, &env, "%", &[Value::real(7.5), Value::int(2)]).unwrap(),
        Value::real(1.5)
    );

    let err = call(&mut vm, &env, "%", &[Value::int(1), Value::int(0)]).unwrap_err();
    assert!(matches!(err, RuntimeError::DivisionByZero));
    let r = call(&mut vm, &env, "%", &[Value::real(1.0), Value::int(0)]).unwrap();
    assert!(r.as_number().unwrap().is_nan());
    let err = call(&mut vm, &env, "%", &[Value::Nil, Value::int(2)]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

#[test]
fn test_not_int_real() {
    let (mut vm, env) = boot();
    assert_eq!(call(&mut vm, &env, "not", &[Value::Nil]).unwrap(), Value::bool(true));
    assert_eq!(call(&mut vm, &env, "not", &[Value::bool(false)]).unwrap(), Value::bool(true));
    assert_eq!(call(&mut vm, &env, "not", &[Value::int(0)]).unwrap(), Value::bool(false));

    assert_eq!(call(&mut vm, &env, "int", &[Value::real(3.9)]).unwrap(), Value::int(3));
    assert_eq!(call(&mut vm, &env, "int", &[Value::real(-3.9)]).unwrap(), Value::int(-3));
    assert_eq!(call(&mut vm, &env, "int", &[Value::int(5)]).unwrap(), Value::int(5));
    assert_eq!(call(&mut vm, &env, "real", &[Value::int(5)]).unwrap(), Value::real(5.0));
    assert_eq!(call(&mut vm, &env, "real", &[Value::real(0.5)]).unwrap(), Value::real(0.5));

    let s = vm.string_value("1");
    for name in ["int", "real"] {
        let err = call(&mut vm, &env, name, &[s]).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch(_)), "{}", name);
    }
}

#[test]
fn test_hyperbolic_and_atan2() {
    let (mut vm, env) = boot();
    assert_eq!(call(&mut vm, &env, "math/cosh", &[Value::int(0)]).unwrap(), Value::real(1.0));
    assert_eq!(call(&mut vm, &env, "math/sinh", &[Value::int(0)]).unwrap(), Value::real(0.0));
    assert_eq!(call(&mut vm, &env, "math/tanh", &[Value::int(0)]).unwrap(), Value::real(0.0));
    assert_eq!(
        call(&mut vm, &env, "math/atan2", &[Value::int(1), Value::int(0)]).unwrap(),
        Value::real(std::f64::consts::FRAC_PI_2)
    );
    assert_eq!(
        call(&mut vm, &env, "math/atan2", &[Value::int(0), Value::int(-1)]).unwrap(),
        Value::real(std::f64::consts::PI)
    );
    let err = call(&mut vm, &env, "math/atan2", &[Value::Nil, Value::int(1)]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
}

#[test]
fn test_seeded_generators_repeat() {
    let (mut vm, env) = boot();
    let a = call(&mut vm, &env, "math/rng", &[Value::int(7)]).unwrap();
    let b = call(&mut vm, &env, "math/rng", &[Value::int(7)]).unwrap();
    for _ in 0..8 {
        let x = call(&mut vm, &env, "math/rng-int", &[a, Value::int(100)]).unwrap();
        let y = call(&mut vm, &env, "math/rng-int", &[b, Value::int(100)]).unwrap();
        assert_eq!(x, y);
        assert!((0..100).contains(&x.as_int().unwrap()));
    }

    let err = call(&mut vm, &env, "math/rng-int", &[a, Value::int(0)]).unwrap_err();
    assert!(matches!(err, RuntimeError::OutOfRange(_)));

    call(&mut vm, &env, "math/seedrandom", &[Value::int(3)]).unwrap();
    let r1 = call(&mut vm, &env, "math/random", &[]).unwrap();
    call(&mut vm, &env, "math/seedrandom", &[Value::int(3)]).unwrap();
    let r2 = call(&mut vm, &env, "math/random", &[]).unwrap();
    assert_eq!(r1, r2);
    let x = r1.as_number().unwrap();
    assert!((0.0..1.0).contains(&x));
}

#[test]
fn test_default_generator_belongs_to_each_vm() {
    let (mut a, env_a) = boot();
    let (mut b, env_b) = boot();

    call(&mut a, &env_a, "math/seedrandom", &[Value::int(11)]).unwrap();
    call(&mut b, &env_b, "math/seedrandom", &[Value::int(11)]).unwrap();
    let first = call(&mut a, &env_a, "math/random", &[]).unwrap();

    // reseeding one VM leaves the other's sequence alone
    call(&mut a, &env_a, "math/seedrandom", &[Value::int(99)]).unwrap();
    let other = call(&mut b, &env_b, "math/random", &[]).unwrap();
    assert_eq!(first, other);
}
