use crate::error::RuntimeError;
use crate::loader::load_native;
use crate::machine::{GarbageCollector, NativeRegistry, VM};
use crate::scan::{scan_integer, scan_number, scan_real, Number};
use memory::Value;
use std::io::Write;

/// Concatenated to-string forms of `args`.
fn concat(vm: &VM, args: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for &arg in args {
        vm.to_string_bytes(arg, &mut out);
    }
    out
}

/// Byte contents of a string, symbol or buffer argument.
fn expect_bytes<'a>(vm: &'a VM, name: &str, v: Value) -> Result<&'a [u8], RuntimeError> {
    vm.heap.bytes(v).ok_or_else(|| {
        RuntimeError::TypeMismatch(format!(
            "{} expects a string, symbol or buffer, got {}",
            name,
            v.type_of()
        ))
    })
}

fn expect_pairs(name: &str, args: &[Value]) -> Result<(), RuntimeError> {
    if args.len() % 2 != 0 {
        return Err(RuntimeError::ArityMismatch(format!(
            "{} expects an even number of arguments, got {}",
            name,
            args.len()
        )));
    }
    Ok(())
}

pub fn native_native(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = String::from_utf8_lossy(expect_bytes(vm, "native", args[0])?).into_owned();
    if let Some(&idx) = vm.native_modules.get(&path) {
        return Ok(Value::CFunction(idx));
    }
    let init = load_native(vm.loader.as_mut(), &path)?;
    let entry = vm.define_native(&path, init, 1);
    if let Value::CFunction(idx) = entry {
        vm.native_modules.insert(path, idx);
    }
    Ok(entry)
}

pub fn native_print(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut line = concat(vm, args);
    line.push(b'\n');
    vm.output
        .write_all(&line)
        .and_then(|_| vm.output.flush())
        .map_err(|e| RuntimeError::Unknown(format!("print failed: {}", e)))?;
    Ok(Value::nil())
}

pub fn native_describe(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut out = Vec::new();
    for &arg in args {
        vm.describe_bytes(arg, &mut out);
    }
    Ok(Value::String(vm.heap.alloc_string(&out)))
}

pub fn native_string(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let bytes = concat(vm, args);
    Ok(Value::String(vm.heap.alloc_string(&bytes)))
}

pub fn native_symbol(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let bytes = concat(vm, args);
    Ok(Value::Symbol(vm.heap.intern(&bytes)))
}

pub fn native_buffer(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let bytes = concat(vm, args);
    Ok(Value::Buffer(vm.heap.alloc_buffer(bytes)))
}

pub fn native_table(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_pairs("table", args)?;
    let table = vm.heap.alloc_table(args.len() / 2);
    for pair in args.chunks_exact(2) {
        vm.heap.table_put(table, pair[0], pair[1]);
    }
    Ok(Value::Table(table))
}

pub fn native_struct(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_pairs("struct", args)?;
    let pairs: Vec<(Value, Value)> = args.chunks_exact(2).map(|p| (p[0], p[1])).collect();
    Ok(Value::Struct(vm.heap.alloc_struct(&pairs)))
}

pub fn native_array(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Array(vm.heap.alloc_array(args.to_vec())))
}

pub fn native_tuple(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Tuple(vm.heap.alloc_tuple(args.to_vec())))
}

pub fn native_scan_number(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let src = expect_bytes(vm, "scan-number", args[0])?;
    Ok(match scan_number(src) {
        Some(Number::Integer(i)) => Value::int(i),
        Some(Number::Real(r)) => Value::real(r),
        None => Value::nil(),
    })
}

pub fn native_scan_integer(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let src = expect_bytes(vm, "scan-integer", args[0])?;
    Ok(scan_integer(src).map_or(Value::Nil, Value::int))
}

pub fn native_scan_real(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let src = expect_bytes(vm, "scan-real", args[0])?;
    Ok(scan_real(src).map_or(Value::Nil, Value::real))
}

pub fn native_gensym(vm: &mut VM, _args: &[Value]) -> Result<Value, RuntimeError> {
    loop {
        vm.gensym_counter = vm.gensym_counter.wrapping_add(1);
        let name = format!("_{:06}", vm.gensym_counter);
        if !vm.heap.symbol_exists(name.as_bytes()) {
            return Ok(Value::Symbol(vm.heap.intern(name.as_bytes())));
        }
    }
}

pub fn native_gccollect(vm: &mut VM, _args: &[Value]) -> Result<Value, RuntimeError> {
    vm.collect_garbage();
    Ok(Value::nil())
}

pub fn native_gcinterval(vm: &mut VM, _args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::int(vm.heap.gc_interval.min(i32::MAX as usize) as i32))
}

pub fn native_gcsetinterval(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0] {
        Value::Integer(i) if i < 0 => Err(RuntimeError::OutOfRange(format!(
            "gc interval must be non-negative, got {}",
            i
        ))),
        Value::Integer(i) => {
            vm.heap.gc_interval = i as usize;
            vm.config.gc_interval = i as usize;
            Ok(Value::nil())
        }
        other => Err(RuntimeError::TypeMismatch(format!(
            "gcsetinterval expects an integer, got {}",
            other.type_of()
        ))),
    }
}

pub fn native_type(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let name = match args[0] {
        Value::Abstract(h) => vm.heap.get_abstract(h).map_or("abstract", |a| a.ty.name),
        other => other.type_of().name(),
    };
    Ok(vm.symbol_value(name))
}

pub fn native_next(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let (ds, key) = (args[0], args[1]);
    let next = match ds {
        Value::Table(h) => vm.heap.table_next(h, key),
        Value::Struct(h) => vm.heap.struct_next(h, key),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "next expects a table or struct, got {}",
                other.type_of()
            )))
        }
    };
    Ok(next.unwrap_or_default())
}

pub fn native_hash(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::int(vm.heap.hash(args[0])))
}
