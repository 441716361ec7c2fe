use super::{define_natives, Library};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::machine::VM;
use crate::specs::NativeMeta;
use memory::{AbstractType, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstract type of the generators returned by `math/rng`.
pub static RNG_TYPE: AbstractType = AbstractType { name: "core/rng" };

fn expect_number(name: &str, v: Value) -> Result<f64, RuntimeError> {
    v.as_number().ok_or_else(|| {
        RuntimeError::TypeMismatch(format!("{} expects a number, got {}", name, v.type_of()))
    })
}

/// Seed from an integer, or from the bytes of a string-like value.
fn seed_of(vm: &VM, name: &str, v: Value) -> Result<u64, RuntimeError> {
    match v {
        Value::Integer(i) => Ok(i as u32 as u64),
        other => match vm.heap.bytes(other) {
            Some(bytes) => Ok(bytes
                .iter()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, &b| {
                    (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                })),
            None => Err(RuntimeError::TypeMismatch(format!(
                "{} expects an integer or string seed, got {}",
                name,
                other.type_of()
            ))),
        },
    }
}

macro_rules! unary_math {
    ($fname:ident, $name:literal, $op:expr) => {
        fn $fname(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
            let x = expect_number($name, args[0])?;
            let f: fn(f64) -> f64 = $op;
            Ok(Value::real(f(x)))
        }
    };
}

unary_math!(native_sqrt, "math/sqrt", f64::sqrt);
unary_math!(native_cos, "math/cos", f64::cos);
unary_math!(native_sin, "math/sin", f64::sin);
unary_math!(native_tan, "math/tan", f64::tan);
unary_math!(native_acos, "math/acos", f64::acos);
unary_math!(native_asin, "math/asin", f64::asin);
unary_math!(native_atan, "math/atan", f64::atan);
unary_math!(native_cosh, "math/cosh", f64::cosh);
unary_math!(native_sinh, "math/sinh", f64::sinh);
unary_math!(native_tanh, "math/tanh", f64::tanh);
unary_math!(native_exp, "math/exp", f64::exp);
unary_math!(native_log, "math/log", f64::ln);
unary_math!(native_log10, "math/log10", f64::log10);

fn native_remainder(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match (args[0], args[1]) {
        (Value::Integer(_), Value::Integer(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::int(x.wrapping_rem(y))),
        (x, y) => {
            let x = expect_number("%", x)?;
            let y = expect_number("%", y)?;
            Ok(Value::real(x % y))
        }
    }
}

fn native_not(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::bool(args[0].is_falsey()))
}

fn native_int(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0] {
        v @ Value::Integer(_) => Ok(v),
        Value::Real(r) => Ok(Value::int(r as i32)),
        other => Err(RuntimeError::TypeMismatch(format!(
            "could not convert {} to integer",
            other.type_of()
        ))),
    }
}

fn native_real(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0] {
        Value::Integer(i) => Ok(Value::real(i as f64)),
        v @ Value::Real(_) => Ok(v),
        other => Err(RuntimeError::TypeMismatch(format!(
            "could not convert {} to real",
            other.type_of()
        ))),
    }
}

fn native_floor(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0] {
        v @ Value::Integer(_) => Ok(v),
        v => Ok(Value::real(expect_number("math/floor", v)?.floor())),
    }
}

fn native_ceil(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0] {
        v @ Value::Integer(_) => Ok(v),
        v => Ok(Value::real(expect_number("math/ceil", v)?.ceil())),
    }
}

fn native_abs(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0] {
        Value::Integer(i) => Ok(Value::int(i.wrapping_abs())),
        v => Ok(Value::real(expect_number("math/abs", v)?.abs())),
    }
}

fn native_pow(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let base = expect_number("math/pow", args[0])?;
    let exp = expect_number("math/pow", args[1])?;
    Ok(Value::real(base.powf(exp)))
}

fn native_atan2(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let y = expect_number("math/atan2", args[0])?;
    let x = expect_number("math/atan2", args[1])?;
    Ok(Value::real(y.atan2(x)))
}

fn native_random(vm: &mut VM, _args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::real(vm.rng.gen::<f64>()))
}

fn native_seedrandom(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let seed = seed_of(vm, "math/seedrandom", args[0])?;
    vm.rng = StdRng::seed_from_u64(seed);
    Ok(Value::nil())
}

fn native_rng(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let rng = match args {
        [] => StdRng::from_entropy(),
        [seed] => StdRng::seed_from_u64(seed_of(vm, "math/rng", *seed)?),
        _ => {
            return Err(RuntimeError::ArityMismatch(format!(
                "math/rng expects 0 or 1 arguments, got {}",
                args.len()
            )))
        }
    };
    Ok(Value::Abstract(vm.heap.alloc_abstract(&RNG_TYPE, Box::new(rng))))
}

fn native_rng_int(vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let (handle, max) = match args {
        [Value::Abstract(h)] => (*h, i32::MAX),
        [Value::Abstract(h), Value::Integer(max)] => (*h, *max),
        [_] | [_, _] => {
            return Err(RuntimeError::TypeMismatch(
                "math/rng-int expects a core/rng and an optional integer bound".into(),
            ))
        }
        _ => {
            return Err(RuntimeError::ArityMismatch(format!(
                "math/rng-int expects 1 or 2 arguments, got {}",
                args.len()
            )))
        }
    };
    if max <= 0 {
        return Err(RuntimeError::OutOfRange(format!(
            "math/rng-int bound must be positive, got {}",
            max
        )));
    }
    let rng = vm
        .heap
        .get_abstract_mut(handle)
        .filter(|a| std::ptr::eq(a.ty, &RNG_TYPE))
        .and_then(|a| a.data.downcast_mut::<StdRng>())
        .ok_or_else(|| RuntimeError::TypeMismatch("math/rng-int expects a core/rng".into()))?;
    Ok(Value::int(rng.gen_range(0..max)))
}

const MATH_NATIVES: &[NativeMeta] = &[
    NativeMeta {
        name: "%",
        func: native_remainder,
        arity: 2,
        doc: "(% dividend divisor)\n\n\
              Return the remainder of dividend / divisor. Two integers give an \
              integer; otherwise the real remainder is returned.",
    },
    NativeMeta {
        name: "not",
        func: native_not,
        arity: 1,
        doc: "(not x)\n\nReturn true if x is falsey, false otherwise.",
    },
    NativeMeta {
        name: "int",
        func: native_int,
        arity: 1,
        doc: "(int x)\n\nConvert a number to an integer, truncating reals.",
    },
    NativeMeta {
        name: "real",
        func: native_real,
        arity: 1,
        doc: "(real x)\n\nConvert a number to a real.",
    },
    NativeMeta {
        name: "math/random",
        func: native_random,
        arity: 0,
        doc: "(math/random)\n\nReturn a uniformly distributed real in [0, 1).",
    },
    NativeMeta {
        name: "math/seedrandom",
        func: native_seedrandom,
        arity: 1,
        doc: "(math/seedrandom seed)\n\n\
              Reseed the generator behind math/random. seed is an integer or \
              a string.",
    },
    NativeMeta {
        name: "math/rng",
        func: native_rng,
        arity: -1,
        doc: "(math/rng &opt seed)\n\n\
              Create an independent random generator, seeded from seed when \
              given and from system entropy otherwise.",
    },
    NativeMeta {
        name: "math/rng-int",
        func: native_rng_int,
        arity: -1,
        doc: "(math/rng-int rng &opt max)\n\n\
              Draw an integer in [0, max) from rng. max defaults to the \
              largest integer.",
    },
    NativeMeta {
        name: "math/cos",
        func: native_cos,
        arity: 1,
        doc: "(math/cos x)\n\nReturn the cosine of x.",
    },
    NativeMeta {
        name: "math/sin",
        func: native_sin,
        arity: 1,
        doc: "(math/sin x)\n\nReturn the sine of x.",
    },
    NativeMeta {
        name: "math/tan",
        func: native_tan,
        arity: 1,
        doc: "(math/tan x)\n\nReturn the tangent of x.",
    },
    NativeMeta {
        name: "math/acos",
        func: native_acos,
        arity: 1,
        doc: "(math/acos x)\n\nReturn the arccosine of x.",
    },
    NativeMeta {
        name: "math/asin",
        func: native_asin,
        arity: 1,
        doc: "(math/asin x)\n\nReturn the arcsine of x.",
    },
    NativeMeta {
        name: "math/atan",
        func: native_atan,
        arity: 1,
        doc: "(math/atan x)\n\nReturn the arctangent of x.",
    },
    NativeMeta {
        name: "math/atan2",
        func: native_atan2,
        arity: 2,
        doc: "(math/atan2 y x)\n\nReturn the arctangent of y/x, using the signs of both to pick the quadrant.",
    },
    NativeMeta {
        name: "math/cosh",
        func: native_cosh,
        arity: 1,
        doc: "(math/cosh x)\n\nReturn the hyperbolic cosine of x.",
    },
    NativeMeta {
        name: "math/sinh",
        func: native_sinh,
        arity: 1,
        doc: "(math/sinh x)\n\nReturn the hyperbolic sine of x.",
    },
    NativeMeta {
        name: "math/tanh",
        func: native_tanh,
        arity: 1,
        doc: "(math/tanh x)\n\nReturn the hyperbolic tangent of x.",
    },
    NativeMeta {
        name: "math/exp",
        func: native_exp,
        arity: 1,
        doc: "(math/exp x)\n\nReturn e to the power of x.",
    },
    NativeMeta {
        name: "math/log",
        func: native_log,
        arity: 1,
        doc: "(math/log x)\n\nReturn the natural logarithm of x.",
    },
    NativeMeta {
        name: "math/log10",
        func: native_log10,
        arity: 1,
        doc: "(math/log10 x)\n\nReturn the base 10 logarithm of x.",
    },
    NativeMeta {
        name: "math/sqrt",
        func: native_sqrt,
        arity: 1,
        doc: "(math/sqrt x)\n\nReturn the square root of x.",
    },
    NativeMeta {
        name: "math/floor",
        func: native_floor,
        arity: 1,
        doc: "(math/floor x)\n\nReturn the largest integral value not greater than x.",
    },
    NativeMeta {
        name: "math/ceil",
        func: native_ceil,
        arity: 1,
        doc: "(math/ceil x)\n\nReturn the smallest integral value not less than x.",
    },
    NativeMeta {
        name: "math/abs",
        func: native_abs,
        arity: 1,
        doc: "(math/abs x)\n\nReturn the absolute value of x.",
    },
    NativeMeta {
        name: "math/pow",
        func: native_pow,
        arity: 2,
        doc: "(math/pow a b)\n\nReturn a to the power of b.",
    },
];

pub struct MathLib;

impl Library for MathLib {
    fn name(&self) -> &'static str {
        "math"
    }

    fn load(&self, vm: &mut VM, env: &Environment) -> Result<(), RuntimeError> {
        define_natives(vm, env, MATH_NATIVES);
        let constants = [
            ("math/pi", std::f64::consts::PI, "The value pi."),
            ("math/e", std::f64::consts::E, "The base of the natural log."),
            ("math/inf", f64::INFINITY, "Positive infinity."),
        ];
        for (name, value, doc) in constants {
            env.def(vm, name, Value::real(value), Some(doc));
        }
        Ok(())
    }
}
