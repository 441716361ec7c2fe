use std::fmt;
use std::hash::{Hash, Hasher};

/// A Tern value.
///
/// Immediates (nil, booleans, integers, reals) are stored inline. Every other
/// kind is a handle into the matching typed arena of the [`Heap`](crate::Heap),
/// except `CFunction`, which indexes the VM's native registry.
#[derive(Clone, Copy, Debug)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i32),
    Real(f64),
    String(u32),
    Symbol(u32),
    Buffer(u32),
    Array(u32),
    Tuple(u32),
    Table(u32),
    Struct(u32),
    Function(u32),
    CFunction(u32),
    Fiber(u32),
    Abstract(u32),
}

/// Type discriminant, in total-order rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueType {
    Nil = 0,
    Boolean,
    Integer,
    Real,
    String,
    Symbol,
    Array,
    Tuple,
    Table,
    Struct,
    Buffer,
    Function,
    CFunction,
    Fiber,
    Abstract,
}

impl ValueType {
    /// Name reported by the `type` primitive.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Nil => ":nil",
            ValueType::Boolean => ":boolean",
            ValueType::Integer => ":integer",
            ValueType::Real => ":real",
            ValueType::String => ":string",
            ValueType::Symbol => ":symbol",
            ValueType::Array => ":array",
            ValueType::Tuple => ":tuple",
            ValueType::Table => ":table",
            ValueType::Struct => ":struct",
            ValueType::Buffer => ":buffer",
            ValueType::Function => ":function",
            ValueType::CFunction => ":cfunction",
            ValueType::Fiber => ":fiber",
            ValueType::Abstract => ":abstract",
        }
    }

    /// Short name without the leading colon, used in error messages and
    /// in the `<kind 0x...>` rendering of reference values.
    pub fn short_name(self) -> &'static str {
        &self.name()[1..]
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl Value {
    // --- Constructors ---

    #[inline]
    pub fn nil() -> Self {
        Value::Nil
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Boolean(b)
    }

    #[inline]
    pub fn int(i: i32) -> Self {
        Value::Integer(i)
    }

    #[inline]
    pub fn real(r: f64) -> Self {
        Value::Real(r)
    }

    // --- Predicates ---

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    /// `nil` and `false` are the only falsey values.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    #[inline]
    pub fn is_falsey(&self) -> bool {
        !self.is_truthy()
    }

    /// True for values that live in a heap arena.
    #[inline]
    pub fn is_obj(&self) -> bool {
        self.as_handle().is_some()
    }

    // --- Accessors ---

    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to reals.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Arena handle for heap-allocated kinds.
    #[inline]
    pub fn as_handle(&self) -> Option<u32> {
        match self {
            Value::String(h)
            | Value::Symbol(h)
            | Value::Buffer(h)
            | Value::Array(h)
            | Value::Tuple(h)
            | Value::Table(h)
            | Value::Struct(h)
            | Value::Function(h)
            | Value::Fiber(h)
            | Value::Abstract(h) => Some(*h),
            _ => None,
        }
    }

    pub fn type_of(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Real(_) => ValueType::Real,
            Value::String(_) => ValueType::String,
            Value::Symbol(_) => ValueType::Symbol,
            Value::Buffer(_) => ValueType::Buffer,
            Value::Array(_) => ValueType::Array,
            Value::Tuple(_) => ValueType::Tuple,
            Value::Table(_) => ValueType::Table,
            Value::Struct(_) => ValueType::Struct,
            Value::Function(_) => ValueType::Function,
            Value::CFunction(_) => ValueType::CFunction,
            Value::Fiber(_) => ValueType::Fiber,
            Value::Abstract(_) => ValueType::Abstract,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

/// Identity comparison: same kind and same immediate or handle. Reals are
/// compared by bit pattern so that `Value` can be a hash-map key. Content
/// equality lives in [`Heap::equals`](crate::Heap::equals).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::CFunction(a), Value::CFunction(b)) => a == b,
            _ => match (self.as_handle(), other.as_handle()) {
                (Some(a), Some(b)) => a == b && self.type_of() == other.type_of(),
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.type_of() as u8).hash(state);
        match self {
            Value::Nil => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Real(r) => r.to_bits().hash(state),
            Value::CFunction(i) => i.hash(state),
            other => other.as_handle().hash(state),
        }
    }
}
