//! Root environment: a table from symbol to binding struct.
//!
//! Each binding is an immutable struct `{:value v :doc "..."}`; `:doc` is
//! absent for bindings registered without documentation. Redefining a name
//! replaces its binding.

use crate::machine::VM;
use memory::Value;

pub const KEY_VALUE: &str = ":value";
pub const KEY_DOC: &str = ":doc";

/// Initial slot capacity of the root table.
const ROOT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    table: u32,
}

/// A resolved binding, copied out of the heap.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub doc: Option<String>,
}

impl Environment {
    pub fn new(vm: &mut VM) -> Self {
        Self {
            table: vm.heap.alloc_table(ROOT_CAPACITY),
        }
    }

    /// Wrap an existing table, e.g. the one a native module receives.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Table(table) => Some(Self { table }),
            _ => None,
        }
    }

    pub fn value(&self) -> Value {
        Value::Table(self.table)
    }

    pub fn def(&self, vm: &mut VM, name: &str, value: Value, doc: Option<&str>) {
        let key = vm.symbol_value(name);
        let mut pairs = vec![(vm.symbol_value(KEY_VALUE), value)];
        if let Some(doc) = doc {
            let doc_key = vm.symbol_value(KEY_DOC);
            pairs.push((doc_key, vm.string_value(doc)));
        }
        let binding = Value::Struct(vm.heap.alloc_struct(&pairs));
        vm.heap.table_put(self.table, key, binding);
    }

    pub fn lookup(&self, vm: &VM, name: &str) -> Option<Binding> {
        let sym = vm.heap.find_symbol(name.as_bytes())?;
        let entry = match vm.heap.table_get(self.table, Value::Symbol(sym))? {
            Value::Struct(h) => h,
            _ => return None,
        };
        let field = |key: &str| {
            vm.heap
                .find_symbol(key.as_bytes())
                .and_then(|k| vm.heap.struct_get(entry, Value::Symbol(k)))
        };
        let value = field(KEY_VALUE).unwrap_or_default();
        let doc = field(KEY_DOC)
            .and_then(|d| vm.heap.bytes(d))
            .map(|b| String::from_utf8_lossy(b).into_owned());
        Some(Binding { value, doc })
    }

    /// Bound value, or `None` when `name` is unbound.
    pub fn get(&self, vm: &VM, name: &str) -> Option<Value> {
        self.lookup(vm, name).map(|b| b.value)
    }

    pub fn doc(&self, vm: &VM, name: &str) -> Option<String> {
        self.lookup(vm, name).and_then(|b| b.doc)
    }

    /// Every bound name, sorted.
    pub fn names(&self, vm: &VM) -> Vec<String> {
        let mut names = Vec::new();
        let mut key = vm.heap.table_next(self.table, Value::Nil);
        while let Some(k) = key.filter(|k| !k.is_nil()) {
            if let Some(bytes) = vm.heap.bytes(k) {
                names.push(String::from_utf8_lossy(bytes).into_owned());
            }
            key = vm.heap.table_next(self.table, k);
        }
        names.sort();
        names
    }

    pub fn len(&self, vm: &VM) -> usize {
        vm.heap.get_table(self.table).map_or(0, |d| d.len())
    }

    pub fn is_empty(&self, vm: &VM) -> bool {
        self.len(vm) == 0
    }
}
