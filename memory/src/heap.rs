use crate::dict::Dict;
use crate::fiber::Fiber;
use crate::Value;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Default number of bytes allocated between two collections.
pub const DEFAULT_GC_INTERVAL: usize = 0x10000;

/// Function definition flags: a built-in identifier in the low 16 bits and
/// the VARARG bit above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FuncFlags(pub u32);

impl FuncFlags {
    pub const VARARG: u32 = 1 << 16;
    pub const BUILTIN_MASK: u32 = 0xFFFF;

    pub fn new(builtin: u16, vararg: bool) -> Self {
        let mut bits = builtin as u32;
        if vararg {
            bits |= Self::VARARG;
        }
        FuncFlags(bits)
    }

    #[inline]
    pub fn is_vararg(self) -> bool {
        self.0 & Self::VARARG != 0
    }

    #[inline]
    pub fn builtin(self) -> u16 {
        (self.0 & Self::BUILTIN_MASK) as u16
    }
}

/// Immutable function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub arity: u32,
    pub flags: FuncFlags,
    pub slot_count: u32,
    pub bytecode: Vec<u32>,
    pub constants: Vec<Value>,
}

/// Callable function value wrapping a shared definition.
#[derive(Debug, Clone)]
pub struct Function {
    pub def: Rc<FuncDef>,
}

#[derive(Debug, Clone)]
pub struct Tuple {
    pub items: Box<[Value]>,
    pub hash: i32,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub dict: Dict,
    pub hash: i32,
}

/// Type descriptor shared by every abstract value of one kind.
#[derive(Debug)]
pub struct AbstractType {
    pub name: &'static str,
}

/// Opaque host data tagged with its type descriptor.
pub struct AbstractObj {
    pub ty: &'static AbstractType,
    pub data: Box<dyn Any>,
}

impl fmt::Debug for AbstractObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractObj")
            .field("ty", &self.ty.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    pub data: Vec<Option<T>>,
    pub free_indices: Vec<u32>,
    pub marked: HashSet<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            free_indices: Vec::new(),
            marked: HashSet::new(),
        }
    }

    pub fn alloc(&mut self, item: T) -> u32 {
        if let Some(idx) = self.free_indices.pop() {
            self.data[idx as usize] = Some(item);
            idx
        } else {
            let index = self.data.len() as u32;
            self.data.push(Some(item));
            index
        }
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&T> {
        self.data.get(index as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.data.get_mut(index as usize)?.as_mut()
    }

    pub fn is_free(&self, index: u32) -> bool {
        matches!(self.data.get(index as usize), Some(None))
    }

    pub fn is_marked(&self, index: u32) -> bool {
        self.marked.contains(&index)
    }

    /// Mark a live slot. Returns true only the first time, so the caller
    /// knows to trace its children.
    pub fn mark(&mut self, index: u32) -> bool {
        if self.get(index).is_none() {
            return false;
        }
        self.marked.insert(index)
    }

    pub fn live(&self) -> usize {
        self.data.iter().filter(|d| d.is_some()).count()
    }

    /// Free every unmarked slot, handing the dropped item to `on_free`, and
    /// clear the mark set. Returns the number of freed slots.
    pub fn sweep<F: FnMut(u32, T)>(&mut self, mut on_free: F) -> usize {
        let mut freed = 0;
        for i in 0..self.data.len() {
            let idx = i as u32;
            if self.data[i].is_some() && !self.marked.contains(&idx) {
                if let Some(item) = self.data[i].take() {
                    on_free(idx, item);
                }
                self.free_indices.push(idx);
                freed += 1;
            }
        }
        self.marked.clear();
        freed
    }
}

pub struct Heap {
    // Typed Arenas
    pub strings: Arena<Box<[u8]>>,
    pub symbols: Arena<Box<[u8]>>,
    pub buffers: Arena<Vec<u8>>,
    pub arrays: Arena<Vec<Value>>,
    pub tuples: Arena<Tuple>,
    pub tables: Arena<Dict>,
    pub structs: Arena<Struct>,
    pub functions: Arena<Function>,
    pub fibers: Arena<Fiber>,
    pub abstracts: Arena<AbstractObj>,

    /// Interned symbol contents -> symbol handle
    symbol_index: HashMap<Box<[u8]>, u32>,

    // GC Metrics
    pub bytes_allocated: usize,
    pub gc_interval: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            strings: Arena::new(),
            symbols: Arena::new(),
            buffers: Arena::new(),
            arrays: Arena::new(),
            tuples: Arena::new(),
            tables: Arena::new(),
            structs: Arena::new(),
            functions: Arena::new(),
            fibers: Arena::new(),
            abstracts: Arena::new(),
            symbol_index: HashMap::new(),
            bytes_allocated: 0,
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }

    #[inline]
    fn note_alloc(&mut self, bytes: usize) {
        self.bytes_allocated = self.bytes_allocated.saturating_add(bytes);
    }

    /// True once the bytes allocated since the last sweep reach the interval.
    pub fn should_collect(&self) -> bool {
        self.bytes_allocated >= self.gc_interval
    }

    // --- Byte sequences ---

    pub fn alloc_string(&mut self, s: &[u8]) -> u32 {
        self.note_alloc(s.len() + 16);
        self.strings.alloc(s.into())
    }

    pub fn get_string(&self, index: u32) -> Option<&[u8]> {
        self.strings.get(index).map(|s| &s[..])
    }

    /// Intern a symbol: equal contents always yield the same handle while
    /// the symbol is alive.
    pub fn intern(&mut self, s: &[u8]) -> u32 {
        if let Some(&h) = self.symbol_index.get(s) {
            return h;
        }
        self.note_alloc(s.len() * 2 + 32);
        let h = self.symbols.alloc(s.into());
        self.symbol_index.insert(s.into(), h);
        h
    }

    pub fn get_symbol(&self, index: u32) -> Option<&[u8]> {
        self.symbols.get(index).map(|s| &s[..])
    }

    /// True if a live symbol with these contents exists.
    pub fn symbol_exists(&self, s: &[u8]) -> bool {
        self.symbol_index.contains_key(s)
    }

    /// Handle of a live symbol without interning a new one.
    pub fn find_symbol(&self, s: &[u8]) -> Option<u32> {
        self.symbol_index.get(s).copied()
    }

    pub fn alloc_buffer(&mut self, b: Vec<u8>) -> u32 {
        self.note_alloc(b.capacity() + 16);
        self.buffers.alloc(b)
    }

    pub fn get_buffer(&self, index: u32) -> Option<&Vec<u8>> {
        self.buffers.get(index)
    }

    pub fn get_buffer_mut(&mut self, index: u32) -> Option<&mut Vec<u8>> {
        self.buffers.get_mut(index)
    }

    /// Contents of a string, symbol or buffer.
    pub fn bytes(&self, v: Value) -> Option<&[u8]> {
        match v {
            Value::String(h) => self.get_string(h),
            Value::Symbol(h) => self.get_symbol(h),
            Value::Buffer(h) => self.get_buffer(h).map(|b| &b[..]),
            _ => None,
        }
    }

    // --- Sequences ---

    pub fn alloc_array(&mut self, items: Vec<Value>) -> u32 {
        self.note_alloc(items.capacity() * std::mem::size_of::<Value>() + 24);
        self.arrays.alloc(items)
    }

    pub fn get_array(&self, index: u32) -> Option<&Vec<Value>> {
        self.arrays.get(index)
    }

    pub fn get_array_mut(&mut self, index: u32) -> Option<&mut Vec<Value>> {
        self.arrays.get_mut(index)
    }

    pub fn alloc_tuple(&mut self, items: Vec<Value>) -> u32 {
        let hash = self.hash_items(&items);
        self.note_alloc(items.len() * std::mem::size_of::<Value>() + 24);
        self.tuples.alloc(Tuple {
            items: items.into_boxed_slice(),
            hash,
        })
    }

    pub fn get_tuple(&self, index: u32) -> Option<&Tuple> {
        self.tuples.get(index)
    }

    /// Items of an array or tuple.
    pub fn sequence(&self, v: Value) -> Option<&[Value]> {
        match v {
            Value::Array(h) => self.get_array(h).map(|a| &a[..]),
            Value::Tuple(h) => self.get_tuple(h).map(|t| &t.items[..]),
            _ => None,
        }
    }

    // --- Tables ---

    pub fn alloc_table(&mut self, capacity: usize) -> u32 {
        let dict = Dict::with_capacity(capacity);
        self.note_alloc(dict.byte_size() + 32);
        self.tables.alloc(dict)
    }

    pub fn get_table(&self, index: u32) -> Option<&Dict> {
        self.tables.get(index)
    }

    /// Value bound to `key`, or `None` when absent.
    pub fn table_get(&self, table: u32, key: Value) -> Option<Value> {
        let dict = self.tables.get(table)?;
        self.dict_get(dict, key)
    }

    /// Bind `key` to `value`. A nil key is ignored; a nil value removes the
    /// binding. Returns false for a dangling handle.
    pub fn table_put(&mut self, table: u32, key: Value, value: Value) -> bool {
        if self.tables.get(table).is_none() {
            return false;
        }
        if key.is_nil() {
            return true;
        }
        let hash = self.hash(key);
        if value.is_nil() {
            let found = match self.tables.get(table) {
                Some(dict) => dict.find(hash, |k| self.equals(k, key)),
                None => return false,
            };
            if let (Ok(idx), Some(dict)) = (found, self.tables.get_mut(table)) {
                dict.remove_at(idx);
            }
            return true;
        }

        let before = self.tables.get(table).map_or(0, Dict::capacity);
        if let Some(dict) = self.tables.get_mut(table) {
            dict.reserve_one();
        }
        let found = match self.tables.get(table) {
            Some(dict) => dict.find(hash, |k| self.equals(k, key)),
            None => return false,
        };
        let Some(dict) = self.tables.get_mut(table) else {
            return false;
        };
        let grown = dict.capacity().saturating_sub(before);
        match found {
            Ok(idx) | Err(Some(idx)) => dict.set_at(idx, key, value, hash),
            Err(None) => return false,
        }
        self.note_alloc(grown * std::mem::size_of::<crate::dict::Slot>());
        true
    }

    /// Key following `key` in slot order; `nil` starts the walk.
    pub fn table_next(&self, table: u32, key: Value) -> Option<Value> {
        let dict = self.tables.get(table)?;
        self.dict_next(dict, key)
    }

    // --- Structs ---

    /// Build an immutable struct. Later duplicates win; entries with a nil
    /// key or nil value are dropped.
    pub fn alloc_struct(&mut self, pairs: &[(Value, Value)]) -> u32 {
        let mut dict = Dict::with_capacity(pairs.len());
        for &(key, value) in pairs {
            if key.is_nil() || value.is_nil() {
                continue;
            }
            let hash = self.hash(key);
            dict.reserve_one();
            match dict.find(hash, |k| self.equals(k, key)) {
                Ok(idx) | Err(Some(idx)) => dict.set_at(idx, key, value, hash),
                Err(None) => {}
            }
        }
        let hash = dict.iter_hashed().fold(0i32, |acc, (_, v, hk)| {
            acc.wrapping_add(hk.wrapping_mul(31) ^ self.hash(v))
        });
        self.note_alloc(dict.byte_size() + 32);
        self.structs.alloc(Struct { dict, hash })
    }

    pub fn get_struct(&self, index: u32) -> Option<&Struct> {
        self.structs.get(index)
    }

    pub fn struct_get(&self, index: u32, key: Value) -> Option<Value> {
        let st = self.structs.get(index)?;
        self.dict_get(&st.dict, key)
    }

    pub fn struct_next(&self, index: u32, key: Value) -> Option<Value> {
        let st = self.structs.get(index)?;
        self.dict_next(&st.dict, key)
    }

    fn dict_get(&self, dict: &Dict, key: Value) -> Option<Value> {
        if key.is_nil() {
            return None;
        }
        let hash = self.hash(key);
        let idx = dict.find(hash, |k| self.equals(k, key)).ok()?;
        dict.entry_at(idx).map(|(_, v)| v)
    }

    fn dict_next(&self, dict: &Dict, key: Value) -> Option<Value> {
        let start = if key.is_nil() {
            0
        } else {
            let hash = self.hash(key);
            dict.find(hash, |k| self.equals(k, key)).ok()? + 1
        };
        let idx = dict.next_index(start)?;
        dict.entry_at(idx).map(|(k, _)| k)
    }

    // --- Functions, fibers, abstracts ---

    pub fn alloc_function(&mut self, def: FuncDef) -> u32 {
        self.note_alloc(
            def.bytecode.len() * 4 + def.constants.len() * std::mem::size_of::<Value>() + 64,
        );
        self.functions.alloc(Function { def: Rc::new(def) })
    }

    pub fn get_function(&self, index: u32) -> Option<&Function> {
        self.functions.get(index)
    }

    pub fn alloc_fiber(&mut self, fiber: Fiber) -> u32 {
        self.note_alloc(fiber.byte_size() + 64);
        self.fibers.alloc(fiber)
    }

    pub fn get_fiber(&self, index: u32) -> Option<&Fiber> {
        self.fibers.get(index)
    }

    /// Move a fiber out of its slot, leaving an `:alive` placeholder.
    pub fn take_fiber(&mut self, index: u32) -> Option<Fiber> {
        let slot = self.fibers.get_mut(index)?;
        Some(std::mem::replace(slot, Fiber::placeholder()))
    }

    /// Put a fiber taken with [`Heap::take_fiber`] back into its slot.
    pub fn restore_fiber(&mut self, index: u32, fiber: Fiber) {
        if let Some(slot) = self.fibers.get_mut(index) {
            *slot = fiber;
        }
    }

    pub fn alloc_abstract(&mut self, ty: &'static AbstractType, data: Box<dyn Any>) -> u32 {
        self.note_alloc(std::mem::size_of_val(&*data) + 32);
        self.abstracts.alloc(AbstractObj { ty, data })
    }

    pub fn get_abstract(&self, index: u32) -> Option<&AbstractObj> {
        self.abstracts.get(index)
    }

    pub fn get_abstract_mut(&mut self, index: u32) -> Option<&mut AbstractObj> {
        self.abstracts.get_mut(index)
    }

    // --- Equality, hashing, ordering ---

    /// Strict equality: same kind, then by value for immediates, by
    /// contents for strings, symbols, tuples and structs, and by identity
    /// for everything else.
    pub fn equals(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Real(x), Value::Real(y)) => x == y,
            (Value::String(x), Value::String(y)) => {
                x == y || self.get_string(x) == self.get_string(y)
            }
            (Value::Tuple(x), Value::Tuple(y)) => {
                if x == y {
                    return true;
                }
                let (Some(tx), Some(ty)) = (self.get_tuple(x), self.get_tuple(y)) else {
                    return false;
                };
                tx.hash == ty.hash
                    && tx.items.len() == ty.items.len()
                    && tx
                        .items
                        .iter()
                        .zip(ty.items.iter())
                        .all(|(&p, &q)| self.equals(p, q))
            }
            (Value::Struct(x), Value::Struct(y)) => {
                if x == y {
                    return true;
                }
                let (Some(sx), Some(sy)) = (self.get_struct(x), self.get_struct(y)) else {
                    return false;
                };
                sx.hash == sy.hash
                    && sx.dict.len() == sy.dict.len()
                    && sx.dict.iter().all(|(k, v)| {
                        self.dict_get(&sy.dict, k)
                            .is_some_and(|other| self.equals(v, other))
                    })
            }
            _ => a == b,
        }
    }

    /// Integer hash consistent with [`Heap::equals`].
    pub fn hash(&self, v: Value) -> i32 {
        match v {
            Value::Nil => 0,
            Value::Boolean(b) => 1 + b as i32,
            Value::Integer(i) => i,
            Value::Real(r) => {
                let r = if r == 0.0 { 0.0 } else { r };
                let bits = r.to_bits();
                (bits ^ (bits >> 32)) as i32
            }
            Value::String(h) => djb2(self.get_string(h).unwrap_or_default()),
            Value::Symbol(h) => djb2(self.get_symbol(h).unwrap_or_default()),
            Value::Tuple(h) => self.get_tuple(h).map_or(0, |t| t.hash),
            Value::Struct(h) => self.get_struct(h).map_or(0, |s| s.hash),
            Value::CFunction(i) => mix(v.type_of() as u32, i),
            Value::Abstract(h) => {
                let ty = self
                    .get_abstract(h)
                    .map_or(0, |a| a.ty as *const AbstractType as usize);
                mix(ty as u32, h)
            }
            other => mix(other.type_of() as u32, other.as_handle().unwrap_or_default()),
        }
    }

    fn hash_items(&self, items: &[Value]) -> i32 {
        items.iter().fold(items.len() as i32, |acc, &item| {
            acc.wrapping_mul(31).wrapping_add(self.hash(item))
        })
    }

    /// Total order over all values: by kind first, then within the kind.
    pub fn compare(&self, a: Value, b: Value) -> Ordering {
        let (ta, tb) = (a.type_of(), b.type_of());
        if ta != tb {
            return ta.cmp(&tb);
        }
        match (a, b) {
            (Value::Nil, Value::Nil) => Ordering::Equal,
            (Value::Boolean(x), Value::Boolean(y)) => x.cmp(&y),
            (Value::Integer(x), Value::Integer(y)) => x.cmp(&y),
            (Value::Real(x), Value::Real(y)) => x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y)),
            (Value::String(_), Value::String(_)) | (Value::Symbol(_), Value::Symbol(_)) => {
                self.bytes(a).cmp(&self.bytes(b))
            }
            (Value::Tuple(x), Value::Tuple(y)) => {
                let (Some(tx), Some(ty)) = (self.get_tuple(x), self.get_tuple(y)) else {
                    return x.cmp(&y);
                };
                for (&p, &q) in tx.items.iter().zip(ty.items.iter()) {
                    match self.compare(p, q) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                tx.items.len().cmp(&ty.items.len())
            }
            (Value::Struct(x), Value::Struct(y)) => {
                if self.equals(a, b) {
                    return Ordering::Equal;
                }
                let (Some(sx), Some(sy)) = (self.get_struct(x), self.get_struct(y)) else {
                    return x.cmp(&y);
                };
                sx.dict
                    .len()
                    .cmp(&sy.dict.len())
                    .then(sx.hash.cmp(&sy.hash))
                    .then_with(|| {
                        for ((k1, v1), (k2, v2)) in sx.dict.iter().zip(sy.dict.iter()) {
                            let ord = self.compare(k1, k2).then_with(|| self.compare(v1, v2));
                            if ord != Ordering::Equal {
                                return ord;
                            }
                        }
                        x.cmp(&y)
                    })
            }
            (Value::CFunction(x), Value::CFunction(y)) => x.cmp(&y),
            _ => a.as_handle().cmp(&b.as_handle()),
        }
    }

    // --- Tracing (Mark Phase) ---

    pub fn trace(&mut self, roots: Vec<Value>) {
        let mut worklist = roots;

        while let Some(val) = worklist.pop() {
            match val {
                Value::String(h) => {
                    self.strings.mark(h);
                }
                Value::Symbol(h) => {
                    self.symbols.mark(h);
                }
                Value::Buffer(h) => {
                    self.buffers.mark(h);
                }
                Value::Abstract(h) => {
                    self.abstracts.mark(h);
                }
                Value::Array(h) => {
                    if self.arrays.mark(h) {
                        if let Some(items) = self.arrays.get(h) {
                            worklist.extend(items.iter().copied());
                        }
                    }
                }
                Value::Tuple(h) => {
                    if self.tuples.mark(h) {
                        if let Some(t) = self.tuples.get(h) {
                            worklist.extend(t.items.iter().copied());
                        }
                    }
                }
                Value::Table(h) => {
                    if self.tables.mark(h) {
                        if let Some(d) = self.tables.get(h) {
                            worklist.extend(d.iter().flat_map(|(k, v)| [k, v]));
                        }
                    }
                }
                Value::Struct(h) => {
                    if self.structs.mark(h) {
                        if let Some(s) = self.structs.get(h) {
                            worklist.extend(s.dict.iter().flat_map(|(k, v)| [k, v]));
                        }
                    }
                }
                Value::Function(h) => {
                    if self.functions.mark(h) {
                        if let Some(f) = self.functions.get(h) {
                            worklist.extend(f.def.constants.iter().copied());
                        }
                    }
                }
                Value::Fiber(h) => {
                    if self.fibers.mark(h) {
                        if let Some(f) = self.fibers.get(h) {
                            worklist.extend(f.children());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // --- Sweep Phase ---

    pub fn sweep(&mut self) {
        let mut freed = 0;
        freed += self.strings.sweep(|_, _| {});
        let index = &mut self.symbol_index;
        freed += self.symbols.sweep(|_, s| {
            index.remove(&s);
        });
        freed += self.buffers.sweep(|_, _| {});
        freed += self.arrays.sweep(|_, _| {});
        freed += self.tuples.sweep(|_, _| {});
        freed += self.tables.sweep(|_, _| {});
        freed += self.structs.sweep(|_, _| {});
        freed += self.functions.sweep(|_, _| {});
        freed += self.fibers.sweep(|_, _| {});
        freed += self.abstracts.sweep(|_, _| {});

        debug!(
            freed,
            reclaimed_bytes = self.bytes_allocated,
            "heap sweep complete"
        );
        self.bytes_allocated = 0;
    }
}

fn djb2(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .fold(5381u32, |h, &c| h.wrapping_mul(33).wrapping_add(c as u32)) as i32
}

fn mix(tag: u32, handle: u32) -> i32 {
    (tag.wrapping_mul(0x9E37_79B1) ^ handle.wrapping_mul(0x85EB_CA6B)) as i32
}
