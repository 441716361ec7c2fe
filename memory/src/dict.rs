//! Open-addressed slot array backing tables and structs.
//!
//! Each occupied slot stores the key's hash next to the key, so the array can
//! grow and rehash without going back to the heap. Key equality is supplied by
//! the caller (see [`Heap::equals`](crate::Heap::equals)), which keeps this
//! type independent of how strings and tuples are stored.
//!
//! Iteration walks slots in index order. The order is stable for as long as
//! the container is not mutated.

use crate::Value;

const MIN_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Slot {
    #[default]
    Empty,
    Tombstone,
    Occupied {
        key: Value,
        value: Value,
        hash: i32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Dict {
    slots: Vec<Slot>,
    count: usize,
    deleted: usize,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary able to hold `n` entries without growing.
    pub fn with_capacity(n: usize) -> Self {
        let mut d = Self::new();
        if n > 0 {
            d.slots = vec![Slot::Empty; (n * 2).next_power_of_two().max(MIN_CAPACITY)];
        }
        d
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Probe for a key with the given hash.
    ///
    /// Returns `Ok(index)` of the matching slot, or `Err(index)` of the slot
    /// where the key would be inserted (the first tombstone seen, else the
    /// terminating empty slot). `Err(None)` only happens on a dictionary that
    /// has never been sized.
    pub fn find<F>(&self, hash: i32, mut eq: F) -> Result<usize, Option<usize>>
    where
        F: FnMut(Value) -> bool,
    {
        let cap = self.slots.len();
        if cap == 0 {
            return Err(None);
        }
        let mask = cap - 1;
        let mut idx = (hash as u32 as usize) & mask;
        let mut first_tombstone = None;
        for _ in 0..cap {
            match self.slots[idx] {
                Slot::Empty => return Err(Some(first_tombstone.unwrap_or(idx))),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(idx);
                    }
                }
                Slot::Occupied { key, hash: h, .. } => {
                    if h == hash && eq(key) {
                        return Ok(idx);
                    }
                }
            }
            idx = (idx + 1) & mask;
        }
        Err(first_tombstone)
    }

    /// Make room for one more entry, rehashing if the load factor would pass
    /// one half. Must be called before [`Dict::find`] when inserting.
    pub fn reserve_one(&mut self) {
        if (self.count + self.deleted + 1) * 2 > self.slots.len() {
            let new_cap = ((self.count + 1) * 4).next_power_of_two().max(MIN_CAPACITY);
            self.rehash(new_cap);
        }
    }

    fn rehash(&mut self, new_cap: usize) {
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_cap]);
        let mask = new_cap - 1;
        self.deleted = 0;
        for slot in old {
            if let Slot::Occupied { hash, .. } = slot {
                let mut idx = (hash as u32 as usize) & mask;
                while !matches!(self.slots[idx], Slot::Empty) {
                    idx = (idx + 1) & mask;
                }
                self.slots[idx] = slot;
            }
        }
    }

    /// Write an entry at a slot previously returned by [`Dict::find`].
    pub fn set_at(&mut self, idx: usize, key: Value, value: Value, hash: i32) {
        match self.slots[idx] {
            Slot::Occupied { .. } => {}
            Slot::Tombstone => {
                self.deleted -= 1;
                self.count += 1;
            }
            Slot::Empty => self.count += 1,
        }
        self.slots[idx] = Slot::Occupied { key, value, hash };
    }

    pub fn remove_at(&mut self, idx: usize) {
        if let Slot::Occupied { .. } = self.slots[idx] {
            self.slots[idx] = Slot::Tombstone;
            self.count -= 1;
            self.deleted += 1;
        }
    }

    /// Key and value stored at `idx`, if occupied.
    pub fn entry_at(&self, idx: usize) -> Option<(Value, Value)> {
        match self.slots.get(idx)? {
            Slot::Occupied { key, value, .. } => Some((*key, *value)),
            _ => None,
        }
    }

    /// Index of the first occupied slot at or after `from`.
    pub fn next_index(&self, from: usize) -> Option<usize> {
        (from..self.slots.len()).find(|&i| matches!(self.slots[i], Slot::Occupied { .. }))
    }

    /// Occupied entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.slots.iter().filter_map(|s| match s {
            Slot::Occupied { key, value, .. } => Some((*key, *value)),
            _ => None,
        })
    }

    /// Occupied entries with their cached hashes.
    pub fn iter_hashed(&self) -> impl Iterator<Item = (Value, Value, i32)> + '_ {
        self.slots.iter().filter_map(|s| match s {
            Slot::Occupied { key, value, hash } => Some((*key, *value, *hash)),
            _ => None,
        })
    }

    /// Approximate heap footprint for GC accounting.
    pub fn byte_size(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Slot>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(d: &mut Dict, k: i32, v: i32) {
        d.reserve_one();
        let key = Value::int(k);
        match d.find(k, |x| x == key) {
            Ok(i) | Err(Some(i)) => d.set_at(i, key, Value::int(v), k),
            Err(None) => panic!("dict not sized"),
        }
    }

    fn get(d: &Dict, k: i32) -> Option<Value> {
        let key = Value::int(k);
        d.find(k, |x| x == key).ok().and_then(|i| d.entry_at(i)).map(|(_, v)| v)
    }

    #[test]
    fn test_empty_dict_find() {
        let d = Dict::new();
        assert_eq!(d.find(0, |_| true), Err(None));
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn test_insert_and_grow() {
        let mut d = Dict::new();
        for i in 0..100 {
            put(&mut d, i, i * 10);
        }
        assert_eq!(d.len(), 100);
        assert!(d.capacity() >= 200);
        for i in 0..100 {
            assert_eq!(get(&d, i), Some(Value::int(i * 10)));
        }
    }

    #[test]
    fn test_overwrite_keeps_count() {
        let mut d = Dict::new();
        put(&mut d, 1, 1);
        put(&mut d, 1, 2);
        assert_eq!(d.len(), 1);
        assert_eq!(get(&d, 1), Some(Value::int(2)));
    }

    #[test]
    fn test_remove_leaves_tombstone_probe_chain_intact() {
        let mut d = Dict::with_capacity(4);
        // Same hash bucket forces a probe chain
        let cap = d.capacity() as i32;
        put(&mut d, 1, 1);
        put(&mut d, 1 + cap, 2);
        let key = Value::int(1);
        let idx = d.find(1, |x| x == key).unwrap();
        d.remove_at(idx);
        assert_eq!(d.len(), 1);
        assert_eq!(get(&d, 1 + cap), Some(Value::int(2)));
        assert_eq!(get(&d, 1), None);
    }

    #[test]
    fn test_next_index_walks_all_entries() {
        let mut d = Dict::new();
        for i in 0..10 {
            put(&mut d, i, i);
        }
        let mut seen = 0;
        let mut cursor = d.next_index(0);
        while let Some(i) = cursor {
            seen += 1;
            cursor = d.next_index(i + 1);
        }
        assert_eq!(seen, 10);
    }
}
