#[cfg(test)]
mod tests {
    use crate::{Heap, Value, ValueType};
    use std::cmp::Ordering;

    #[test]
    fn test_immediate_basics() {
        let v = Value::int(123);
        assert!(v.is_int());
        assert!(!v.is_obj());
        assert_eq!(v.as_int(), Some(123));
        assert_eq!(v.as_number(), Some(123.0));

        let r = Value::real(-2.5);
        assert!(!r.is_int());
        assert!(r.is_number());
        assert_eq!(r.as_number(), Some(-2.5));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::nil().is_falsey());
        assert!(Value::bool(false).is_falsey());
        assert!(Value::bool(true).is_truthy());
        assert!(Value::int(0).is_truthy());
        assert!(Value::String(0).is_truthy());
    }

    #[test]
    fn test_handles() {
        let v = Value::String(u32::MAX);
        assert!(v.is_obj());
        assert_eq!(v.as_handle(), Some(u32::MAX));

        // cfunctions index the native registry, not an arena
        assert!(!Value::CFunction(3).is_obj());
    }

    #[test]
    fn test_identity_distinguishes_kinds() {
        assert_ne!(Value::Array(1), Value::Tuple(1));
        assert_eq!(Value::Array(1), Value::Array(1));
        assert_ne!(Value::int(1), Value::real(1.0));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::nil().type_of().name(), ":nil");
        assert_eq!(Value::real(0.5).type_of().name(), ":real");
        assert_eq!(Value::CFunction(0).type_of().name(), ":cfunction");
        assert_eq!(ValueType::Struct.to_string(), "struct");
    }

    // ====================================================================
    // Heap equality / hashing / ordering
    // ====================================================================

    #[test]
    fn test_strings_equal_by_contents() {
        let mut heap = Heap::new();
        let a = Value::String(heap.alloc_string(b"hello"));
        let b = Value::String(heap.alloc_string(b"hello"));
        let c = Value::String(heap.alloc_string(b"world"));
        assert_ne!(a, b, "distinct allocations");
        assert!(heap.equals(a, b));
        assert!(!heap.equals(a, c));
        assert_eq!(heap.hash(a), heap.hash(b));
    }

    #[test]
    fn test_symbols_are_interned() {
        let mut heap = Heap::new();
        let a = heap.intern(b"foo");
        let b = heap.intern(b"foo");
        assert_eq!(a, b);
        assert!(heap.symbol_exists(b"foo"));
        assert!(!heap.symbol_exists(b"bar"));
    }

    #[test]
    fn test_equality_is_strict_about_kind() {
        let heap = Heap::new();
        assert!(!heap.equals(Value::int(1), Value::real(1.0)));
        assert!(heap.equals(Value::real(0.0), Value::real(-0.0)));
        assert_eq!(heap.hash(Value::real(0.0)), heap.hash(Value::real(-0.0)));
        assert!(!heap.equals(Value::real(f64::NAN), Value::real(f64::NAN)));
    }

    #[test]
    fn test_tuples_equal_elementwise() {
        let mut heap = Heap::new();
        let s1 = Value::String(heap.alloc_string(b"x"));
        let s2 = Value::String(heap.alloc_string(b"x"));
        let t1 = Value::Tuple(heap.alloc_tuple(vec![Value::int(1), s1]));
        let t2 = Value::Tuple(heap.alloc_tuple(vec![Value::int(1), s2]));
        let t3 = Value::Tuple(heap.alloc_tuple(vec![Value::int(2), s2]));
        assert!(heap.equals(t1, t2));
        assert_eq!(heap.hash(t1), heap.hash(t2));
        assert!(!heap.equals(t1, t3));
    }

    #[test]
    fn test_arrays_compare_by_identity() {
        let mut heap = Heap::new();
        let a1 = Value::Array(heap.alloc_array(vec![Value::int(1)]));
        let a2 = Value::Array(heap.alloc_array(vec![Value::int(1)]));
        assert!(!heap.equals(a1, a2));
        assert!(heap.equals(a1, a1));
    }

    #[test]
    fn test_structs_equal_regardless_of_insertion_order() {
        let mut heap = Heap::new();
        let ka = Value::Symbol(heap.intern(b":a"));
        let kb = Value::Symbol(heap.intern(b":b"));
        let s1 = Value::Struct(heap.alloc_struct(&[(ka, Value::int(1)), (kb, Value::int(2))]));
        let s2 = Value::Struct(heap.alloc_struct(&[(kb, Value::int(2)), (ka, Value::int(1))]));
        assert!(heap.equals(s1, s2));
        assert_eq!(heap.hash(s1), heap.hash(s2));
        assert_eq!(heap.compare(s1, s2), Ordering::Equal);
    }

    #[test]
    fn test_struct_drops_nil_and_keeps_last_duplicate() {
        let mut heap = Heap::new();
        let ka = Value::Symbol(heap.intern(b":a"));
        let h = heap.alloc_struct(&[
            (ka, Value::int(1)),
            (Value::nil(), Value::int(5)),
            (ka, Value::int(9)),
        ]);
        assert_eq!(heap.get_struct(h).map(|s| s.dict.len()), Some(1));
        assert_eq!(heap.struct_get(h, ka), Some(Value::int(9)));
    }

    #[test]
    fn test_total_order_by_kind_then_value() {
        let mut heap = Heap::new();
        assert_eq!(heap.compare(Value::nil(), Value::bool(false)), Ordering::Less);
        assert_eq!(heap.compare(Value::int(100), Value::real(0.0)), Ordering::Less);
        assert_eq!(heap.compare(Value::int(2), Value::int(1)), Ordering::Greater);

        let a = Value::String(heap.alloc_string(b"abc"));
        let b = Value::String(heap.alloc_string(b"abd"));
        assert_eq!(heap.compare(a, b), Ordering::Less);

        let t1 = Value::Tuple(heap.alloc_tuple(vec![Value::int(1)]));
        let t2 = Value::Tuple(heap.alloc_tuple(vec![Value::int(1), Value::int(0)]));
        assert_eq!(heap.compare(t1, t2), Ordering::Less);
    }

    // ====================================================================
    // Tables
    // ====================================================================

    #[test]
    fn test_table_put_get_remove() {
        let mut heap = Heap::new();
        let t = heap.alloc_table(0);
        let key = Value::String(heap.alloc_string(b"k"));
        let same = Value::String(heap.alloc_string(b"k"));

        assert!(heap.table_put(t, key, Value::int(1)));
        assert_eq!(heap.table_get(t, same), Some(Value::int(1)));

        // nil key ignored
        assert!(heap.table_put(t, Value::nil(), Value::int(2)));
        assert_eq!(heap.get_table(t).map(|d| d.len()), Some(1));

        // nil value removes
        assert!(heap.table_put(t, same, Value::nil()));
        assert_eq!(heap.table_get(t, key), None);
        assert_eq!(heap.get_table(t).map(|d| d.len()), Some(0));
    }

    #[test]
    fn test_table_next_visits_each_key_once() {
        let mut heap = Heap::new();
        let t = heap.alloc_table(0);
        for i in 0..50 {
            heap.table_put(t, Value::int(i), Value::int(i * i));
        }
        let mut seen = Vec::new();
        let mut key = heap.table_next(t, Value::nil());
        while let Some(k) = key {
            seen.push(k.as_int().unwrap());
            key = heap.table_next(t, k);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_table_next_unknown_key_is_none() {
        let mut heap = Heap::new();
        let t = heap.alloc_table(4);
        heap.table_put(t, Value::int(1), Value::int(1));
        assert_eq!(heap.table_next(t, Value::int(42)), None);
    }
}
