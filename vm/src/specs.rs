use crate::native::NativeFn;
use crate::stdlib::core::*;

pub struct NativeMeta {
    pub name: &'static str,
    pub func: NativeFn,
    pub arity: isize,
    pub doc: &'static str,
}

// The primitive library, registered into the root environment in this
// order. Arity -1 marks a variadic native.
pub const CORE_NATIVES: &[NativeMeta] = &[
    NativeMeta {
        name: "native",
        func: native_native,
        arity: 1,
        doc: "(native path)\n\n\
              Load the native module at path and return its entry point as a \
              cfunction. Calling the entry point with an environment table \
              populates it with the module's bindings.",
    },
    NativeMeta {
        name: "print",
        func: native_print,
        arity: -1,
        doc: "(print & xs)\n\n\
              Write the concatenated string forms of xs followed by a newline \
              to the output. Returns nil.",
    },
    NativeMeta {
        name: "describe",
        func: native_describe,
        arity: -1,
        doc: "(describe & xs)\n\n\
              Return a new string of the concatenated human readable \
              descriptions of xs.",
    },
    NativeMeta {
        name: "string",
        func: native_string,
        arity: -1,
        doc: "(string & xs)\n\n\
              Return a new string of the concatenated string forms of xs.",
    },
    NativeMeta {
        name: "symbol",
        func: native_symbol,
        arity: -1,
        doc: "(symbol & xs)\n\n\
              Return the symbol named by the concatenated string forms of xs.",
    },
    NativeMeta {
        name: "buffer",
        func: native_buffer,
        arity: -1,
        doc: "(buffer & xs)\n\n\
              Return a new mutable buffer holding the concatenated string \
              forms of xs.",
    },
    NativeMeta {
        name: "table",
        func: native_table,
        arity: -1,
        doc: "(table & kvs)\n\n\
              Create a mutable table from alternating keys and values. Later \
              keys overwrite earlier duplicates. An odd number of arguments \
              is an error.",
    },
    NativeMeta {
        name: "array",
        func: native_array,
        arity: -1,
        doc: "(array & items)\n\n\
              Create a mutable array holding items in order.",
    },
    NativeMeta {
        name: "tuple",
        func: native_tuple,
        arity: -1,
        doc: "(tuple & items)\n\n\
              Create an immutable tuple holding items in order.",
    },
    NativeMeta {
        name: "struct",
        func: native_struct,
        arity: -1,
        doc: "(struct & kvs)\n\n\
              Create an immutable struct from alternating keys and values. \
              Later keys overwrite earlier duplicates. An odd number of \
              arguments is an error.",
    },
    NativeMeta {
        name: "scan-number",
        func: native_scan_number,
        arity: 1,
        doc: "(scan-number str)\n\n\
              Parse str with the numeric literal grammar. Returns an integer \
              or real, or nil when str is not a number.",
    },
    NativeMeta {
        name: "scan-integer",
        func: native_scan_integer,
        arity: 1,
        doc: "(scan-integer str)\n\n\
              Parse str as an integer literal. Returns nil for reals, \
              out of range integers and malformed text.",
    },
    NativeMeta {
        name: "scan-real",
        func: native_scan_real,
        arity: 1,
        doc: "(scan-real str)\n\n\
              Parse str with the numeric literal grammar and return it as a \
              real, or nil when str is not a number.",
    },
    NativeMeta {
        name: "gensym",
        func: native_gensym,
        arity: 0,
        doc: "(gensym)\n\n\
              Return a fresh symbol that collides with no live symbol. Used \
              for hygiene in macros.",
    },
    NativeMeta {
        name: "gccollect",
        func: native_gccollect,
        arity: 0,
        doc: "(gccollect)\n\n\
              Run a full garbage collection cycle now. Returns nil.",
    },
    NativeMeta {
        name: "gcinterval",
        func: native_gcinterval,
        arity: 0,
        doc: "(gcinterval)\n\n\
              Return the number of bytes allocated between automatic \
              collections.",
    },
    NativeMeta {
        name: "gcsetinterval",
        func: native_gcsetinterval,
        arity: 1,
        doc: "(gcsetinterval interval)\n\n\
              Set the number of bytes allocated between automatic \
              collections. A negative interval is an error. Returns nil.",
    },
    NativeMeta {
        name: "type",
        func: native_type,
        arity: 1,
        doc: "(type x)\n\n\
              Return a symbol naming the type of x: :nil :boolean :integer \
              :real :string :symbol :array :tuple :table :struct :buffer \
              :function :cfunction or :fiber. Abstract values report the \
              name of their abstract type.",
    },
    NativeMeta {
        name: "next",
        func: native_next,
        arity: 2,
        doc: "(next dict key)\n\n\
              Return the key after key in a table or struct, the first key \
              when key is nil, and nil when the walk is exhausted. The order \
              is stable only while dict is not mutated.",
    },
    NativeMeta {
        name: "hash",
        func: native_hash,
        arity: 1,
        doc: "(hash x)\n\n\
              Return an integer hash of x. Equal values hash equally.",
    },
];

// Expected native count — update this when adding/removing natives.
pub const NATIVE_COUNT: usize = 20;
const _: () = assert!(
    CORE_NATIVES.len() == NATIVE_COUNT,
    "CORE_NATIVES length changed, update NATIVE_COUNT"
);
