//! Byte renderings of values: the raw `to-string` form used by `print`,
//! `string`, `symbol` and `buffer`, and the readable `describe` form.

use memory::Value;

use super::native::NativeRegistry;

impl super::vm::VM {
    /// Strings, symbols and buffers contribute their bytes unchanged;
    /// everything else falls back to the describe form.
    pub fn to_string_bytes(&self, val: Value, out: &mut Vec<u8>) {
        match self.heap.bytes(val) {
            Some(bytes) => out.extend_from_slice(bytes),
            None => self.describe_bytes(val, out),
        }
    }

    pub fn describe_bytes(&self, val: Value, out: &mut Vec<u8>) {
        match val {
            Value::Nil => out.extend_from_slice(b"nil"),
            Value::Boolean(b) => out.extend_from_slice(if b { b"true" } else { b"false" }),
            Value::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Value::Real(r) => write_real(r, out),
            Value::String(h) => {
                out.push(b'"');
                escape_into(self.heap.get_string(h).unwrap_or_default(), out);
                out.push(b'"');
            }
            Value::Symbol(h) => out.extend_from_slice(self.heap.get_symbol(h).unwrap_or_default()),
            Value::Buffer(h) => {
                out.extend_from_slice(b"@\"");
                escape_into(self.heap.get_buffer(h).map_or(&[][..], |b| &b[..]), out);
                out.push(b'"');
            }
            Value::Function(h) => {
                let name = self
                    .heap
                    .get_function(h)
                    .map_or("?", |f| f.def.name.as_str());
                out.extend_from_slice(format!("<function {}>", name).as_bytes());
            }
            Value::CFunction(idx) => {
                let name = self.native_name(idx).unwrap_or("?");
                out.extend_from_slice(format!("<cfunction {}>", name).as_bytes());
            }
            Value::Abstract(h) => {
                let name = self.heap.get_abstract(h).map_or("abstract", |a| a.ty.name);
                out.extend_from_slice(format!("<{} 0x{:08X}>", name, h).as_bytes());
            }
            other => {
                let handle = other.as_handle().unwrap_or_default();
                out.extend_from_slice(
                    format!("<{} 0x{:08X}>", other.type_of().short_name(), handle).as_bytes(),
                );
            }
        }
    }

    /// Lossy UTF-8 rendering of the to-string form, for host diagnostics.
    pub fn val_to_string(&self, val: Value) -> String {
        let mut out = Vec::new();
        self.to_string_bytes(val, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Reals keep a fractional part so they never read as integers.
fn write_real(r: f64, out: &mut Vec<u8>) {
    let text = r.to_string();
    out.extend_from_slice(text.as_bytes());
    if r.is_finite() && !text.contains('.') {
        out.extend_from_slice(b".0");
    }
}

fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    for &c in bytes {
        match c {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0 => out.extend_from_slice(b"\\0"),
            c if c < 0x20 || c == 0x7F => {
                out.extend_from_slice(format!("\\x{:02X}", c).as_bytes())
            }
            c => out.push(c),
        }
    }
}
