//! Numeric literal scanner.
//!
//! Accepted forms, each with an optional leading `+` or `-`:
//!
//! - decimal: `42`, `1_000`, `3.14`, `.5`, `6.02e23`, `1E-3`
//! - hexadecimal integer: `0xFF`, `0x7fff_ffff`
//! - explicit radix 2..=36: `2r1011`, `36rZZ`
//!
//! Underscores may follow any digit. Integer forms that fit in an `i32`
//! scan as integers, everything else as a real. Malformed text yields
//! `None`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i32),
    Real(f64),
}

pub fn scan_number(src: &[u8]) -> Option<Number> {
    let (neg, body) = match src.first()? {
        b'-' => (true, &src[1..]),
        b'+' => (false, &src[1..]),
        _ => (false, src),
    };
    if body.is_empty() {
        return None;
    }
    if body.len() > 2 && (body.starts_with(b"0x") || body.starts_with(b"0X")) {
        return scan_radix(&body[2..], 16, neg);
    }
    if let Some(pos) = body.iter().position(|&c| c == b'r' || c == b'R') {
        let radix = std::str::from_utf8(&body[..pos]).ok()?.parse::<u32>().ok()?;
        if !(2..=36).contains(&radix) {
            return None;
        }
        return scan_radix(&body[pos + 1..], radix, neg);
    }
    scan_decimal(body, neg)
}

/// Only integer results; reals and malformed text yield `None`.
pub fn scan_integer(src: &[u8]) -> Option<i32> {
    match scan_number(src)? {
        Number::Integer(i) => Some(i),
        Number::Real(_) => None,
    }
}

/// Any number, widened to a real.
pub fn scan_real(src: &[u8]) -> Option<f64> {
    match scan_number(src)? {
        Number::Integer(i) => Some(i as f64),
        Number::Real(r) => Some(r),
    }
}

fn scan_radix(digits: &[u8], radix: u32, neg: bool) -> Option<Number> {
    let mut seen_digit = false;
    let mut acc: i64 = 0;
    let mut real: f64 = 0.0;
    let mut overflow = false;
    for &c in digits {
        if c == b'_' && seen_digit {
            continue;
        }
        let d = (c as char).to_digit(radix)?;
        seen_digit = true;
        real = real * radix as f64 + d as f64;
        if !overflow {
            match acc
                .checked_mul(radix as i64)
                .and_then(|v| v.checked_add(d as i64))
            {
                Some(v) => acc = v,
                None => overflow = true,
            }
        }
    }
    if !seen_digit {
        return None;
    }
    let signed = if neg { -acc } else { acc };
    match i32::try_from(signed) {
        Ok(i) if !overflow => Some(Number::Integer(i)),
        _ => Some(Number::Real(if neg { -real } else { real })),
    }
}

fn scan_decimal(body: &[u8], neg: bool) -> Option<Number> {
    let mut clean = String::with_capacity(body.len() + 1);
    if neg {
        clean.push('-');
    }
    let mut mantissa_digits = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut exp_digits = 0;
    let mut prev_digit = false;
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        match c {
            b'0'..=b'9' => {
                if seen_exp {
                    exp_digits += 1;
                } else {
                    mantissa_digits += 1;
                }
                clean.push(c as char);
                prev_digit = true;
            }
            b'_' if prev_digit => {}
            b'.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                clean.push('.');
                prev_digit = false;
            }
            b'e' | b'E' if !seen_exp && mantissa_digits > 0 => {
                seen_exp = true;
                clean.push('e');
                prev_digit = false;
                if let Some(&s @ (b'+' | b'-')) = body.get(i + 1) {
                    clean.push(s as char);
                    i += 1;
                }
            }
            _ => return None,
        }
        i += 1;
    }
    if mantissa_digits == 0 || (seen_exp && exp_digits == 0) {
        return None;
    }
    if !seen_dot && !seen_exp {
        if let Ok(i) = clean.parse::<i32>() {
            return Some(Number::Integer(i));
        }
    }
    clean.parse::<f64>().ok().map(Number::Real)
}
