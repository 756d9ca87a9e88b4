//! Text rendering of 64-bit integer storage.
//!
//! Integers are always stored as `i64`. A logically unsigned value with its
//! top bit set is therefore negative in storage and must be rendered as
//! `value + 2^64`.

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Renders `value` in `base` (clamped to 2..=36).
///
/// With `signed` the two's-complement value is rendered with a leading `-`
/// when negative; without it the bit pattern is read as a `u64`.
pub fn format_number(value: i64, base: u32, signed: bool) -> String {
    let base = base.clamp(2, 36) as u64;

    if signed && value < 0 {
        let mut out = String::from("-");
        out.push_str(&format_magnitude(value.unsigned_abs(), base));
        out
    } else {
        format_magnitude(value as u64, base)
    }
}

fn format_magnitude(mut magnitude: u64, base: u64) -> String {
    match base {
        10 => return magnitude.to_string(),
        16 => return format!("{magnitude:x}"),
        8 => return format!("{magnitude:o}"),
        2 => return format!("{magnitude:b}"),
        _ => {}
    }

    if magnitude == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(64);
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % base) as usize]);
        magnitude /= base;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}
