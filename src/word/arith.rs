//! Integer arithmetic with S7 condition codes.
//!
//! Every operation returns its wrapped result together with the
//! [`Conditions`] (CC1, CC0, OV) the CPU latches into the status word.
//! Nothing here touches CPU state.

use std::cmp::Ordering;

/// Condition codes produced by an arithmetic, compare, word-logic or
/// shift operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conditions {
    pub cc1: bool,
    pub cc0: bool,
    pub ov: bool,
}

impl Conditions {
    /// Division by zero: CC1 = CC0 = OV = 1.
    pub const DIV_BY_ZERO: Conditions = Conditions { cc1: true, cc0: true, ov: true };

    /// CC1/CC0 from the sign of `value`: >0 → 10, <0 → 01, 0 → 00.
    pub const fn signed(value: i64, ov: bool) -> Self {
        Self { cc1: value > 0, cc0: value < 0, ov }
    }

    /// Compare result of ACCU2 against ACCU1.
    pub const fn ordering(ord: Ordering) -> Self {
        match ord {
            Ordering::Greater => Self { cc1: true, cc0: false, ov: false },
            Ordering::Less => Self { cc1: false, cc0: true, ov: false },
            Ordering::Equal => Self { cc1: false, cc0: false, ov: false },
        }
    }

    /// Word logic: CC1 = result is non-zero.
    pub const fn nonzero(value: u32) -> Self {
        Self { cc1: value != 0, cc0: false, ov: false }
    }

    /// Shift and rotate: CC1 = the last bit shifted out.
    pub const fn shifted_out(bit: bool) -> Self {
        Self { cc1: bit, cc0: false, ov: false }
    }
}

fn in_i16(value: i64) -> bool {
    value >= i16::MIN as i64 && value <= i16::MAX as i64
}

fn in_i32(value: i64) -> bool {
    value >= i32::MIN as i64 && value <= i32::MAX as i64
}

/// `+I`: CC from the wrapped sum.
pub fn add_i16(a: i16, b: i16) -> (i16, Conditions) {
    let exact = a as i64 + b as i64;
    let wrapped = exact as i16;
    (wrapped, Conditions::signed(wrapped as i64, !in_i16(exact)))
}

/// `-I`: `a - b`, CC from the wrapped difference.
pub fn sub_i16(a: i16, b: i16) -> (i16, Conditions) {
    let exact = a as i64 - b as i64;
    let wrapped = exact as i16;
    (wrapped, Conditions::signed(wrapped as i64, !in_i16(exact)))
}

/// `*I`: the full 32-bit product, OV when it leaves the 16-bit range.
/// CC follows the sign of the product.
pub fn mul_i16(a: i16, b: i16) -> (i32, Conditions) {
    let exact = a as i64 * b as i64;
    (exact as i32, Conditions::signed(exact, !in_i16(exact)))
}

/// `/I`: quotient and remainder, or `None` on division by zero.
pub fn div_i16(a: i16, b: i16) -> (Option<(i16, i16)>, Conditions) {
    if b == 0 {
        return (None, Conditions::DIV_BY_ZERO);
    }
    let quotient = a as i64 / b as i64;
    let remainder = a as i64 % b as i64;
    let wrapped = quotient as i16;
    (
        Some((wrapped, remainder as i16)),
        Conditions::signed(wrapped as i64, !in_i16(quotient)),
    )
}

/// `+D`: CC from the wrapped sum.
pub fn add_i32(a: i32, b: i32) -> (i32, Conditions) {
    let exact = a as i64 + b as i64;
    let wrapped = exact as i32;
    (wrapped, Conditions::signed(wrapped as i64, !in_i32(exact)))
}

/// `-D`: `a - b`, CC from the wrapped difference.
pub fn sub_i32(a: i32, b: i32) -> (i32, Conditions) {
    let exact = a as i64 - b as i64;
    let wrapped = exact as i32;
    (wrapped, Conditions::signed(wrapped as i64, !in_i32(exact)))
}

/// `*D`: wrapped product, CC from the sign of the exact product.
pub fn mul_i32(a: i32, b: i32) -> (i32, Conditions) {
    let exact = a as i64 * b as i64;
    (exact as i32, Conditions::signed(exact, !in_i32(exact)))
}

/// `/D`: quotient, or `None` on division by zero.
pub fn div_i32(a: i32, b: i32) -> (Option<i32>, Conditions) {
    if b == 0 {
        return (None, Conditions::DIV_BY_ZERO);
    }
    let quotient = a as i64 / b as i64;
    let wrapped = quotient as i32;
    (Some(wrapped), Conditions::signed(wrapped as i64, !in_i32(quotient)))
}

/// `MOD`: remainder of the double-integer division.
pub fn mod_i32(a: i32, b: i32) -> (Option<i32>, Conditions) {
    if b == 0 {
        return (None, Conditions::DIV_BY_ZERO);
    }
    let remainder = (a as i64 % b as i64) as i32;
    (Some(remainder), Conditions::signed(remainder as i64, false))
}

/// `NEGI`: two's complement; negating -32768 overflows.
pub fn neg_i16(a: i16) -> (i16, Conditions) {
    sub_i16(0, a)
}

/// `NEGD`: two's complement; negating `i32::MIN` overflows.
pub fn neg_i32(a: i32) -> (i32, Conditions) {
    sub_i32(0, a)
}

/// Shift left within a `width`-bit field.
///
/// Returns `None` for a zero count, which leaves everything unchanged.
/// Counts larger than the width clear the field.
pub fn shift_left(value: u32, width: u32, count: u32) -> Option<(u32, Conditions)> {
    if count == 0 {
        return None;
    }
    let mask = field_mask(width);
    let value = value & mask;
    if count > width {
        return Some((0, Conditions::shifted_out(false)));
    }
    let out = (value >> (width - count)) & 1 != 0;
    let result = ((value as u64) << count) as u32 & mask;
    Some((result, Conditions::shifted_out(out)))
}

/// Logical shift right within a `width`-bit field.
pub fn shift_right(value: u32, width: u32, count: u32) -> Option<(u32, Conditions)> {
    if count == 0 {
        return None;
    }
    let value = value & field_mask(width);
    if count > width {
        return Some((0, Conditions::shifted_out(false)));
    }
    let out = (value >> (count - 1)) & 1 != 0;
    let result = ((value as u64) >> count) as u32;
    Some((result, Conditions::shifted_out(out)))
}

/// Arithmetic shift right within a `width`-bit field, filling with the sign.
pub fn shift_right_signed(value: u32, width: u32, count: u32) -> Option<(u32, Conditions)> {
    if count == 0 {
        return None;
    }
    let mask = field_mask(width);
    let value = value & mask;
    let sign = (value >> (width - 1)) & 1 != 0;
    if count >= width {
        let fill = if sign { mask } else { 0 };
        return Some((fill, Conditions::shifted_out(sign)));
    }
    let out = (value >> (count - 1)) & 1 != 0;
    // Sign-extend the field into an i64, shift, and cut back to the field.
    let extended = ((value as i64) << (64 - width)) >> (64 - width);
    let result = (extended >> count) as u32 & mask;
    Some((result, Conditions::shifted_out(out)))
}

/// `RLD`: rotate the 32-bit value left. CC1 is the bit rotated into bit 0.
pub fn rotate_left(value: u32, count: u32) -> Option<(u32, Conditions)> {
    let count = rotate_count(count)?;
    let result = value.rotate_left(count);
    Some((result, Conditions::shifted_out(result & 1 != 0)))
}

/// `RRD`: rotate the 32-bit value right. CC1 is the bit rotated into bit 31.
pub fn rotate_right(value: u32, count: u32) -> Option<(u32, Conditions)> {
    let count = rotate_count(count)?;
    let result = value.rotate_right(count);
    Some((result, Conditions::shifted_out(result >> 31 != 0)))
}

/// Counts above 32 come from ACCU2-LL and fold back into 1..=32.
fn rotate_count(count: u32) -> Option<u32> {
    match count {
        0 => None,
        n => Some((n - 1) % 32 + 1),
    }
}

const fn field_mask(width: u32) -> u32 {
    if width >= 32 { u32::MAX } else { (1 << width) - 1 }
}
