//! Byte.bit addresses and the 32-bit S7 area pointer.
//!
//! Pointer layout:
//!
//! ```text
//!  31      24 23                 3 2   0
//! +----------+--------------------+-----+
//! | area code|    byte offset     | bit |
//! +----------+--------------------+-----+
//! ```
//!
//! The low 24 bits hold `byte * 8 + bit`. Pointer arithmetic only ever
//! touches those 24 bits and wraps modulo 2^24; the area byte is carried
//! through unchanged.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::word::Area;

/// Area code byte of a pointer.
pub const AREA_MASK: u32 = 0xFF00_0000;
/// Byte.bit offset part of a pointer.
pub const OFFSET_MASK: u32 = 0x00FF_FFFF;

/// A byte.bit address inside one memory area.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr")]
pub struct Address {
    byte: u32,
    bit: u8,
}

#[derive(Deserialize)]
struct AddressRepr {
    byte: u32,
    #[serde(default)]
    bit: u8,
}

impl TryFrom<AddressRepr> for Address {
    type Error = String;

    fn try_from(repr: AddressRepr) -> Result<Self, Self::Error> {
        if repr.bit > 7 {
            return Err(format!("bit number {} out of range (0-7)", repr.bit));
        }
        Ok(Address { byte: repr.byte, bit: repr.bit })
    }
}

impl Address {
    /// Create an address.
    ///
    /// # Panics
    /// Panics if `bit` is greater than 7.
    pub fn new(byte: u32, bit: u8) -> Self {
        assert!(bit < 8, "bit number {} out of range (0-7)", bit);
        Self { byte, bit }
    }

    /// Address of a whole byte (bit 0).
    pub const fn byte_address(byte: u32) -> Self {
        Self { byte, bit: 0 }
    }

    /// Split a linear bit offset (`byte * 8 + bit`) into byte and bit.
    pub const fn from_bit_offset(offset: u32) -> Self {
        Self { byte: offset >> 3, bit: (offset & 7) as u8 }
    }

    #[inline]
    pub const fn byte(&self) -> u32 {
        self.byte
    }

    #[inline]
    pub const fn bit(&self) -> u8 {
        self.bit
    }

    /// The linear bit offset `byte * 8 + bit`, as stored in a pointer.
    #[inline]
    pub const fn to_pointer_value(&self) -> u32 {
        (self.byte << 3) | self.bit as u32
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.byte, self.bit)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.byte, self.bit)
    }
}

/// A 32-bit S7 pointer: area code in the high byte, bit offset below.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pointer(u32);

impl Pointer {
    /// Wrap a raw 32-bit pointer value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// An area-internal pointer (area byte zero): `P#byte.bit`.
    pub const fn internal(addr: Address) -> Self {
        Self(addr.to_pointer_value() & OFFSET_MASK)
    }

    /// An area-crossing pointer: `P#M byte.bit`.
    ///
    /// Areas without a pointer code (timers, counters) yield an
    /// area-internal pointer.
    pub const fn crossing(area: Area, addr: Address) -> Self {
        let code = match area.pointer_code() {
            Some(code) => code as u32,
            None => 0,
        };
        Self((code << 24) | (addr.to_pointer_value() & OFFSET_MASK))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The area code byte.
    #[inline]
    pub const fn area_code(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The area this pointer crosses into, if the code names a backed area.
    pub const fn area(self) -> Option<Area> {
        Area::from_pointer_code(self.area_code())
    }

    /// The low 24 bits: the linear bit offset with the area byte masked off.
    #[inline]
    pub const fn to_pointer_value(self) -> u32 {
        self.0 & OFFSET_MASK
    }

    /// The offset part as a byte.bit address.
    pub const fn address(self) -> Address {
        Address::from_bit_offset(self.to_pointer_value())
    }

    /// Add `increment` to the offset, modulo 2^24, keeping the area byte.
    ///
    /// `increment` is taken as a two's complement value, so a sign-extended
    /// negative increment moves the offset backwards.
    #[inline]
    pub const fn add_offset(self, increment: u32) -> Self {
        let offset = (self.0 & OFFSET_MASK).wrapping_add(increment) & OFFSET_MASK;
        Self((self.0 & AREA_MASK) | offset)
    }
}

impl From<u32> for Pointer {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:08X} {})", self.0, self)
    }
}

/// `P#2.0`, `P#M 2.0`, or `P#[85] 2.0` for codes without a backed area.
impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self.address();
        match (self.area_code(), self.area()) {
            (0, _) => write!(f, "P#{}", addr),
            (_, Some(Area::DataBlock)) => write!(f, "P#DBX {}", addr),
            (_, Some(area)) => write!(f, "P#{} {}", area, addr),
            (code, None) => write!(f, "P#[{:02X}] {}", code, addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_pointer_value() {
        let addr = Address::new(2, 3);
        assert_eq!(addr.to_pointer_value(), 19);
        assert_eq!(Address::from_bit_offset(19), addr);
    }

    #[test]
    #[should_panic]
    fn test_address_bit_range() {
        Address::new(0, 8);
    }

    #[test]
    fn test_crossing_pointer_layout() {
        let p = Pointer::crossing(Area::DataBlock, Address::new(2, 0));
        assert_eq!(p.raw(), 0x8400_0010);
        assert_eq!(p.area(), Some(Area::DataBlock));
        assert_eq!(p.to_pointer_value(), 0x10);
        assert_eq!(p.to_string(), "P#DBX 2.0");
    }

    #[test]
    fn test_add_offset_wraps_and_keeps_area() {
        let p = Pointer::new(0x84FF_FFFF).add_offset(1);
        assert_eq!(p.raw(), 0x8400_0000);

        let p = Pointer::new(0x8300_0008).add_offset(-8i32 as u32);
        assert_eq!(p.raw(), 0x8300_0000);

        let p = Pointer::new(0x8300_0000).add_offset(-1i32 as u32);
        assert_eq!(p.raw(), 0x83FF_FFFF);
    }

    #[test]
    fn test_address_serde_rejects_bad_bit() {
        let ok: Address = serde_json::from_str(r#"{"byte": 4, "bit": 7}"#).unwrap();
        assert_eq!(ok, Address::new(4, 7));
        let byte_only: Address = serde_json::from_str(r#"{"byte": 4}"#).unwrap();
        assert_eq!(byte_only.bit(), 0);
        assert!(serde_json::from_str::<Address>(r#"{"byte": 4, "bit": 8}"#).is_err());
    }
}
