//! Operand widths.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Width of an operand or memory access.
///
/// Serialized as its bit count (1, 8, 16 or 32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Width {
    /// A single bit (`M 1.0`).
    Bit,
    /// 8 bits (`MB 1`).
    Byte,
    /// 16 bits (`MW 2`).
    Word,
    /// 32 bits (`MD 4`).
    DWord,
}

impl Width {
    /// Number of bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Width::Bit => 1,
            Width::Byte => 8,
            Width::Word => 16,
            Width::DWord => 32,
        }
    }

    /// Number of bytes touched in memory. A bit access touches one byte.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Width::Bit | Width::Byte => 1,
            Width::Word => 2,
            Width::DWord => 4,
        }
    }

    /// Mask covering the low `bits()` bits.
    #[inline]
    pub const fn mask(self) -> u32 {
        match self {
            Width::Bit => 0x1,
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
            Width::DWord => 0xFFFF_FFFF,
        }
    }

    /// Does `value` fit into this width without truncation?
    #[inline]
    pub const fn fits(self, value: u32) -> bool {
        value & !self.mask() == 0
    }

    /// Look up a width by bit count.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Width::Bit),
            8 => Some(Width::Byte),
            16 => Some(Width::Word),
            32 => Some(Width::DWord),
            _ => None,
        }
    }

    const fn flag(self) -> u8 {
        match self {
            Width::Bit => 0b0001,
            Width::Byte => 0b0010,
            Width::Word => 0b0100,
            Width::DWord => 0b1000,
        }
    }
}

impl TryFrom<u8> for Width {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Width::from_bits(bits).ok_or_else(|| format!("invalid operand width: {} bits", bits))
    }
}

impl From<Width> for u8 {
    fn from(width: Width) -> u8 {
        width.bits() as u8
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// A set of accepted widths, as enforced on operand fetch and store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Widths(u8);

impl Widths {
    pub const NONE: Widths = Widths(0);
    pub const BIT: Widths = Widths(0b0001);
    pub const BYTE: Widths = Widths(0b0010);
    pub const WORD: Widths = Widths(0b0100);
    pub const DWORD: Widths = Widths(0b1000);
    /// Byte, word and double word: everything `L` and `T` move.
    pub const DATA: Widths = Widths(0b1110);
    pub const WORD_DWORD: Widths = Widths(0b1100);

    /// Union of two sets.
    pub const fn or(self, other: Widths) -> Widths {
        Widths(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, width: Width) -> bool {
        self.0 & width.flag() != 0
    }

    fn iter(self) -> impl Iterator<Item = Width> {
        [Width::Bit, Width::Byte, Width::Word, Width::DWord]
            .into_iter()
            .filter(move |w| self.contains(*w))
    }
}

impl From<Width> for Widths {
    fn from(width: Width) -> Self {
        Widths(width.flag())
    }
}

impl fmt::Debug for Widths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|w| w.bits())).finish()
    }
}

/// Renders as a human list: `8, 16 or 32`.
impl fmt::Display for Widths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<_> = self.iter().map(|w| w.bits().to_string()).collect();
        match widths.split_last() {
            None => write!(f, "none"),
            Some((last, [])) => write!(f, "{}", last),
            Some((last, rest)) => write!(f, "{} or {}", rest.join(", "), last),
        }
    }
}
