//! S7 CPU registers.
//!
//! The register file consists of:
//! - ACCU1..ACCU4: 32-bit accumulators (S7-300 CPUs only use ACCU1/ACCU2)
//! - AR1, AR2: 32-bit address registers holding area pointers
//! - STW: the status word (RLO, STA, OR, OS, OV, CC0, CC1, BR, /FC)
//! - the DB register: number of the currently opened data block

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::word::{Conditions, Pointer, Width};

/// Accumulator selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accu {
    A1,
    A2,
    A3,
    A4,
}

impl Accu {
    pub const ALL: [Accu; 4] = [Accu::A1, Accu::A2, Accu::A3, Accu::A4];

    #[inline]
    const fn index(self) -> usize {
        match self {
            Accu::A1 => 0,
            Accu::A2 => 1,
            Accu::A3 => 2,
            Accu::A4 => 3,
        }
    }
}

/// Address register selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ar {
    #[serde(rename = "AR1")]
    Ar1,
    #[serde(rename = "AR2")]
    Ar2,
}

impl Ar {
    #[inline]
    const fn index(self) -> usize {
        match self {
            Ar::Ar1 => 0,
            Ar::Ar2 => 1,
        }
    }
}

impl fmt::Display for Ar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ar::Ar1 => write!(f, "AR1"),
            Ar::Ar2 => write!(f, "AR2"),
        }
    }
}

/// The status word.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusWord {
    /// /FC: first check. Cleared at the start of a logic string.
    pub fc: bool,
    /// RLO: result of logic operation.
    pub rlo: bool,
    /// STA: status of the last scanned bit.
    pub sta: bool,
    /// OR: pending OR term of an and-before-or combination.
    pub or: bool,
    /// OS: stored overflow (sticky).
    pub os: bool,
    /// OV: overflow of the last arithmetic operation.
    pub ov: bool,
    /// CC0: condition code 0.
    pub cc0: bool,
    /// CC1: condition code 1.
    pub cc1: bool,
    /// BR: binary result.
    pub br: bool,
}

impl StatusWord {
    pub const BIT_FC: u8 = 0;
    pub const BIT_RLO: u8 = 1;
    pub const BIT_STA: u8 = 2;
    pub const BIT_OR: u8 = 3;
    pub const BIT_OS: u8 = 4;
    pub const BIT_OV: u8 = 5;
    pub const BIT_CC0: u8 = 6;
    pub const BIT_CC1: u8 = 7;
    pub const BIT_BR: u8 = 8;

    /// Pack into the 16-bit STW layout.
    pub fn to_word(&self) -> u16 {
        [
            (self.fc, Self::BIT_FC),
            (self.rlo, Self::BIT_RLO),
            (self.sta, Self::BIT_STA),
            (self.or, Self::BIT_OR),
            (self.os, Self::BIT_OS),
            (self.ov, Self::BIT_OV),
            (self.cc0, Self::BIT_CC0),
            (self.cc1, Self::BIT_CC1),
            (self.br, Self::BIT_BR),
        ]
        .iter()
        .fold(0u16, |word, &(set, bit)| word | ((set as u16) << bit))
    }

    /// Unpack from the 16-bit STW layout. Bits 9-15 are ignored.
    pub fn from_word(word: u16) -> Self {
        let bit = |n: u8| word & (1 << n) != 0;
        Self {
            fc: bit(Self::BIT_FC),
            rlo: bit(Self::BIT_RLO),
            sta: bit(Self::BIT_STA),
            or: bit(Self::BIT_OR),
            os: bit(Self::BIT_OS),
            ov: bit(Self::BIT_OV),
            cc0: bit(Self::BIT_CC0),
            cc1: bit(Self::BIT_CC1),
            br: bit(Self::BIT_BR),
        }
    }

    /// Read a single bit by its STW bit number.
    pub fn get_bit(&self, bit: u8) -> bool {
        self.to_word() & (1u16 << (bit & 15)) != 0
    }

    /// Latch CC1, CC0 and OV. OS is set along with OV and never cleared here.
    pub fn set_conditions(&mut self, conditions: Conditions) {
        self.cc1 = conditions.cc1;
        self.cc0 = conditions.cc0;
        self.ov = conditions.ov;
        if conditions.ov {
            self.os = true;
        }
    }
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STW({:04X}: {})", self.to_word(), self)
    }
}

/// `BR:0 CC1:0 CC0:0 OV:0 OS:0 OR:0 STA:0 RLO:0 /FC:0`
impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BR:{} CC1:{} CC0:{} OV:{} OS:{} OR:{} STA:{} RLO:{} /FC:{}",
            self.br as u8, self.cc1 as u8, self.cc0 as u8, self.ov as u8, self.os as u8,
            self.or as u8, self.sta as u8, self.rlo as u8, self.fc as u8,
        )
    }
}

/// The CPU register file.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpuState {
    accus: [u32; 4],
    ars: [u32; 2],
    /// The status word.
    pub status: StatusWord,
    /// Number of the currently opened data block, if any.
    pub db_register: Option<u16>,
}

impl CpuState {
    /// Create a register file with everything cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all registers.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read the low `width` bits of an accumulator.
    #[inline]
    pub fn get_accu(&self, accu: Accu, width: Width) -> u32 {
        self.accus[accu.index()] & width.mask()
    }

    /// Write the low `width` bits of an accumulator, leaving the bits
    /// above `width` untouched.
    #[inline]
    pub fn set_accu(&mut self, accu: Accu, width: Width, value: u32) {
        let mask = width.mask();
        let reg = &mut self.accus[accu.index()];
        *reg = (*reg & !mask) | (value & mask);
    }

    /// Full 32-bit accumulator value.
    #[inline]
    pub fn accu(&self, accu: Accu) -> u32 {
        self.accus[accu.index()]
    }

    /// Replace the full 32-bit accumulator value.
    #[inline]
    pub fn load_accu(&mut self, accu: Accu, value: u32) {
        self.accus[accu.index()] = value;
    }

    /// The low word of an accumulator as a signed 16-bit integer.
    #[inline]
    pub fn accu_i16(&self, accu: Accu) -> i16 {
        self.get_accu(accu, Width::Word) as u16 as i16
    }

    /// The accumulator as a signed 32-bit integer.
    #[inline]
    pub fn accu_i32(&self, accu: Accu) -> i32 {
        self.accu(accu) as i32
    }

    #[inline]
    pub fn get_ar(&self, ar: Ar) -> u32 {
        self.ars[ar.index()]
    }

    #[inline]
    pub fn set_ar(&mut self, ar: Ar, value: u32) {
        self.ars[ar.index()] = value;
    }

    /// An address register viewed as a pointer.
    #[inline]
    pub fn ar_pointer(&self, ar: Ar) -> Pointer {
        Pointer::new(self.get_ar(ar))
    }
}

impl fmt::Debug for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuState")
            .field("accu1", &format_args!("{:08X}", self.accus[0]))
            .field("accu2", &format_args!("{:08X}", self.accus[1]))
            .field("accu3", &format_args!("{:08X}", self.accus[2]))
            .field("accu4", &format_args!("{:08X}", self.accus[3]))
            .field("ar1", &self.ar_pointer(Ar::Ar1))
            .field("ar2", &self.ar_pointer(Ar::Ar2))
            .field("status", &self.status)
            .field("db_register", &self.db_register)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_accu_preserves_upper_bits() {
        let mut cpu = CpuState::new();
        cpu.load_accu(Accu::A1, 0x1234_5678);

        cpu.set_accu(Accu::A1, Width::Byte, 0xAB);
        assert_eq!(cpu.accu(Accu::A1), 0x1234_56AB);

        cpu.set_accu(Accu::A1, Width::Word, 0xCDEF);
        assert_eq!(cpu.accu(Accu::A1), 0x1234_CDEF);

        cpu.set_accu(Accu::A1, Width::Bit, 0);
        assert_eq!(cpu.accu(Accu::A1), 0x1234_CDEE);

        cpu.set_accu(Accu::A1, Width::DWord, 0);
        assert_eq!(cpu.accu(Accu::A1), 0);
    }

    #[test]
    fn test_get_accu_width() {
        let mut cpu = CpuState::new();
        cpu.load_accu(Accu::A2, 0xFFFF_8001);
        assert_eq!(cpu.get_accu(Accu::A2, Width::Byte), 0x01);
        assert_eq!(cpu.get_accu(Accu::A2, Width::Word), 0x8001);
        assert_eq!(cpu.accu_i16(Accu::A2), -32767);
        assert_eq!(cpu.accu_i32(Accu::A2), -32767);
    }

    #[test]
    fn test_status_word_roundtrip_layout() {
        let mut s = StatusWord::default();
        s.rlo = true;
        s.cc1 = true;
        s.br = true;
        assert_eq!(s.to_word(), 0b1_1000_0010);
        assert_eq!(StatusWord::from_word(s.to_word()), s);
        assert!(s.get_bit(StatusWord::BIT_CC1));
        assert!(!s.get_bit(StatusWord::BIT_CC0));
    }

    #[test]
    fn test_set_conditions_latches_os() {
        let mut s = StatusWord::default();
        s.set_conditions(Conditions { cc1: false, cc0: true, ov: true });
        assert!(s.ov && s.os && s.cc0);

        s.set_conditions(Conditions::default());
        assert!(!s.ov);
        assert!(s.os, "OS stays set until explicitly cleared");
    }
}
