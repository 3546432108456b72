//! Operands and their resolution against CPU state and memory.
//!
//! An [`Operand`] is what the external parser attaches to an instruction:
//! a constant, a pointer literal, or a reference into memory (direct,
//! DB-qualified, register-indirect or memory-indirect). Resolution turns
//! a memory reference into a concrete [`Location`]; fetching reads it.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::config::Mnemonics;
use crate::cpu::memory::{MemoryStore, Region};
use crate::cpu::registers::{Ar, CpuState, StatusWord};
use crate::cpu::execute::Fault;
use crate::word::{Address, Area, Pointer, Width, Widths, OFFSET_MASK};

/// Status-word bits and condition-code predicates usable as bit operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusBit {
    #[serde(rename = "BR")]
    Br,
    #[serde(rename = "OV")]
    Ov,
    #[serde(rename = "OS")]
    Os,
    /// `==0`: CC1 = 0 and CC0 = 0.
    #[serde(rename = "==0")]
    Zero,
    /// `<>0`: exactly one of CC1/CC0 set.
    #[serde(rename = "<>0")]
    NotZero,
    /// `>0`: CC1 = 1, CC0 = 0.
    #[serde(rename = ">0")]
    Positive,
    /// `<0`: CC1 = 0, CC0 = 1.
    #[serde(rename = "<0")]
    Negative,
    /// `>=0`: CC0 = 0.
    #[serde(rename = ">=0")]
    PositiveOrZero,
    /// `<=0`: CC1 = 0.
    #[serde(rename = "<=0")]
    NegativeOrZero,
    /// `UO`: unordered, CC1 = 1 and CC0 = 1.
    #[serde(rename = "UO")]
    Unordered,
}

impl StatusBit {
    /// Evaluate against a status word.
    pub fn eval(self, s: &StatusWord) -> bool {
        match self {
            StatusBit::Br => s.br,
            StatusBit::Ov => s.ov,
            StatusBit::Os => s.os,
            StatusBit::Zero => !s.cc1 && !s.cc0,
            StatusBit::NotZero => s.cc1 != s.cc0,
            StatusBit::Positive => s.cc1 && !s.cc0,
            StatusBit::Negative => !s.cc1 && s.cc0,
            StatusBit::PositiveOrZero => !s.cc0,
            StatusBit::NegativeOrZero => !s.cc1,
            StatusBit::Unordered => s.cc1 && s.cc0,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            StatusBit::Br => "BR",
            StatusBit::Ov => "OV",
            StatusBit::Os => "OS",
            StatusBit::Zero => "==0",
            StatusBit::NotZero => "<>0",
            StatusBit::Positive => ">0",
            StatusBit::Negative => "<0",
            StatusBit::PositiveOrZero => ">=0",
            StatusBit::NegativeOrZero => "<=0",
            StatusBit::Unordered => "UO",
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// A constant. `value` must fit `width`.
    Imm { value: u32, width: Width },
    /// A pointer literal: `P#2.0`, `P#M 2.0`.
    Pointer { pointer: Pointer },
    /// Direct memory: `M 1.0`, `MW 2`, `DBD 4` (opened DB).
    Mem { area: Area, addr: Address, width: Width },
    /// Fully qualified DB access: `DB5.DBW 2`. Opens DB `db`.
    DbMem { db: u16, addr: Address, width: Width },
    /// Register-indirect. With an `area` it is area-internal
    /// (`MW [AR1,P#2.0]`); without, the area comes from the register's
    /// area byte (`W [AR1,P#2.0]`).
    ArRelative { ar: Ar, area: Option<Area>, offset: Address, width: Width },
    /// Memory-indirect: `MW [MD 4]`. The 32-bit pointer is read from
    /// `pointer_area` at byte `pointer_byte` (opened DB for `DataBlock`).
    MemIndirect { area: Area, pointer_area: Area, pointer_byte: u32, width: Width },
    /// A timer word: `T 5`.
    Timer { number: u16 },
    /// A counter word: `Z 5` / `C 5`.
    Counter { number: u16 },
    /// An address register: `AR2` in `LAR1 AR2`.
    Register { ar: Ar },
    /// A status bit or condition predicate: `OV`, `>0`.
    Status { bit: StatusBit },
    /// The whole 16-bit status word: `STW`.
    StatusWord,
    /// A data block number: `DB 5` in `AUF DB 5`.
    Db { number: u16 },
    /// A resolved jump target (instruction index).
    Label { target: usize },
}

/// A resolved memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub region: Region,
    pub addr: Address,
    pub width: Width,
}

impl Operand {
    /// Shorthand for a direct memory operand.
    pub fn mem(area: Area, byte: u32, bit: u8, width: Width) -> Self {
        Operand::Mem { area, addr: Address::new(byte, bit), width }
    }

    /// Shorthand for a constant.
    pub fn imm(value: u32, width: Width) -> Self {
        Operand::Imm { value, width }
    }

    /// Shorthand for a 16-bit integer constant, stored as its bit pattern.
    pub fn int(value: i16) -> Self {
        Operand::Imm { value: value as u16 as u32, width: Width::Word }
    }

    /// Shorthand for a 32-bit integer constant (`L#`).
    pub fn dint(value: i32) -> Self {
        Operand::Imm { value: value as u32, width: Width::DWord }
    }

    /// Shorthand for a pointer literal.
    pub fn pointer(pointer: Pointer) -> Self {
        Operand::Pointer { pointer }
    }

    /// The operand's data width, where it has one.
    pub fn width(&self) -> Option<Width> {
        match self {
            Operand::Imm { width, .. }
            | Operand::Mem { width, .. }
            | Operand::DbMem { width, .. }
            | Operand::ArRelative { width, .. }
            | Operand::MemIndirect { width, .. } => Some(*width),
            Operand::Pointer { .. } | Operand::Register { .. } => Some(Width::DWord),
            Operand::Timer { .. } | Operand::Counter { .. } | Operand::StatusWord => Some(Width::Word),
            Operand::Status { .. } => Some(Width::Bit),
            Operand::Db { .. } | Operand::Label { .. } => None,
        }
    }

    /// Is this a plain constant?
    pub fn is_immediate(&self) -> bool {
        matches!(self, Operand::Imm { .. })
    }

    /// Render in the given mnemonic set.
    pub fn display(&self, mnemonics: Mnemonics) -> OperandDisplay<'_> {
        OperandDisplay { operand: self, mnemonics }
    }
}

/// The masked 24-bit offset of a pointer literal.
pub fn to_pointer_value(operand: &Operand) -> Result<u32, Fault> {
    match operand {
        Operand::Pointer { pointer } => Ok(pointer.to_pointer_value()),
        other => Err(Fault::operand_type(other, "pointer constant")),
    }
}

fn check_width(width: Width, accept: Widths) -> Result<(), Fault> {
    if accept.contains(width) {
        Ok(())
    } else {
        Err(Fault::Width { width, accept })
    }
}

/// Resolve a memory-referencing operand to a location.
///
/// Constants, registers and other non-memory operands fail with
/// `OperandType`.
pub fn locate(operand: &Operand, cpu: &CpuState, mem: &MemoryStore) -> Result<Location, Fault> {
    let (region, addr, width) = match operand {
        // Direct addresses keep their full byte number so the bounds check
        // sees it; only pointer-based forms go through a 24-bit offset.
        Operand::Mem { area, addr, width } => (Region::of(*area, cpu.db_register)?, *addr, *width),
        Operand::DbMem { db, addr, width } => (Region::Db(*db), *addr, *width),
        Operand::ArRelative { ar, area, offset, width } => {
            let pointer = cpu.ar_pointer(*ar);
            let area = match area {
                Some(area) => *area,
                None => pointer.area().ok_or(Fault::InvalidAreaCode(pointer.area_code()))?,
            };
            let bit_offset = pointer.add_offset(offset.to_pointer_value()).to_pointer_value();
            (Region::of(area, cpu.db_register)?, Address::from_bit_offset(bit_offset), *width)
        }
        Operand::MemIndirect { area, pointer_area, pointer_byte, width } => {
            let pointer_region = Region::of(*pointer_area, cpu.db_register)?;
            let pointer = mem.read(pointer_region, Address::byte_address(*pointer_byte), Width::DWord)?;
            (Region::of(*area, cpu.db_register)?, Address::from_bit_offset(pointer & OFFSET_MASK), *width)
        }
        Operand::Timer { number } => (Region::Timers, Address::byte_address((*number as u32) << 1), Width::Word),
        Operand::Counter { number } => (Region::Counters, Address::byte_address((*number as u32) << 1), Width::Word),
        other => return Err(Fault::operand_type(other, "memory operand")),
    };

    if width != Width::Bit && addr.bit() != 0 {
        return Err(Fault::BitOffset { addr, width });
    }
    Ok(Location { region, addr, width })
}

/// Resolve an operand to its value, enforcing the accepted widths.
///
/// Pointer literals yield their masked 24-bit offset.
pub fn resolve(operand: &Operand, cpu: &CpuState, mem: &MemoryStore, accept: Widths) -> Result<u32, Fault> {
    match operand {
        Operand::Imm { value, width } => {
            check_width(*width, accept)?;
            if !width.fits(*value) {
                return Err(Fault::Width { width: *width, accept: Widths::from(*width) });
            }
            Ok(*value)
        }
        Operand::Pointer { .. } => {
            check_width(Width::DWord, accept)?;
            to_pointer_value(operand)
        }
        Operand::Register { ar } => {
            check_width(Width::DWord, accept)?;
            Ok(cpu.get_ar(*ar))
        }
        Operand::Status { bit } => {
            check_width(Width::Bit, accept)?;
            Ok(bit.eval(&cpu.status) as u32)
        }
        Operand::StatusWord => {
            check_width(Width::Word, accept)?;
            Ok(cpu.status.to_word() as u32)
        }
        Operand::Db { .. } | Operand::Label { .. } => Err(Fault::operand_type(operand, "data operand")),
        _ => {
            let loc = locate(operand, cpu, mem)?;
            check_width(loc.width, accept)?;
            Ok(mem.read(loc.region, loc.addr, loc.width)?)
        }
    }
}

/// Operand rendering in a chosen mnemonic set.
pub struct OperandDisplay<'a> {
    operand: &'a Operand,
    mnemonics: Mnemonics,
}

fn width_suffix(width: Width) -> &'static str {
    match width {
        Width::Bit => "",
        Width::Byte => "B",
        Width::Word => "W",
        Width::DWord => "D",
    }
}

fn area_prefix(area: Area, mnemonics: Mnemonics) -> &'static str {
    match mnemonics {
        Mnemonics::German => area.german(),
        Mnemonics::English => area.english(),
    }
}

/// `M`, `MW`, `DBX`, `DBW`, ...
fn mem_prefix(area: Area, width: Width, mnemonics: Mnemonics) -> String {
    match (area, width) {
        (Area::DataBlock, Width::Bit) => "DBX".to_string(),
        (Area::DataBlock, w) => format!("DB{}", width_suffix(w)),
        (a, w) => format!("{}{}", area_prefix(a, mnemonics), width_suffix(w)),
    }
}

fn mem_addr(width: Width, addr: Address) -> String {
    if width == Width::Bit {
        addr.to_string()
    } else {
        addr.byte().to_string()
    }
}

impl fmt::Display for OperandDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.mnemonics;
        match self.operand {
            Operand::Imm { value, width: Width::DWord } => write!(f, "L#{}", *value as i32),
            Operand::Imm { value, width: Width::Word } => write!(f, "{}", *value as u16 as i16),
            Operand::Imm { value, width: Width::Byte } => write!(f, "B#16#{:02X}", value),
            Operand::Imm { value, width: Width::Bit } => write!(f, "{}", value),
            Operand::Pointer { pointer } => write!(f, "{}", pointer),
            Operand::Mem { area, addr, width } => {
                write!(f, "{} {}", mem_prefix(*area, *width, m), mem_addr(*width, *addr))
            }
            Operand::DbMem { db, addr, width } => {
                write!(f, "DB{}.{} {}", db, mem_prefix(Area::DataBlock, *width, m), mem_addr(*width, *addr))
            }
            Operand::ArRelative { ar, area: Some(area), offset, width } => {
                write!(f, "{} [{},P#{}]", mem_prefix(*area, *width, m), ar, offset)
            }
            Operand::ArRelative { ar, area: None, offset, width } => {
                let prefix = if *width == Width::Bit { "" } else { width_suffix(*width) };
                write!(f, "{}[{},P#{}]", prefix, ar, offset)
            }
            Operand::MemIndirect { area, pointer_area, pointer_byte, width } => write!(
                f,
                "{} [{} {}]",
                mem_prefix(*area, *width, m),
                mem_prefix(*pointer_area, Width::DWord, m),
                pointer_byte
            ),
            Operand::Timer { number } => write!(f, "T {}", number),
            Operand::Counter { number } => write!(f, "{} {}", area_prefix(Area::Counters, m), number),
            Operand::Register { ar } => write!(f, "{}", ar),
            Operand::Status { bit } => f.write_str(bit.mnemonic()),
            Operand::StatusWord => f.write_str("STW"),
            Operand::Db { number } => write!(f, "DB {}", number),
            Operand::Label { target } => write!(f, "=>{}", target),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display(Mnemonics::English).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CpuConfig;
    use crate::cpu::memory::MemoryError;

    fn setup() -> (CpuState, MemoryStore) {
        let mut config = CpuConfig::default();
        config.markers = 32;
        config.data_blocks.insert(5, 16);
        (CpuState::new(), MemoryStore::new(&config))
    }

    #[test]
    fn test_to_pointer_value_masks_area() {
        let op = Operand::pointer(Pointer::crossing(Area::Markers, Address::new(2, 1)));
        assert_eq!(to_pointer_value(&op).unwrap(), 17);
        assert!(matches!(to_pointer_value(&Operand::int(1)), Err(Fault::OperandType { .. })));
    }

    #[test]
    fn test_resolve_immediate_width() {
        let (cpu, mem) = setup();
        assert_eq!(resolve(&Operand::int(-1), &cpu, &mem, Widths::DATA).unwrap(), 0xFFFF);
        assert!(matches!(
            resolve(&Operand::int(1), &cpu, &mem, Widths::DWORD),
            Err(Fault::Width { width: Width::Word, .. })
        ));
        // a literal wider than its declared width is never truncated
        assert!(matches!(
            resolve(&Operand::imm(0x1FF, Width::Byte), &cpu, &mem, Widths::DATA),
            Err(Fault::Width { .. })
        ));
    }

    #[test]
    fn test_resolve_direct_and_qualified() {
        let (mut cpu, mut mem) = setup();
        mem.write(Region::Markers, Address::byte_address(2), Width::Word, 0x1234).unwrap();
        let mw2 = Operand::mem(Area::Markers, 2, 0, Width::Word);
        assert_eq!(resolve(&mw2, &cpu, &mem, Widths::DATA).unwrap(), 0x1234);

        let dbw = Operand::mem(Area::DataBlock, 0, 0, Width::Word);
        assert!(matches!(
            resolve(&dbw, &cpu, &mem, Widths::DATA),
            Err(Fault::Memory(crate::cpu::MemoryError::NoDataBlockOpen))
        ));
        cpu.db_register = Some(5);
        assert_eq!(resolve(&dbw, &cpu, &mem, Widths::DATA).unwrap(), 0);

        let qualified = Operand::DbMem { db: 9, addr: Address::byte_address(0), width: Width::Byte };
        assert!(resolve(&qualified, &cpu, &mem, Widths::DATA).is_err());
    }

    #[test]
    fn test_ar_relative_area_internal_ignores_area_byte() {
        let (mut cpu, mut mem) = setup();
        mem.write(Region::Markers, Address::byte_address(6), Width::Byte, 0x5A).unwrap();
        // AR1 carries a DB area byte, but the operand names M
        cpu.set_ar(Ar::Ar1, Pointer::crossing(Area::DataBlock, Address::byte_address(4)).raw());
        let op = Operand::ArRelative {
            ar: Ar::Ar1,
            area: Some(Area::Markers),
            offset: Address::byte_address(2),
            width: Width::Byte,
        };
        assert_eq!(resolve(&op, &cpu, &mem, Widths::DATA).unwrap(), 0x5A);
    }

    #[test]
    fn test_ar_relative_area_crossing() {
        let (mut cpu, mut mem) = setup();
        mem.write(Region::Markers, Address::new(3, 6), Width::Bit, 1).unwrap();
        cpu.set_ar(Ar::Ar2, Pointer::crossing(Area::Markers, Address::new(3, 4)).raw());
        let op = Operand::ArRelative { ar: Ar::Ar2, area: None, offset: Address::new(0, 2), width: Width::Bit };
        assert_eq!(resolve(&op, &cpu, &mem, Widths::BIT).unwrap(), 1);

        cpu.set_ar(Ar::Ar2, 0x8500_0000);
        assert!(matches!(
            resolve(&op, &cpu, &mem, Widths::BIT),
            Err(Fault::InvalidAreaCode(0x85))
        ));
    }

    #[test]
    fn test_misaligned_word_access() {
        let (mut cpu, mem) = setup();
        cpu.set_ar(Ar::Ar1, Address::new(1, 3).to_pointer_value());
        let op = Operand::ArRelative {
            ar: Ar::Ar1,
            area: Some(Area::Markers),
            offset: Address::byte_address(0),
            width: Width::Word,
        };
        assert!(matches!(locate(&op, &cpu, &mem), Err(Fault::BitOffset { .. })));
    }

    #[test]
    fn test_memory_indirect() {
        let (cpu, mut mem) = setup();
        // MD 8 holds P#4.0
        mem.write(Region::Markers, Address::byte_address(8), Width::DWord, Address::byte_address(4).to_pointer_value())
            .unwrap();
        mem.write(Region::Markers, Address::byte_address(4), Width::Word, 0xCAFE).unwrap();
        let op = Operand::MemIndirect {
            area: Area::Markers,
            pointer_area: Area::Markers,
            pointer_byte: 8,
            width: Width::Word,
        };
        assert_eq!(resolve(&op, &cpu, &mem, Widths::DATA).unwrap(), 0xCAFE);
    }

    #[test]
    fn test_status_predicates() {
        let mut s = StatusWord::default();
        assert!(StatusBit::Zero.eval(&s));
        assert!(StatusBit::PositiveOrZero.eval(&s));
        s.cc1 = true;
        assert!(StatusBit::Positive.eval(&s));
        assert!(StatusBit::NotZero.eval(&s));
        assert!(!StatusBit::NegativeOrZero.eval(&s));
        s.cc0 = true;
        assert!(StatusBit::Unordered.eval(&s));
        assert!(!StatusBit::NotZero.eval(&s));
    }

    #[test]
    fn test_operand_display() {
        assert_eq!(Operand::mem(Area::Inputs, 1, 2, Width::Bit).to_string(), "I 1.2");
        assert_eq!(
            Operand::mem(Area::Inputs, 1, 2, Width::Bit).display(Mnemonics::German).to_string(),
            "E 1.2"
        );
        assert_eq!(Operand::mem(Area::Markers, 4, 0, Width::DWord).to_string(), "MD 4");
        assert_eq!(Operand::mem(Area::DataBlock, 2, 0, Width::Word).to_string(), "DBW 2");
        assert_eq!(
            Operand::DbMem { db: 5, addr: Address::byte_address(2), width: Width::Word }.to_string(),
            "DB5.DBW 2"
        );
        assert_eq!(Operand::int(-3).to_string(), "-3");
        assert_eq!(Operand::dint(70000).to_string(), "L#70000");
        assert_eq!(
            Operand::ArRelative { ar: Ar::Ar1, area: None, offset: Address::new(2, 0), width: Width::Word }.to_string(),
            "W[AR1,P#2.0]"
        );
    }

    #[test]
    fn test_huge_byte_number_does_not_wrap() {
        let (cpu, mut mem) = setup();
        mem.write(Region::Markers, Address::byte_address(1), Width::Byte, 0xAB).unwrap();
        // 0x2000_0001 * 8 overflows 32 bits and would land on byte 1
        let op = Operand::mem(Area::Markers, 0x2000_0001, 0, Width::Byte);
        let loc = locate(&op, &cpu, &mem).unwrap();
        assert_eq!(loc.addr.byte(), 0x2000_0001);
        assert!(matches!(
            resolve(&op, &cpu, &mem, Widths::DATA),
            Err(Fault::Memory(MemoryError::AreaBoundary { offset: 0x2000_0001, .. }))
        ));

        let qualified = Operand::DbMem { db: 5, addr: Address::byte_address(0x2000_0000), width: Width::Word };
        assert!(matches!(
            resolve(&qualified, &cpu, &mem, Widths::DATA),
            Err(Fault::Memory(MemoryError::AreaBoundary { .. }))
        ));
    }

    #[test]
    fn test_operand_json_shape() {
        let op: Operand = serde_json::from_str(
            r#"{ "kind": "mem", "area": "M", "addr": { "byte": 2, "bit": 0 }, "width": 16 }"#,
        )
        .unwrap();
        assert_eq!(op, Operand::mem(Area::Markers, 2, 0, Width::Word));
    }
}
