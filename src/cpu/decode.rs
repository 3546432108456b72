//! Opcodes and validated instructions.
//!
//! Text parsing is not done here; instructions arrive already decoded
//! (from a parser or a JSON program file). What this module guarantees is
//! structural validity: an [`Instruction`] can only be built through
//! [`Instruction::new`], which checks operand count and operand kinds for
//! the opcode. Handlers can rely on that shape.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::config::Mnemonics;
use crate::cpu::operand::Operand;
use crate::cpu::registers::Ar;
use crate::word::Width;

/// The closed set of STL opcodes known to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Opcode {
    // ==================== Bit logic ====================
    U,
    Un,
    O,
    On,
    X,
    Xn,
    Assign,
    S,
    R,
    Not,
    Set,
    Clr,
    Save,
    Fp,
    Fn,

    // ==================== Load / transfer ====================
    L,
    T,
    Auf,

    // ==================== Accumulator ====================
    Tak,
    Push,
    Pop,
    Ent,
    Leave,
    Inc,
    Dec,
    Caw,
    Cad,
    Invi,
    Invd,
    Negi,
    Negd,

    // ==================== Integer math ====================
    AddI,
    SubI,
    MulI,
    DivI,
    AddD,
    SubD,
    MulD,
    DivD,
    Mod,
    AddConst,

    // ==================== Compare ====================
    EqI,
    NeI,
    GtI,
    LtI,
    GeI,
    LeI,
    EqD,
    NeD,
    GtD,
    LtD,
    GeD,
    LeD,

    // ==================== Word logic ====================
    Uw,
    Ow,
    Xow,
    Ud,
    Od,
    Xod,

    // ==================== Shift / rotate ====================
    Slw,
    Srw,
    Sld,
    Srd,
    Ssi,
    Ssd,
    Rld,
    Rrd,

    // ==================== Address registers ====================
    PlusAr1,
    PlusAr2,
    Lar1,
    Lar2,
    Tar1,
    Tar2,
    Car,

    // ==================== Jumps ====================
    Spa,
    Spb,
    Spbn,
    Spbb,
    Spbnb,
    Spbi,
    Spbin,
    Spz,
    Spn,
    Spp,
    Spm,
    Sppz,
    Spmz,
    Spu,
    Spo,
    Sps,
    Loop,

    // ==================== Block end ====================
    Be,
    Bea,
    Beb,
    Nop,

    // ==================== Calls (no handler) ====================
    Call,
    Uc,
    Cc,
}

impl Opcode {
    pub const ALL: [Opcode; 98] = [
        Opcode::U, Opcode::Un, Opcode::O, Opcode::On, Opcode::X, Opcode::Xn,
        Opcode::Assign, Opcode::S, Opcode::R, Opcode::Not, Opcode::Set, Opcode::Clr,
        Opcode::Save, Opcode::Fp, Opcode::Fn,
        Opcode::L, Opcode::T, Opcode::Auf,
        Opcode::Tak, Opcode::Push, Opcode::Pop, Opcode::Ent, Opcode::Leave,
        Opcode::Inc, Opcode::Dec, Opcode::Caw, Opcode::Cad, Opcode::Invi, Opcode::Invd,
        Opcode::Negi, Opcode::Negd,
        Opcode::AddI, Opcode::SubI, Opcode::MulI, Opcode::DivI,
        Opcode::AddD, Opcode::SubD, Opcode::MulD, Opcode::DivD, Opcode::Mod, Opcode::AddConst,
        Opcode::EqI, Opcode::NeI, Opcode::GtI, Opcode::LtI, Opcode::GeI, Opcode::LeI,
        Opcode::EqD, Opcode::NeD, Opcode::GtD, Opcode::LtD, Opcode::GeD, Opcode::LeD,
        Opcode::Uw, Opcode::Ow, Opcode::Xow, Opcode::Ud, Opcode::Od, Opcode::Xod,
        Opcode::Slw, Opcode::Srw, Opcode::Sld, Opcode::Srd, Opcode::Ssi, Opcode::Ssd,
        Opcode::Rld, Opcode::Rrd,
        Opcode::PlusAr1, Opcode::PlusAr2, Opcode::Lar1, Opcode::Lar2,
        Opcode::Tar1, Opcode::Tar2, Opcode::Car,
        Opcode::Spa, Opcode::Spb, Opcode::Spbn, Opcode::Spbb, Opcode::Spbnb,
        Opcode::Spbi, Opcode::Spbin, Opcode::Spz, Opcode::Spn, Opcode::Spp, Opcode::Spm,
        Opcode::Sppz, Opcode::Spmz, Opcode::Spu, Opcode::Spo, Opcode::Sps, Opcode::Loop,
        Opcode::Be, Opcode::Bea, Opcode::Beb, Opcode::Nop,
        Opcode::Call, Opcode::Uc, Opcode::Cc,
    ];

    /// SIMATIC (German) mnemonic.
    pub const fn german(self) -> &'static str {
        match self {
            Opcode::U => "U",
            Opcode::Un => "UN",
            Opcode::O => "O",
            Opcode::On => "ON",
            Opcode::X => "X",
            Opcode::Xn => "XN",
            Opcode::Assign => "=",
            Opcode::S => "S",
            Opcode::R => "R",
            Opcode::Not => "NOT",
            Opcode::Set => "SET",
            Opcode::Clr => "CLR",
            Opcode::Save => "SAVE",
            Opcode::Fp => "FP",
            Opcode::Fn => "FN",
            Opcode::L => "L",
            Opcode::T => "T",
            Opcode::Auf => "AUF",
            Opcode::Tak => "TAK",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Ent => "ENT",
            Opcode::Leave => "LEAVE",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Caw => "CAW",
            Opcode::Cad => "CAD",
            Opcode::Invi => "INVI",
            Opcode::Invd => "INVD",
            Opcode::Negi => "NEGI",
            Opcode::Negd => "NEGD",
            Opcode::AddI => "+I",
            Opcode::SubI => "-I",
            Opcode::MulI => "*I",
            Opcode::DivI => "/I",
            Opcode::AddD => "+D",
            Opcode::SubD => "-D",
            Opcode::MulD => "*D",
            Opcode::DivD => "/D",
            Opcode::Mod => "MOD",
            Opcode::AddConst => "+",
            Opcode::EqI => "==I",
            Opcode::NeI => "<>I",
            Opcode::GtI => ">I",
            Opcode::LtI => "<I",
            Opcode::GeI => ">=I",
            Opcode::LeI => "<=I",
            Opcode::EqD => "==D",
            Opcode::NeD => "<>D",
            Opcode::GtD => ">D",
            Opcode::LtD => "<D",
            Opcode::GeD => ">=D",
            Opcode::LeD => "<=D",
            Opcode::Uw => "UW",
            Opcode::Ow => "OW",
            Opcode::Xow => "XOW",
            Opcode::Ud => "UD",
            Opcode::Od => "OD",
            Opcode::Xod => "XOD",
            Opcode::Slw => "SLW",
            Opcode::Srw => "SRW",
            Opcode::Sld => "SLD",
            Opcode::Srd => "SRD",
            Opcode::Ssi => "SSI",
            Opcode::Ssd => "SSD",
            Opcode::Rld => "RLD",
            Opcode::Rrd => "RRD",
            Opcode::PlusAr1 => "+AR1",
            Opcode::PlusAr2 => "+AR2",
            Opcode::Lar1 => "LAR1",
            Opcode::Lar2 => "LAR2",
            Opcode::Tar1 => "TAR1",
            Opcode::Tar2 => "TAR2",
            Opcode::Car => "CAR",
            Opcode::Spa => "SPA",
            Opcode::Spb => "SPB",
            Opcode::Spbn => "SPBN",
            Opcode::Spbb => "SPBB",
            Opcode::Spbnb => "SPBNB",
            Opcode::Spbi => "SPBI",
            Opcode::Spbin => "SPBIN",
            Opcode::Spz => "SPZ",
            Opcode::Spn => "SPN",
            Opcode::Spp => "SPP",
            Opcode::Spm => "SPM",
            Opcode::Sppz => "SPPZ",
            Opcode::Spmz => "SPMZ",
            Opcode::Spu => "SPU",
            Opcode::Spo => "SPO",
            Opcode::Sps => "SPS",
            Opcode::Loop => "LOOP",
            Opcode::Be => "BE",
            Opcode::Bea => "BEA",
            Opcode::Beb => "BEB",
            Opcode::Nop => "NOP",
            Opcode::Call => "CALL",
            Opcode::Uc => "UC",
            Opcode::Cc => "CC",
        }
    }

    /// International (English) mnemonic.
    pub const fn english(self) -> &'static str {
        match self {
            Opcode::U => "A",
            Opcode::Un => "AN",
            Opcode::Auf => "OPN",
            Opcode::Uw => "AW",
            Opcode::Ud => "AD",
            Opcode::Spa => "JU",
            Opcode::Spb => "JC",
            Opcode::Spbn => "JCN",
            Opcode::Spbb => "JCB",
            Opcode::Spbnb => "JNB",
            Opcode::Spbi => "JBI",
            Opcode::Spbin => "JNBI",
            Opcode::Spz => "JZ",
            Opcode::Spn => "JN",
            Opcode::Spp => "JP",
            Opcode::Spm => "JM",
            Opcode::Sppz => "JPZ",
            Opcode::Spmz => "JMZ",
            Opcode::Spu => "JUO",
            Opcode::Spo => "JO",
            Opcode::Sps => "JOS",
            Opcode::Bea => "BEU",
            Opcode::Beb => "BEC",
            other => other.german(),
        }
    }

    pub fn mnemonic(self, mnemonics: Mnemonics) -> &'static str {
        match mnemonics {
            Mnemonics::German => self.german(),
            Mnemonics::English => self.english(),
        }
    }

    /// Look up a mnemonic in either set. Case-insensitive.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.german() == text)
            .or_else(|| Self::ALL.iter().copied().find(|op| op.english() == text))
    }

    /// Is this a jump taking a label?
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Spa
                | Opcode::Spb
                | Opcode::Spbn
                | Opcode::Spbb
                | Opcode::Spbnb
                | Opcode::Spbi
                | Opcode::Spbin
                | Opcode::Spz
                | Opcode::Spn
                | Opcode::Spp
                | Opcode::Spm
                | Opcode::Sppz
                | Opcode::Spmz
                | Opcode::Spu
                | Opcode::Spo
                | Opcode::Sps
                | Opcode::Loop
        )
    }

    /// The operand shape this opcode requires.
    fn shape(self) -> Shape {
        use Opcode::*;
        match self {
            U | Un | On | X | Xn => Shape::One(BIT_SOURCE),
            O => Shape::Optional(BIT_SOURCE),
            Assign | S | R | Fp | Fn => Shape::One(BIT_MEMORY),
            L => Shape::One(LOADABLE),
            T => Shape::One(STORABLE),
            Auf => Shape::One(DB_NUMBER),
            Inc | Dec => Shape::One(IMM_BYTE),
            AddConst => Shape::One(IMM_INT),
            Uw | Ow | Xow | Ud | Od | Xod => Shape::Optional(IMMEDIATE),
            Slw | Srw | Sld | Srd | Ssi | Ssd | Rld | Rrd => Shape::Optional(IMM_BYTE),
            PlusAr1 | PlusAr2 => Shape::Optional(POINTER),
            Lar1 => Shape::Optional(AR_SOURCE),
            Lar2 => Shape::Optional(AR2_SOURCE),
            Tar1 => Shape::Optional(AR_TARGET),
            Tar2 => Shape::Optional(DWORD_MEMORY),
            Nop => Shape::Optional(IMM_BYTE),
            Call | Uc | Cc => Shape::Optional(ANY),
            op if op.is_jump() => Shape::One(LABEL),
            _ => Shape::None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.german())
    }
}

impl TryFrom<String> for Opcode {
    type Error = InsnError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Opcode::from_mnemonic(&text).ok_or(InsnError::UnknownMnemonic(text))
    }
}

impl From<Opcode> for String {
    fn from(op: Opcode) -> Self {
        op.german().to_string()
    }
}

// ==================== Operand shapes ====================

/// A named operand-kind predicate.
#[derive(Clone, Copy)]
struct Kind {
    name: &'static str,
    accepts: fn(&Operand) -> bool,
}

#[derive(Clone, Copy)]
enum Shape {
    None,
    One(Kind),
    Optional(Kind),
}

fn is_memory(op: &Operand) -> bool {
    matches!(
        op,
        Operand::Mem { .. } | Operand::DbMem { .. } | Operand::ArRelative { .. } | Operand::MemIndirect { .. }
    )
}

fn is_bit_memory(op: &Operand) -> bool {
    is_memory(op) && op.width() == Some(Width::Bit)
}

fn is_data_memory(op: &Operand) -> bool {
    is_memory(op) && op.width() != Some(Width::Bit)
}

const ANY: Kind = Kind { name: "any operand", accepts: |_| true };
const BIT_SOURCE: Kind = Kind {
    name: "bit address or status bit",
    accepts: |op| is_bit_memory(op) || matches!(op, Operand::Status { .. }),
};
const BIT_MEMORY: Kind = Kind { name: "bit address", accepts: is_bit_memory };
const LOADABLE: Kind = Kind {
    name: "constant, pointer or byte/word/dword address",
    accepts: |op| {
        is_data_memory(op)
            || matches!(
                op,
                Operand::Imm { .. }
                    | Operand::Pointer { .. }
                    | Operand::Timer { .. }
                    | Operand::Counter { .. }
                    | Operand::StatusWord
            )
    },
};
const STORABLE: Kind = Kind {
    name: "byte/word/dword address",
    accepts: |op| is_data_memory(op) || matches!(op, Operand::StatusWord),
};
const DB_NUMBER: Kind = Kind { name: "data block", accepts: |op| matches!(op, Operand::Db { .. }) };
const IMMEDIATE: Kind = Kind { name: "constant", accepts: |op| op.is_immediate() };
const IMM_BYTE: Kind = Kind {
    name: "8-bit constant",
    accepts: |op| matches!(op, Operand::Imm { width: Width::Byte | Width::Bit, .. }),
};
const IMM_INT: Kind = Kind {
    name: "16 or 32-bit constant",
    accepts: |op| matches!(op, Operand::Imm { width: Width::Word | Width::DWord, .. }),
};
const POINTER: Kind = Kind { name: "pointer constant", accepts: |op| matches!(op, Operand::Pointer { .. }) };
const DWORD_MEMORY: Kind = Kind { name: "dword address", accepts: is_data_memory };
const AR_SOURCE: Kind = Kind {
    name: "pointer constant, AR2 or dword address",
    accepts: |op| {
        is_data_memory(op)
            || matches!(op, Operand::Pointer { .. } | Operand::Register { ar: Ar::Ar2 })
    },
};
const AR2_SOURCE: Kind = Kind {
    name: "pointer constant or dword address",
    accepts: |op| is_data_memory(op) || matches!(op, Operand::Pointer { .. }),
};
const AR_TARGET: Kind = Kind {
    name: "AR2 or dword address",
    accepts: |op| is_data_memory(op) || matches!(op, Operand::Register { ar: Ar::Ar2 }),
};
const LABEL: Kind = Kind { name: "jump label", accepts: |op| matches!(op, Operand::Label { .. }) };

// ==================== Instruction ====================

/// A structurally valid instruction: an opcode and its operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInstruction", into = "RawInstruction")]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<Operand>,
}

/// The serialized form, validated on the way in.
#[derive(Serialize, Deserialize)]
struct RawInstruction {
    op: Opcode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    operands: Vec<Operand>,
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = InsnError;

    fn try_from(raw: RawInstruction) -> Result<Self, Self::Error> {
        Instruction::new(raw.op, raw.operands)
    }
}

impl From<Instruction> for RawInstruction {
    fn from(insn: Instruction) -> Self {
        RawInstruction { op: insn.opcode, operands: insn.operands }
    }
}

impl Instruction {
    /// Build an instruction, checking operand count and kinds.
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Result<Self, InsnError> {
        let (min, kind) = match opcode.shape() {
            Shape::None => (0, None),
            Shape::One(kind) => (1, Some(kind)),
            Shape::Optional(kind) => (0, Some(kind)),
        };
        let max = kind.map_or(0, |_| 1);
        if operands.len() < min || operands.len() > max {
            return Err(InsnError::OperandCount { opcode, min, max, found: operands.len() });
        }
        if let (Some(kind), Some(operand)) = (kind, operands.first()) {
            if !(kind.accepts)(operand) {
                return Err(InsnError::OperandKind {
                    opcode,
                    operand: operand.to_string(),
                    expected: kind.name,
                });
            }
        }
        Ok(Self { opcode, operands })
    }

    /// An instruction without operands.
    pub fn bare(opcode: Opcode) -> Result<Self, InsnError> {
        Self::new(opcode, Vec::new())
    }

    /// An instruction with one operand.
    pub fn with(opcode: Opcode, operand: Operand) -> Result<Self, InsnError> {
        Self::new(opcode, vec![operand])
    }

    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[inline]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// The first operand, if any.
    #[inline]
    pub fn operand(&self) -> Option<&Operand> {
        self.operands.first()
    }

    /// Render in the given mnemonic set: `L     MW 2`.
    pub fn display(&self, mnemonics: Mnemonics) -> InstructionDisplay<'_> {
        InstructionDisplay { insn: self, mnemonics }
    }
}

pub struct InstructionDisplay<'a> {
    insn: &'a Instruction,
    mnemonics: Mnemonics,
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.insn.opcode.mnemonic(self.mnemonics);
        match self.insn.operand() {
            None => f.write_str(mnemonic),
            Some(op) => write!(f, "{:<6}{}", mnemonic, op.display(self.mnemonics)),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display(Mnemonics::German).fmt(f)
    }
}

/// Errors raised while constructing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsnError {
    #[error("unknown mnemonic: {0:?}")]
    UnknownMnemonic(String),

    #[error("{opcode} takes {min} to {max} operands, found {found}")]
    OperandCount { opcode: Opcode, min: usize, max: usize, found: usize },

    #[error("{opcode}: operand '{operand}' is not a {expected}")]
    OperandKind { opcode: Opcode, operand: String, expected: &'static str },
}
