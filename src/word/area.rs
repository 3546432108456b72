//! Memory areas and their pointer area codes.

use std::fmt;
use serde::{Serialize, Deserialize};

/// An addressable memory area of the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Area {
    /// Process image of inputs (I / E).
    #[serde(rename = "I")]
    Inputs,
    /// Process image of outputs (Q / A).
    #[serde(rename = "Q")]
    Outputs,
    /// Bit memory / markers (M).
    #[serde(rename = "M")]
    Markers,
    /// Timer words (T).
    #[serde(rename = "T")]
    Timers,
    /// Counter words (C / Z).
    #[serde(rename = "C")]
    Counters,
    /// Local data (L).
    #[serde(rename = "L")]
    Local,
    /// The currently opened data block (DB).
    #[serde(rename = "DB")]
    DataBlock,
}

impl Area {
    /// Pointer area codes as stored in the high byte of an area-crossing pointer.
    pub const CODE_PERIPHERAL: u8 = 0x80;
    pub const CODE_INPUTS: u8 = 0x81;
    pub const CODE_OUTPUTS: u8 = 0x82;
    pub const CODE_MARKERS: u8 = 0x83;
    pub const CODE_DATA_BLOCK: u8 = 0x84;
    pub const CODE_INSTANCE_DB: u8 = 0x85;
    pub const CODE_LOCAL: u8 = 0x86;
    pub const CODE_PARENT_LOCAL: u8 = 0x87;

    /// The pointer area code, if this area can be reached through a pointer.
    pub const fn pointer_code(self) -> Option<u8> {
        match self {
            Area::Inputs => Some(Self::CODE_INPUTS),
            Area::Outputs => Some(Self::CODE_OUTPUTS),
            Area::Markers => Some(Self::CODE_MARKERS),
            Area::DataBlock => Some(Self::CODE_DATA_BLOCK),
            Area::Local => Some(Self::CODE_LOCAL),
            Area::Timers | Area::Counters => None,
        }
    }

    /// Decode a pointer area code.
    ///
    /// Peripheral, instance-DB and parent-local codes are valid in the
    /// pointer format but have no backing area here.
    pub const fn from_pointer_code(code: u8) -> Option<Self> {
        match code {
            Self::CODE_INPUTS => Some(Area::Inputs),
            Self::CODE_OUTPUTS => Some(Area::Outputs),
            Self::CODE_MARKERS => Some(Area::Markers),
            Self::CODE_DATA_BLOCK => Some(Area::DataBlock),
            Self::CODE_LOCAL => Some(Area::Local),
            _ => None,
        }
    }

    /// Area prefix in German (SIMATIC) mnemonics.
    pub const fn german(self) -> &'static str {
        match self {
            Area::Inputs => "E",
            Area::Outputs => "A",
            Area::Markers => "M",
            Area::Timers => "T",
            Area::Counters => "Z",
            Area::Local => "L",
            Area::DataBlock => "DB",
        }
    }

    /// Area prefix in English (international) mnemonics.
    pub const fn english(self) -> &'static str {
        match self {
            Area::Inputs => "I",
            Area::Outputs => "Q",
            Area::Markers => "M",
            Area::Timers => "T",
            Area::Counters => "C",
            Area::Local => "L",
            Area::DataBlock => "DB",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.english())
    }
}
