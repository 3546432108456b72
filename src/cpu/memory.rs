//! S7 memory areas.
//!
//! Each area is a bounds-checked byte array sized from the CPU
//! configuration. Multi-byte values are stored big-endian, as on the PLC.
//! Timers and counters occupy one 16-bit word per number.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::config::CpuConfig;
use crate::word::{Address, Area, Width};

/// A concrete backing store: a fixed area or one numbered data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Inputs,
    Outputs,
    Markers,
    Timers,
    Counters,
    Local,
    Db(u16),
}

impl Region {
    /// Map an area to its region. `DataBlock` needs the DB register.
    pub fn of(area: Area, db_register: Option<u16>) -> Result<Self, MemoryError> {
        Ok(match area {
            Area::Inputs => Region::Inputs,
            Area::Outputs => Region::Outputs,
            Area::Markers => Region::Markers,
            Area::Timers => Region::Timers,
            Area::Counters => Region::Counters,
            Area::Local => Region::Local,
            Area::DataBlock => Region::Db(db_register.ok_or(MemoryError::NoDataBlockOpen)?),
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Inputs => write!(f, "I"),
            Region::Outputs => write!(f, "Q"),
            Region::Markers => write!(f, "M"),
            Region::Timers => write!(f, "T"),
            Region::Counters => write!(f, "C"),
            Region::Local => write!(f, "L"),
            Region::Db(n) => write!(f, "DB{}", n),
        }
    }
}

/// One bounds-checked byte array.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryArea {
    region: Region,
    bytes: Vec<u8>,
}

impl MemoryArea {
    /// Create a zeroed area of `size` bytes.
    pub fn new(region: Region, size: usize) -> Self {
        Self { region, bytes: vec![0; size] }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Raw contents, for monitors.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Verify that an access of `width` at `addr` lies inside the area.
    pub fn check(&self, addr: Address, width: Width) -> Result<(), MemoryError> {
        let end = (addr.byte() as usize).checked_add(width.bytes());
        match end {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(MemoryError::AreaBoundary {
                region: self.region,
                offset: addr.byte(),
                width,
                size: self.bytes.len(),
            }),
        }
    }

    /// Read a value. Bit reads return 0 or 1.
    pub fn read(&self, addr: Address, width: Width) -> Result<u32, MemoryError> {
        self.check(addr, width)?;
        let at = addr.byte() as usize;
        let b = &self.bytes[at..at + width.bytes()];
        Ok(match width {
            Width::Bit => ((b[0] >> addr.bit()) & 1) as u32,
            Width::Byte => b[0] as u32,
            Width::Word => u16::from_be_bytes([b[0], b[1]]) as u32,
            Width::DWord => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }

    /// Write the low `width` bits of `value`. Bit writes touch one bit only.
    pub fn write(&mut self, addr: Address, width: Width, value: u32) -> Result<(), MemoryError> {
        self.check(addr, width)?;
        let at = addr.byte() as usize;
        match width {
            Width::Bit => {
                let mask = 1u8 << addr.bit();
                if value & 1 != 0 {
                    self.bytes[at] |= mask;
                } else {
                    self.bytes[at] &= !mask;
                }
            }
            Width::Byte => self.bytes[at] = value as u8,
            Width::Word => self.bytes[at..at + 2].copy_from_slice(&(value as u16).to_be_bytes()),
            Width::DWord => self.bytes[at..at + 4].copy_from_slice(&value.to_be_bytes()),
        }
        Ok(())
    }

    /// Clear the area to zeros.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl fmt::Debug for MemoryArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero = self.bytes.iter().filter(|b| **b != 0).count();
        f.debug_struct("MemoryArea")
            .field("region", &self.region)
            .field("size", &self.bytes.len())
            .field("non_zero_bytes", &non_zero)
            .finish()
    }
}

/// A memory write that has been bounds-checked but not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub region: Region,
    pub addr: Address,
    pub width: Width,
    pub value: u32,
}

/// All memory areas of one CPU.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inputs: MemoryArea,
    outputs: MemoryArea,
    markers: MemoryArea,
    timers: MemoryArea,
    counters: MemoryArea,
    local: MemoryArea,
    data_blocks: BTreeMap<u16, MemoryArea>,
}

impl MemoryStore {
    /// Allocate all areas with the sizes from `config`.
    pub fn new(config: &CpuConfig) -> Self {
        Self {
            inputs: MemoryArea::new(Region::Inputs, config.inputs),
            outputs: MemoryArea::new(Region::Outputs, config.outputs),
            markers: MemoryArea::new(Region::Markers, config.markers),
            timers: MemoryArea::new(Region::Timers, config.timers.saturating_mul(2)),
            counters: MemoryArea::new(Region::Counters, config.counters.saturating_mul(2)),
            local: MemoryArea::new(Region::Local, config.local_bytes),
            data_blocks: config
                .data_blocks
                .iter()
                .map(|(&nr, &size)| (nr, MemoryArea::new(Region::Db(nr), size)))
                .collect(),
        }
    }

    /// Look up an area.
    pub fn area(&self, region: Region) -> Result<&MemoryArea, MemoryError> {
        Ok(match region {
            Region::Inputs => &self.inputs,
            Region::Outputs => &self.outputs,
            Region::Markers => &self.markers,
            Region::Timers => &self.timers,
            Region::Counters => &self.counters,
            Region::Local => &self.local,
            Region::Db(nr) => self.data_blocks.get(&nr).ok_or(MemoryError::NoSuchDataBlock(nr))?,
        })
    }

    fn area_mut(&mut self, region: Region) -> Result<&mut MemoryArea, MemoryError> {
        Ok(match region {
            Region::Inputs => &mut self.inputs,
            Region::Outputs => &mut self.outputs,
            Region::Markers => &mut self.markers,
            Region::Timers => &mut self.timers,
            Region::Counters => &mut self.counters,
            Region::Local => &mut self.local,
            Region::Db(nr) => self.data_blocks.get_mut(&nr).ok_or(MemoryError::NoSuchDataBlock(nr))?,
        })
    }

    /// Does data block `nr` exist?
    pub fn has_db(&self, nr: u16) -> bool {
        self.data_blocks.contains_key(&nr)
    }

    /// Verify an access without performing it.
    pub fn check(&self, region: Region, addr: Address, width: Width) -> Result<(), MemoryError> {
        self.area(region)?.check(addr, width)
    }

    pub fn read(&self, region: Region, addr: Address, width: Width) -> Result<u32, MemoryError> {
        self.area(region)?.read(addr, width)
    }

    pub fn write(&mut self, region: Region, addr: Address, width: Width, value: u32) -> Result<(), MemoryError> {
        self.area_mut(region)?.write(addr, width, value)
    }

    /// Apply a batch of staged writes. Every write is checked before the
    /// first one is applied, so the batch lands entirely or not at all.
    pub fn commit(&mut self, writes: &[PendingWrite]) -> Result<(), MemoryError> {
        for w in writes {
            self.check(w.region, w.addr, w.width)?;
        }
        for w in writes {
            self.write(w.region, w.addr, w.width, w.value)?;
        }
        Ok(())
    }

    /// Iterate over all areas: fixed areas first, then data blocks by number.
    pub fn areas(&self) -> impl Iterator<Item = &MemoryArea> {
        [&self.inputs, &self.outputs, &self.markers, &self.timers, &self.counters, &self.local]
            .into_iter()
            .chain(self.data_blocks.values())
    }

    /// Clear all areas to zeros.
    pub fn clear(&mut self) {
        for area in [
            &mut self.inputs,
            &mut self.outputs,
            &mut self.markers,
            &mut self.timers,
            &mut self.counters,
            &mut self.local,
        ] {
            area.clear();
        }
        for db in self.data_blocks.values_mut() {
            db.clear();
        }
    }

    /// Copy out every area's raw bytes.
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            areas: self.areas().map(|a| (a.region(), a.as_bytes().to_vec())).collect(),
        }
    }

    /// Restore raw bytes from a snapshot.
    ///
    /// The snapshot must match this store's layout exactly: the same
    /// regions in the same order, each with the same size. On mismatch
    /// nothing is modified.
    pub fn restore(&mut self, snapshot: &MemorySnapshot) -> Result<(), MemoryError> {
        if !snapshot.areas.iter().map(|(region, _)| *region).eq(self.areas().map(|a| a.region())) {
            return Err(MemoryError::SnapshotLayout);
        }
        for (region, bytes) in &snapshot.areas {
            let area = self.area(*region)?;
            if area.size() != bytes.len() {
                return Err(MemoryError::SnapshotMismatch {
                    region: *region,
                    expected: area.size(),
                    found: bytes.len(),
                });
            }
        }
        for (region, bytes) in &snapshot.areas {
            self.area_mut(*region)?.bytes.copy_from_slice(bytes);
        }
        Ok(())
    }
}

/// Raw byte contents of every area, for monitors and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub areas: Vec<(Region, Vec<u8>)>,
}

/// Errors that can occur during memory access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Access reaches past the configured end of an area.
    #[error("{width}-bit access at {region} byte {offset} exceeds area size {size}")]
    AreaBoundary { region: Region, offset: u32, width: Width, size: usize },

    #[error("data block DB{0} does not exist")]
    NoSuchDataBlock(u16),

    #[error("DB access, but no data block is open")]
    NoDataBlockOpen,

    #[error("snapshot regions do not match the memory layout")]
    SnapshotLayout,

    #[error("snapshot of {region} has {found} bytes, expected {expected}")]
    SnapshotMismatch { region: Region, expected: usize, found: usize },
}
