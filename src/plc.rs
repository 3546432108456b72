//! The PLC: one CPU with its memory, executor and loaded program.
//!
//! [`Plc`] owns everything one simulated CPU needs and adds the operating
//! mode around the execution core. A fault during a cycle puts the PLC
//! into STOP; further cycles are refused until [`Plc::reset`] or
//! [`Plc::start`].

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::config::{ConfigError, CpuConfig, Mnemonics};
use crate::cpu::{
    Accu, Ar, CpuState, CycleError, Executor, Instruction, MemoryArea, MemoryError, MemorySnapshot,
    MemoryStore, Region,
};

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Run,
    Stop,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Run => write!(f, "RUN"),
            RunMode::Stop => write!(f, "STOP"),
        }
    }
}

/// Register file and memory contents at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlcSnapshot {
    pub state: CpuState,
    pub memory: MemorySnapshot,
}

/// A simulated PLC.
#[derive(Clone)]
pub struct Plc {
    config: CpuConfig,
    state: CpuState,
    memory: MemoryStore,
    executor: Executor,
    program: Vec<Instruction>,
    mode: RunMode,
    cycles: u64,
    instructions: u64,
    last_fault: Option<CycleError>,
}

impl Plc {
    /// Create a PLC in RUN mode with cleared state and no program.
    pub fn new(config: CpuConfig) -> Result<Self, PlcError> {
        config.validate()?;
        Ok(Self {
            state: CpuState::new(),
            memory: MemoryStore::new(&config),
            executor: Executor::new(&config),
            program: Vec::new(),
            mode: RunMode::Run,
            cycles: 0,
            instructions: 0,
            last_fault: None,
            config,
        })
    }

    /// Replace the loaded program. State and memory are kept.
    pub fn load(&mut self, program: Vec<Instruction>) {
        log::debug!("Loaded program with {} instructions", program.len());
        self.program = program;
    }

    /// Run one cycle of the loaded program.
    ///
    /// Returns the number of instructions executed. A fault switches to
    /// STOP.
    pub fn run_cycle(&mut self) -> Result<u64, PlcError> {
        self.run_cycle_with(|_, _, _| {})
    }

    /// [`run_cycle`](Self::run_cycle) with a per-instruction observer, as
    /// in [`Executor::run_cycle_with`].
    pub fn run_cycle_with<F>(&mut self, observe: F) -> Result<u64, PlcError>
    where
        F: FnMut(usize, &Instruction, &CpuState),
    {
        if self.mode == RunMode::Stop {
            return Err(PlcError::Stopped);
        }
        match self.executor.run_cycle_with(&mut self.state, &mut self.memory, &self.program, observe) {
            Ok(executed) => {
                self.cycles += 1;
                self.instructions += executed;
                Ok(executed)
            }
            Err(err) => {
                log::warn!("CPU going to STOP: {}", err);
                self.mode = RunMode::Stop;
                self.last_fault = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// Run up to `count` cycles, stopping at the first fault.
    ///
    /// Returns the total number of instructions executed.
    pub fn run_cycles(&mut self, count: u64) -> Result<u64, PlcError> {
        let mut executed = 0;
        for _ in 0..count {
            executed += self.run_cycle()?;
        }
        Ok(executed)
    }

    /// Clear registers and memory, reset counters and go to RUN.
    pub fn reset(&mut self) {
        self.state.reset();
        self.memory.clear();
        self.cycles = 0;
        self.instructions = 0;
        self.last_fault = None;
        self.mode = RunMode::Run;
    }

    /// Go back to RUN without clearing anything.
    pub fn start(&mut self) {
        self.mode = RunMode::Run;
    }

    pub fn stop(&mut self) {
        self.mode = RunMode::Stop;
    }

    pub fn snapshot(&self) -> PlcSnapshot {
        PlcSnapshot { state: self.state, memory: self.memory.snapshot() }
    }

    /// Restore a snapshot taken from a PLC with the same memory layout.
    pub fn restore(&mut self, snapshot: &PlcSnapshot) -> Result<(), PlcError> {
        self.memory.restore(&snapshot.memory)?;
        self.state = snapshot.state;
        Ok(())
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Completed cycles since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Instructions executed in completed cycles since the last reset.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn last_fault(&self) -> Option<&CycleError> {
        self.last_fault.as_ref()
    }

    /// A textual dump of the CPU in the classic monitor layout.
    pub fn dump(&self) -> String {
        let english = self.config.mnemonics == Mnemonics::English;
        let accus = if self.config.four_accus() { &Accu::ALL[..] } else { &Accu::ALL[..2] };
        let mut out = Vec::new();

        out.push(format!(
            "[S7-CPU]  {}  cycles: {}  stmts: {}",
            self.mode, self.cycles, self.instructions
        ));
        out.push(format!("    STW:  {}", self.state.status));
        out.push(format!(
            "   Accu:  {}",
            accus
                .iter()
                .map(|a| format!("{:08X}", self.state.accu(*a)))
                .collect::<Vec<_>>()
                .join("  ")
        ));
        out.push(format!(
            "     AR:  {}",
            [Ar::Ar1, Ar::Ar2]
                .iter()
                .map(|ar| format!("{:08X} ({})", self.state.get_ar(*ar), self.state.ar_pointer(*ar)))
                .collect::<Vec<_>>()
                .join("  ")
        ));
        out.push(dump_area("      M:  ", self.memory.area(Region::Markers).ok()));
        out.push(dump_area(
            if english { "      I:  " } else { "      E:  " },
            self.memory.area(Region::Inputs).ok(),
        ));
        out.push(dump_area(
            if english { "      Q:  " } else { "      A:  " },
            self.memory.area(Region::Outputs).ok(),
        ));
        out.push(format!(
            "     DB:  {}",
            self.state.db_register.map_or_else(|| "None".to_string(), |n| n.to_string())
        ));
        if let Some(fault) = &self.last_fault {
            out.push(format!("  Fault:  {}", fault));
        }
        out.join("\n")
    }
}

/// Hex bytes, 16 per line, at most 64 bytes.
fn dump_area(prefix: &str, area: Option<&MemoryArea>) -> String {
    let bytes = match area {
        Some(area) if area.size() > 0 => &area.as_bytes()[..area.size().min(64)],
        _ => return format!("{}--", prefix),
    };
    let indent = " ".repeat(prefix.len());
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<_> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            format!("{}{}", if i == 0 { prefix } else { indent.as_str() }, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Debug for Plc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plc")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("cycles", &self.cycles)
            .field("program_len", &self.program.len())
            .finish()
    }
}

/// Errors from the PLC layer.
#[derive(Debug, Error)]
pub enum PlcError {
    #[error("PLC is in STOP")]
    Stopped,

    #[error("cycle aborted: {0}")]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{Fault, Opcode, Operand};
    use crate::word::{Area, Width};

    fn plc() -> Plc {
        let mut config = CpuConfig::default();
        config.markers = 16;
        Plc::new(config).unwrap()
    }

    fn counter_program() -> Vec<Instruction> {
        // MW 0 := MW 0 + 1
        vec![
            Instruction::with(Opcode::L, Operand::mem(Area::Markers, 0, 0, Width::Word)).unwrap(),
            Instruction::with(Opcode::L, Operand::int(1)).unwrap(),
            Instruction::bare(Opcode::AddI).unwrap(),
            Instruction::with(Opcode::T, Operand::mem(Area::Markers, 0, 0, Width::Word)).unwrap(),
        ]
    }

    #[test]
    fn test_cycles_accumulate() {
        let mut plc = plc();
        plc.load(counter_program());
        assert_eq!(plc.run_cycles(3).unwrap(), 12);
        assert_eq!(plc.cycles(), 3);
        assert_eq!(
            plc.memory().read(Region::Markers, crate::word::Address::byte_address(0), Width::Word).unwrap(),
            3
        );
    }

    #[test]
    fn test_fault_stops_plc() {
        let mut plc = plc();
        plc.load(vec![Instruction::bare(Opcode::Call).unwrap()]);
        let err = plc.run_cycle().unwrap_err();
        assert!(matches!(err, PlcError::Cycle(CycleError { index: 0, fault: Fault::Unimplemented(Opcode::Call) })));
        assert_eq!(plc.mode(), RunMode::Stop);
        assert!(matches!(plc.run_cycle(), Err(PlcError::Stopped)));

        plc.reset();
        assert_eq!(plc.mode(), RunMode::Run);
        assert!(plc.last_fault().is_none());
    }

    #[test]
    fn test_observed_fault_stops_plc() {
        let mut plc = plc();
        let mut program = counter_program();
        program.push(Instruction::with(Opcode::T, Operand::mem(Area::Markers, 15, 0, Width::Word)).unwrap());
        plc.load(program);

        let mut traced = Vec::new();
        let err = plc.run_cycle_with(|index, _, _| traced.push(index)).unwrap_err();
        assert!(matches!(err, PlcError::Cycle(CycleError { index: 4, .. })));
        assert_eq!(traced, vec![0, 1, 2, 3]);
        assert_eq!(plc.mode(), RunMode::Stop);
        assert!(plc.last_fault().is_some());
        assert_eq!(plc.cycles(), 0);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut plc = plc();
        plc.load(counter_program());
        plc.run_cycle().unwrap();
        let snap = plc.snapshot();

        plc.run_cycles(5).unwrap();
        plc.restore(&snap).unwrap();
        assert_eq!(plc.snapshot(), snap);

        let json = serde_json::to_string(&snap).unwrap();
        let back: PlcSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_dump_layout() {
        let mut plc = plc();
        plc.state_mut().load_accu(Accu::A1, 0x1234);
        plc.state_mut().set_ar(Ar::Ar1, 0x8300_0010);
        let dump = plc.dump();
        assert!(dump.contains("   Accu:  00001234  00000000"));
        assert!(dump.contains("00000000 (P#0.0)"));
        assert!(dump.contains("83000010 (P#M 2.0)"));
        assert!(dump.contains("      E:  00 00"));
        assert!(dump.contains("     DB:  None"));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = CpuConfig::default();
        config.accus = 1;
        assert!(matches!(Plc::new(config), Err(PlcError::Config(ConfigError::InvalidAccuCount(1)))));
    }
}
