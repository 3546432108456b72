//! Execution engine.
//!
//! Implements the dispatch table, the per-instruction execution context
//! and the cycle loop.
//!
//! Every instruction is atomic. A handler receives an [`ExecContext`]
//! holding a *copy* of the register file and a read-only view of memory;
//! memory writes are bounds-checked and staged. Only when the handler
//! returns `Ok` does the executor commit the staged writes and copy the
//! register file back. A faulting instruction leaves no trace.

use std::collections::HashMap;
use thiserror::Error;
use crate::config::CpuConfig;
use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::isa;
use crate::cpu::memory::{MemoryError, MemoryStore, PendingWrite};
use crate::cpu::operand::{self, Operand};
use crate::cpu::registers::{Accu, CpuState, StatusWord};
use crate::word::{Address, Width, Widths};

/// What the loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next instruction.
    Next,
    /// Continue at the given instruction index.
    Jump(usize),
    /// End the block.
    End,
}

/// An instruction handler.
pub type Handler = fn(&mut ExecContext<'_>, &Instruction) -> Result<Flow, Fault>;

/// Opcode → handler map. Built explicitly, owned by the [`Executor`].
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<Opcode, Handler>,
}

impl DispatchTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table with every implemented instruction registered.
    pub fn standard() -> Self {
        let mut table = Self::new();
        isa::register_all(&mut table);
        table
    }

    /// Register (or replace) the handler for `opcode`.
    pub fn register(&mut self, opcode: Opcode, handler: Handler) {
        self.handlers.insert(opcode, handler);
    }

    pub fn get(&self, opcode: Opcode) -> Option<Handler> {
        self.handlers.get(&opcode).copied()
    }

    pub fn contains(&self, opcode: Opcode) -> bool {
        self.handlers.contains_key(&opcode)
    }

    /// Number of registered opcodes.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ops: Vec<_> = self.handlers.keys().copied().collect();
        ops.sort();
        f.debug_struct("DispatchTable").field("opcodes", &ops).finish()
    }
}

// ===== Execution context =====

/// The world as one handler sees it.
pub struct ExecContext<'a> {
    /// Working copy of the register file.
    pub cpu: CpuState,
    mem: &'a MemoryStore,
    writes: Vec<PendingWrite>,
    four_accus: bool,
}

impl<'a> ExecContext<'a> {
    pub fn new(cpu: CpuState, mem: &'a MemoryStore, four_accus: bool) -> Self {
        Self { cpu, mem, writes: Vec::new(), four_accus }
    }

    /// Is this a 4-accumulator CPU?
    #[inline]
    pub fn four_accus(&self) -> bool {
        self.four_accus
    }

    #[inline]
    pub fn status(&mut self) -> &mut StatusWord {
        &mut self.cpu.status
    }

    /// Read an operand's value, enforcing the accepted widths.
    ///
    /// A fully qualified DB operand opens its data block.
    pub fn fetch(&mut self, op: &Operand, accept: Widths) -> Result<u32, Fault> {
        let value = operand::resolve(op, &self.cpu, self.mem, accept)?;
        self.open_qualified_db(op);
        Ok(value)
    }

    /// Read a bit operand.
    pub fn fetch_bit(&mut self, op: &Operand) -> Result<bool, Fault> {
        Ok(self.fetch(op, Widths::BIT)? != 0)
    }

    /// Stage a write of the low bits of `value` to a memory operand.
    ///
    /// `STW` as a target replaces the status word. The write is
    /// bounds-checked now and applied on commit.
    pub fn store(&mut self, op: &Operand, accept: Widths, value: u32) -> Result<(), Fault> {
        if let Operand::StatusWord = op {
            if !accept.contains(Width::Word) {
                return Err(Fault::Width { width: Width::Word, accept });
            }
            self.cpu.status = StatusWord::from_word(value as u16);
            return Ok(());
        }
        let loc = operand::locate(op, &self.cpu, self.mem)?;
        if !accept.contains(loc.width) {
            return Err(Fault::Width { width: loc.width, accept });
        }
        self.mem.check(loc.region, loc.addr, loc.width)?;
        self.writes.push(PendingWrite {
            region: loc.region,
            addr: loc.addr,
            width: loc.width,
            value: value & loc.width.mask(),
        });
        self.open_qualified_db(op);
        Ok(())
    }

    pub fn store_bit(&mut self, op: &Operand, value: bool) -> Result<(), Fault> {
        self.store(op, Widths::BIT, value as u32)
    }

    /// Does data block `number` exist?
    pub fn has_db(&self, number: u16) -> bool {
        self.mem.has_db(number)
    }

    fn open_qualified_db(&mut self, op: &Operand) {
        if let Operand::DbMem { db, .. } = op {
            self.cpu.db_register = Some(*db);
        }
    }

    #[inline]
    pub fn accu1(&self) -> u32 {
        self.cpu.accu(Accu::A1)
    }

    #[inline]
    pub fn accu2(&self) -> u32 {
        self.cpu.accu(Accu::A2)
    }

    /// `L`: ACCU1 moves to ACCU2, then `value` becomes ACCU1.
    pub fn push_accu1(&mut self, value: u32) {
        let accu1 = self.accu1();
        self.cpu.load_accu(Accu::A2, accu1);
        self.cpu.load_accu(Accu::A1, value);
    }

    /// After two-operand integer math a 4-accu CPU moves ACCU3 to ACCU2
    /// and ACCU4 to ACCU3.
    pub fn pop_after_math(&mut self) {
        if self.four_accus {
            let (a3, a4) = (self.cpu.accu(Accu::A3), self.cpu.accu(Accu::A4));
            self.cpu.load_accu(Accu::A2, a3);
            self.cpu.load_accu(Accu::A3, a4);
        }
    }

    /// Consume the context, yielding the new state and the staged writes.
    pub fn finish(self) -> (CpuState, Vec<PendingWrite>) {
        (self.cpu, self.writes)
    }
}

/// The operand a handler needs. Instructions built through
/// [`Instruction::new`] always carry it when the opcode requires one.
pub fn required(insn: &Instruction) -> Result<&Operand, Fault> {
    insn.operand().ok_or(Fault::MissingOperand(insn.opcode()))
}

// ===== Executor =====

/// Applies instructions to one CPU's state and memory.
#[derive(Debug, Clone)]
pub struct Executor {
    table: DispatchTable,
    four_accus: bool,
    insn_limit: Option<u64>,
}

impl Executor {
    /// An executor with the standard dispatch table.
    pub fn new(config: &CpuConfig) -> Self {
        Self::with_table(DispatchTable::standard(), config)
    }

    /// An executor with a caller-supplied dispatch table.
    pub fn with_table(table: DispatchTable, config: &CpuConfig) -> Self {
        Self {
            table,
            four_accus: config.four_accus(),
            insn_limit: config.insn_limit,
        }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Execute one instruction atomically.
    ///
    /// On error neither `cpu` nor `mem` has been touched.
    pub fn step(&self, cpu: &mut CpuState, mem: &mut MemoryStore, insn: &Instruction) -> Result<Flow, Fault> {
        let handler = self
            .table
            .get(insn.opcode())
            .ok_or(Fault::Unimplemented(insn.opcode()))?;

        let mut ctx = ExecContext::new(*cpu, mem, self.four_accus);
        let flow = handler(&mut ctx, insn)?;
        let (state, writes) = ctx.finish();

        mem.commit(&writes)?;
        *cpu = state;
        Ok(flow)
    }

    /// Run the program from index 0 until it ends, a block end executes,
    /// or a fault occurs.
    ///
    /// Returns the number of instructions executed.
    pub fn run_cycle(
        &self,
        cpu: &mut CpuState,
        mem: &mut MemoryStore,
        program: &[Instruction],
    ) -> Result<u64, CycleError> {
        self.run_cycle_with(cpu, mem, program, |_, _, _| {})
    }

    /// [`run_cycle`](Self::run_cycle), calling `observe` with the index,
    /// the instruction and the committed register file after every
    /// instruction that completes.
    pub fn run_cycle_with<F>(
        &self,
        cpu: &mut CpuState,
        mem: &mut MemoryStore,
        program: &[Instruction],
        mut observe: F,
    ) -> Result<u64, CycleError>
    where
        F: FnMut(usize, &Instruction, &CpuState),
    {
        let mut index = 0;
        let mut executed = 0u64;

        while let Some(insn) = program.get(index) {
            if let Some(limit) = self.insn_limit {
                if executed >= limit {
                    log::warn!("Instruction limit of {} reached at {:04}", limit, index);
                    return Err(CycleError { index, fault: Fault::InsnLimit(limit) });
                }
            }

            log::trace!("{:04}: {}", index, insn);
            let flow = self.step(cpu, mem, insn).map_err(|fault| {
                log::warn!("Fault at {:04} ({}): {}", index, insn, fault);
                CycleError { index, fault }
            })?;
            executed += 1;
            observe(index, insn, cpu);

            match flow {
                Flow::Next => index += 1,
                Flow::Jump(target) => index = target,
                Flow::End => break,
            }
        }

        log::debug!("Cycle finished after {} instructions", executed);
        Ok(executed)
    }
}

// ===== Errors =====

/// Runtime faults raised by a single instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("operand '{operand}' is not a {expected}")]
    OperandType { operand: String, expected: &'static str },

    #[error("{width}-bit operand not allowed here (expected {accept} bits)")]
    Width { width: Width, accept: Widths },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("instruction {0} is not implemented")]
    Unimplemented(Opcode),

    #[error("instruction {0} is missing its operand")]
    MissingOperand(Opcode),

    #[error("pointer area code {0:#04X} has no memory area")]
    InvalidAreaCode(u8),

    #[error("{width}-bit access at {addr} is not byte aligned")]
    BitOffset { addr: Address, width: Width },

    #[error("instruction limit of {0} per cycle exceeded")]
    InsnLimit(u64),
}

impl Fault {
    pub fn operand_type(operand: &Operand, expected: &'static str) -> Self {
        Fault::OperandType { operand: operand.to_string(), expected }
    }
}

/// A fault together with the index of the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("instruction {index}: {fault}")]
pub struct CycleError {
    pub index: usize,
    #[source]
    pub fault: Fault,
}
