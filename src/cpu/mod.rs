//! The S7 instruction-execution core.
//!
//! This module implements the register machine:
//! - register file: 4 accumulators, AR1/AR2, status word, DB register
//! - memory areas I, Q, M, T, C, L and numbered data blocks
//! - operand resolution (direct, DB-qualified, register and memory indirect)
//! - a closed opcode set dispatched through an explicit handler table

pub mod memory;
pub mod registers;
pub mod operand;
pub mod decode;
pub mod execute;
mod isa;

pub use memory::{MemoryArea, MemoryError, MemorySnapshot, MemoryStore, PendingWrite, Region};
pub use registers::{Accu, Ar, CpuState, StatusWord};
pub use operand::{locate, resolve, to_pointer_value, Location, Operand, StatusBit};
pub use decode::{InsnError, Instruction, Opcode};
pub use execute::{CycleError, DispatchTable, ExecContext, Executor, Fault, Flow, Handler};
