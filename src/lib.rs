//! # stlsim
//!
//! Instruction execution core for Siemens-style AWL/STL PLC programs.
//!
//! The crate simulates the register machine of an S7-300/400 class CPU:
//! accumulators, address registers, the status word and the DB register,
//! together with the I, Q, M, T, C and L areas and numbered data blocks.
//! Programs arrive already decoded as [`Instruction`] sequences; every
//! instruction executes atomically against that state.

pub mod word;
pub mod config;
pub mod cpu;
pub mod plc;
pub mod program;

// Re-export commonly used types
pub use word::{Address, Area, Pointer, Width, Widths};
pub use config::{ConfigError, CpuConfig, Mnemonics};
pub use cpu::{CpuState, CycleError, Executor, Fault, Instruction, MemoryStore, Opcode, Operand};
pub use plc::{Plc, PlcError, PlcSnapshot, RunMode};
pub use program::{listing, load_program, save_program, ProgramError, ProgramFile};
