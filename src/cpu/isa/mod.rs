//! Instruction handlers, grouped by instruction class.
//!
//! Each group module exposes a `register` function that adds its handlers
//! to a [`DispatchTable`]. Each handler documents the status bits it
//! writes; every other bit is left alone.

use crate::cpu::execute::DispatchTable;

mod bit;
mod transfer;
mod accu;
mod math;
mod compare;
mod logic;
mod address;
mod flow;

/// Register every implemented instruction.
pub fn register_all(table: &mut DispatchTable) {
    bit::register(table);
    transfer::register(table);
    accu::register(table);
    math::register(table);
    compare::register(table);
    logic::register(table);
    address::register(table);
    flow::register(table);
}
