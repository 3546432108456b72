//! Machine word primitives.
//!
//! This module provides the value-level building blocks of the S7 machine:
//! - [`Width`] / [`Widths`] - operand widths and accepted-width sets
//! - [`Area`] - the addressable memory areas
//! - [`Address`] / [`Pointer`] - byte.bit addresses and the 32-bit area pointer
//! - [`arith`] - integer arithmetic with condition-code results

mod width;
mod area;
mod pointer;
pub mod arith;

pub use width::{Width, Widths};
pub use area::Area;
pub use pointer::{Address, Pointer, AREA_MASK, OFFSET_MASK};
pub use arith::Conditions;
