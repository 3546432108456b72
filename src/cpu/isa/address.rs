//! Address register instructions: `+AR1 +AR2 LAR1 LAR2 TAR1 TAR2 CAR`.
//!
//! None of these write status bits.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::operand::{to_pointer_value, Operand};
use crate::cpu::registers::{Accu, Ar};
use crate::word::Widths;

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::PlusAr1, |c, i| plus_ar(c, i, Ar::Ar1));
    table.register(Opcode::PlusAr2, |c, i| plus_ar(c, i, Ar::Ar2));
    table.register(Opcode::Lar1, |c, i| lar(c, i, Ar::Ar1));
    table.register(Opcode::Lar2, |c, i| lar(c, i, Ar::Ar2));
    table.register(Opcode::Tar1, |c, i| tar(c, i, Ar::Ar1));
    table.register(Opcode::Tar2, |c, i| tar(c, i, Ar::Ar2));
    table.register(Opcode::Car, car);
}

/// `+AR1` / `+AR2`: add to the offset part of an address register.
///
/// The increment is the pointer constant's offset, or ACCU1-L taken as a
/// signed 16-bit value. The area byte never changes and the offset wraps
/// modulo 2^24.
fn plus_ar(ctx: &mut ExecContext<'_>, insn: &Instruction, ar: Ar) -> Result<Flow, Fault> {
    let increment = match insn.operand() {
        Some(op) => to_pointer_value(op)?,
        None => ctx.cpu.accu_i16(Accu::A1) as i32 as u32,
    };
    let updated = ctx.cpu.ar_pointer(ar).add_offset(increment);
    ctx.cpu.set_ar(ar, updated.raw());
    Ok(Flow::Next)
}

/// `LARn`: load an address register from ACCU1, a pointer constant, AR2 or
/// a doubleword in memory.
fn lar(ctx: &mut ExecContext<'_>, insn: &Instruction, ar: Ar) -> Result<Flow, Fault> {
    let value = match insn.operand() {
        None => ctx.accu1(),
        Some(Operand::Pointer { pointer }) => pointer.raw(),
        Some(Operand::Register { ar: source }) => ctx.cpu.get_ar(*source),
        Some(op) => ctx.fetch(op, Widths::DWORD)?,
    };
    ctx.cpu.set_ar(ar, value);
    Ok(Flow::Next)
}

/// `TARn`: without operand ACCU1 moves to ACCU2 and the register is loaded
/// into ACCU1. `TAR1 AR2` copies AR1 into AR2; otherwise the register is
/// stored to a doubleword in memory.
fn tar(ctx: &mut ExecContext<'_>, insn: &Instruction, ar: Ar) -> Result<Flow, Fault> {
    let value = ctx.cpu.get_ar(ar);
    match insn.operand() {
        None => ctx.push_accu1(value),
        Some(Operand::Register { ar: target }) => ctx.cpu.set_ar(*target, value),
        Some(op) => ctx.store(op, Widths::DWORD, value)?,
    }
    Ok(Flow::Next)
}

/// `CAR`: exchange AR1 and AR2.
fn car(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let (ar1, ar2) = (ctx.cpu.get_ar(Ar::Ar1), ctx.cpu.get_ar(Ar::Ar2));
    ctx.cpu.set_ar(Ar::Ar1, ar2);
    ctx.cpu.set_ar(Ar::Ar2, ar1);
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::isa::testing::{mw, Machine};
    use crate::word::{Address, Area, Pointer, Width};

    fn p(byte: u32, bit: u8) -> Option<Operand> {
        Some(Operand::pointer(Pointer::internal(Address::new(byte, bit))))
    }

    #[test]
    fn test_plus_ar_from_accu1() {
        let mut cpu = Machine::new();
        cpu.cpu.set_ar(Ar::Ar1, 0x1000_0000);
        cpu.accus(5, 0);
        cpu.run(Opcode::PlusAr1, None);
        assert_eq!(cpu.cpu.get_ar(Ar::Ar1), 0x1000_0005);
    }

    #[test]
    fn test_plus_ar_wraps_and_keeps_area() {
        let mut cpu = Machine::new();
        cpu.cpu.set_ar(Ar::Ar2, 0x84FF_FFFF);
        cpu.accus(1, 0);
        cpu.run(Opcode::PlusAr2, None);
        assert_eq!(cpu.cpu.get_ar(Ar::Ar2), 0x8400_0000);
    }

    #[test]
    fn test_plus_ar_negative_accu1() {
        let mut cpu = Machine::new();
        cpu.cpu.set_ar(Ar::Ar1, 0x8300_0010);
        // ACCU1-L = -8; ACCU1-H is ignored
        cpu.accus(0x1234_FFF8, 0);
        cpu.run(Opcode::PlusAr1, None);
        assert_eq!(cpu.cpu.get_ar(Ar::Ar1), 0x8300_0008);
    }

    #[test]
    fn test_plus_ar_pointer_constant() {
        let mut cpu = Machine::new();
        cpu.cpu.set_ar(Ar::Ar1, 0x8300_0000);
        cpu.run(Opcode::PlusAr1, p(2, 1));
        assert_eq!(cpu.cpu.get_ar(Ar::Ar1), 0x8300_0011);

        // the area byte of an area-crossing constant is ignored
        let crossing = Operand::pointer(Pointer::crossing(Area::Inputs, Address::new(1, 0)));
        cpu.run(Opcode::PlusAr1, Some(crossing));
        assert_eq!(cpu.cpu.get_ar(Ar::Ar1), 0x8300_0019);
    }

    #[test]
    fn test_plus_ar_touches_no_status_bits() {
        let mut cpu = Machine::new();
        cpu.cpu.status = crate::cpu::StatusWord::from_word(0x1FF);
        cpu.run(Opcode::PlusAr2, p(1, 0));
        assert_eq!(cpu.cpu.status.to_word(), 0x1FF);
    }

    #[test]
    fn test_lar_sources() {
        let mut cpu = Machine::new();
        cpu.accus(0x8300_0020, 0);
        cpu.run(Opcode::Lar1, None);
        assert_eq!(cpu.cpu.get_ar(Ar::Ar1), 0x8300_0020);

        let crossing = Operand::pointer(Pointer::crossing(Area::DataBlock, Address::new(4, 0)));
        cpu.run(Opcode::Lar2, Some(crossing));
        assert_eq!(cpu.cpu.get_ar(Ar::Ar2), 0x8400_0020);

        cpu.run(Opcode::Lar1, Some(Operand::Register { ar: Ar::Ar2 }));
        assert_eq!(cpu.cpu.get_ar(Ar::Ar1), 0x8400_0020);

        cpu.accus(0x8100_0008, 0);
        cpu.run(Opcode::T, mw(0, Width::DWord));
        cpu.run(Opcode::Lar2, mw(0, Width::DWord));
        assert_eq!(cpu.cpu.get_ar(Ar::Ar2), 0x8100_0008);

        assert!(matches!(cpu.exec(Opcode::Lar2, mw(0, Width::Word)), Err(Fault::Width { .. })));
    }

    #[test]
    fn test_tar_targets() {
        let mut cpu = Machine::new();
        cpu.cpu.set_ar(Ar::Ar1, 0x8300_0040);
        cpu.accus(7, 0);
        cpu.run(Opcode::Tar1, None);
        assert_eq!((cpu.a1(), cpu.a2()), (0x8300_0040, 7));

        cpu.run(Opcode::Tar1, Some(Operand::Register { ar: Ar::Ar2 }));
        assert_eq!(cpu.cpu.get_ar(Ar::Ar2), 0x8300_0040);

        cpu.run(Opcode::Tar2, mw(4, Width::DWord));
        assert_eq!(cpu.marker(4, Width::DWord), 0x8300_0040);
    }

    #[test]
    fn test_car() {
        let mut cpu = Machine::new();
        cpu.cpu.set_ar(Ar::Ar1, 1);
        cpu.cpu.set_ar(Ar::Ar2, 2);
        cpu.run(Opcode::Car, None);
        assert_eq!((cpu.cpu.get_ar(Ar::Ar1), cpu.cpu.get_ar(Ar::Ar2)), (2, 1));
    }
}
