//! Load and transfer: `L T AUF`.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{required, DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::memory::MemoryError;
use crate::cpu::operand::Operand;
use crate::word::Widths;

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::L, load);
    table.register(Opcode::T, transfer);
    table.register(Opcode::Auf, open_db);
}

/// `L`: ACCU2 := ACCU1, ACCU1 := operand (zero-extended).
///
/// A pointer constant loads the full 32-bit pointer, area byte included.
fn load(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    let value = match required(insn)? {
        Operand::Pointer { pointer } => pointer.raw(),
        op => ctx.fetch(op, Widths::DATA)?,
    };
    ctx.push_accu1(value);
    Ok(Flow::Next)
}

/// `T`: store the low bits of ACCU1 at the operand's width.
fn transfer(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    let value = ctx.accu1();
    ctx.store(required(insn)?, Widths::DATA, value)?;
    Ok(Flow::Next)
}

/// `AUF DB n`: open a data block.
fn open_db(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    match required(insn)? {
        Operand::Db { number } => {
            if !ctx.has_db(*number) {
                return Err(MemoryError::NoSuchDataBlock(*number).into());
            }
            ctx.cpu.db_register = Some(*number);
            Ok(Flow::Next)
        }
        op => Err(Fault::operand_type(op, "data block")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::isa::testing::{mw, Machine};
    use crate::word::{Address, Area, Pointer, Width};

    #[test]
    fn test_load_shifts_accu1_into_accu2() {
        let mut cpu = Machine::new();
        cpu.run(Opcode::L, Some(Operand::int(5)));
        cpu.run(Opcode::L, Some(Operand::int(-1)));
        assert_eq!(cpu.a2(), 5);
        // a 16-bit constant is loaded zero-extended
        assert_eq!(cpu.a1(), 0xFFFF);
        cpu.run(Opcode::L, Some(Operand::dint(-1)));
        assert_eq!(cpu.a1(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_load_pointer_keeps_area_byte() {
        let mut cpu = Machine::new();
        let p = Pointer::crossing(Area::Markers, Address::new(2, 1));
        cpu.run(Opcode::L, Some(Operand::pointer(p)));
        assert_eq!(cpu.a1(), 0x8300_0011);
    }

    #[test]
    fn test_transfer_widths() {
        let mut cpu = Machine::new();
        cpu.accus(0x1122_3344, 0);
        cpu.run(Opcode::T, mw(0, Width::Byte));
        cpu.run(Opcode::T, mw(2, Width::Word));
        cpu.run(Opcode::T, mw(4, Width::DWord));
        assert_eq!(cpu.marker(0, Width::Byte), 0x44);
        assert_eq!(cpu.marker(2, Width::Word), 0x3344);
        assert_eq!(cpu.marker(4, Width::DWord), 0x1122_3344);
        // T leaves the accumulators alone
        assert_eq!(cpu.a1(), 0x1122_3344);
    }

    #[test]
    fn test_load_memory_width() {
        let mut cpu = Machine::new();
        cpu.accus(0xAABB_CCDD, 0);
        cpu.run(Opcode::T, mw(8, Width::DWord));
        cpu.run(Opcode::L, mw(8, Width::Byte));
        assert_eq!(cpu.a1(), 0xAA);
        cpu.run(Opcode::L, mw(10, Width::Word));
        assert_eq!(cpu.a1(), 0xCCDD);
    }

    #[test]
    fn test_load_byte_constant_too_wide() {
        let mut cpu = Machine::new();
        let err = cpu.exec(Opcode::L, Some(Operand::imm(0x100, Width::Byte))).unwrap_err();
        assert!(matches!(err, Fault::Width { .. }));
    }

    #[test]
    fn test_open_db() {
        let mut cpu = Machine::new();
        let dbw = Some(Operand::mem(Area::DataBlock, 0, 0, Width::Word));
        assert!(matches!(
            cpu.exec(Opcode::L, dbw.clone()),
            Err(Fault::Memory(MemoryError::NoDataBlockOpen))
        ));

        cpu.run(Opcode::Auf, Some(Operand::Db { number: 1 }));
        assert_eq!(cpu.cpu.db_register, Some(1));
        cpu.run(Opcode::L, dbw);

        assert_eq!(
            cpu.exec(Opcode::Auf, Some(Operand::Db { number: 9 })),
            Err(Fault::Memory(MemoryError::NoSuchDataBlock(9)))
        );
        assert_eq!(cpu.cpu.db_register, Some(1));
    }

    #[test]
    fn test_transfer_status_word() {
        let mut cpu = Machine::new();
        cpu.cpu.status.rlo = true;
        cpu.cpu.status.cc1 = true;
        cpu.run(Opcode::L, Some(Operand::StatusWord));
        assert_eq!(cpu.a1(), 0x82);
        cpu.run(Opcode::L, Some(Operand::int(0x100)));
        cpu.run(Opcode::T, Some(Operand::StatusWord));
        assert!(cpu.cpu.status.br);
        assert!(!cpu.cpu.status.rlo);
    }
}
