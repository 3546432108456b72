//! Accumulator instructions:
//! `TAK PUSH POP ENT LEAVE INC DEC CAW CAD INVI INVD NEGI NEGD`.
//!
//! None of these touch the status word except `NEGI`/`NEGD`.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{required, DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::registers::Accu;
use crate::word::{arith, Width, Widths};

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::Tak, tak);
    table.register(Opcode::Push, push);
    table.register(Opcode::Pop, pop);
    table.register(Opcode::Ent, ent);
    table.register(Opcode::Leave, leave);
    table.register(Opcode::Inc, |c, i| inc_dec(c, i, false));
    table.register(Opcode::Dec, |c, i| inc_dec(c, i, true));
    table.register(Opcode::Caw, caw);
    table.register(Opcode::Cad, cad);
    table.register(Opcode::Invi, |c, _| invert(c, Width::Word));
    table.register(Opcode::Invd, |c, _| invert(c, Width::DWord));
    table.register(Opcode::Negi, negi);
    table.register(Opcode::Negd, negd);
}

fn tak(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let (a1, a2) = (ctx.accu1(), ctx.accu2());
    ctx.cpu.load_accu(Accu::A1, a2);
    ctx.cpu.load_accu(Accu::A2, a1);
    Ok(Flow::Next)
}

/// Copy `from` into `to`, in order.
fn shuffle(ctx: &mut ExecContext<'_>, moves: &[(Accu, Accu)]) {
    for &(from, to) in moves {
        let value = ctx.cpu.accu(from);
        ctx.cpu.load_accu(to, value);
    }
}

/// `PUSH`: ACCU3 → ACCU4, ACCU2 → ACCU3 (4-accu only), ACCU1 → ACCU2.
fn push(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    if ctx.four_accus() {
        shuffle(ctx, &[(Accu::A3, Accu::A4), (Accu::A2, Accu::A3)]);
    }
    shuffle(ctx, &[(Accu::A1, Accu::A2)]);
    Ok(Flow::Next)
}

/// `POP`: ACCU2 → ACCU1, then ACCU3 → ACCU2, ACCU4 → ACCU3 (4-accu only).
fn pop(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    shuffle(ctx, &[(Accu::A2, Accu::A1)]);
    if ctx.four_accus() {
        shuffle(ctx, &[(Accu::A3, Accu::A2), (Accu::A4, Accu::A3)]);
    }
    Ok(Flow::Next)
}

/// `ENT`: ACCU3 → ACCU4, ACCU2 → ACCU3. No-op on 2-accu CPUs.
fn ent(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    if ctx.four_accus() {
        shuffle(ctx, &[(Accu::A3, Accu::A4), (Accu::A2, Accu::A3)]);
    }
    Ok(Flow::Next)
}

/// `LEAVE`: ACCU3 → ACCU2, ACCU4 → ACCU3. No-op on 2-accu CPUs.
fn leave(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    if ctx.four_accus() {
        shuffle(ctx, &[(Accu::A3, Accu::A2), (Accu::A4, Accu::A3)]);
    }
    Ok(Flow::Next)
}

/// `INC n` / `DEC n`: add to ACCU1-LL modulo 256. Other bytes unchanged.
fn inc_dec(ctx: &mut ExecContext<'_>, insn: &Instruction, decrement: bool) -> Result<Flow, Fault> {
    let n = ctx.fetch(required(insn)?, Widths::BYTE.or(Widths::BIT))? as u8;
    let low = ctx.cpu.get_accu(Accu::A1, Width::Byte) as u8;
    let low = if decrement { low.wrapping_sub(n) } else { low.wrapping_add(n) };
    ctx.cpu.set_accu(Accu::A1, Width::Byte, low as u32);
    Ok(Flow::Next)
}

/// `CAW`: swap the bytes of ACCU1-L.
fn caw(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let low = ctx.cpu.get_accu(Accu::A1, Width::Word) as u16;
    ctx.cpu.set_accu(Accu::A1, Width::Word, low.swap_bytes() as u32);
    Ok(Flow::Next)
}

/// `CAD`: reverse the byte order of ACCU1.
fn cad(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let value = ctx.accu1().swap_bytes();
    ctx.cpu.load_accu(Accu::A1, value);
    Ok(Flow::Next)
}

/// `INVI` / `INVD`: ones' complement of ACCU1-L or ACCU1.
fn invert(ctx: &mut ExecContext<'_>, width: Width) -> Result<Flow, Fault> {
    let value = !ctx.cpu.get_accu(Accu::A1, width);
    ctx.cpu.set_accu(Accu::A1, width, value);
    Ok(Flow::Next)
}

/// `NEGI`: two's complement of ACCU1-L. Writes CC1, CC0, OV, OS.
fn negi(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let (result, conditions) = arith::neg_i16(ctx.cpu.accu_i16(Accu::A1));
    ctx.cpu.set_accu(Accu::A1, Width::Word, result as u16 as u32);
    ctx.status().set_conditions(conditions);
    Ok(Flow::Next)
}

/// `NEGD`: two's complement of ACCU1. Writes CC1, CC0, OV, OS.
fn negd(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let (result, conditions) = arith::neg_i32(ctx.cpu.accu_i32(Accu::A1));
    ctx.cpu.load_accu(Accu::A1, result as u32);
    ctx.status().set_conditions(conditions);
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::isa::testing::Machine;
    use crate::cpu::operand::Operand;

    fn four(cpu: &mut Machine) {
        for (accu, value) in Accu::ALL.iter().zip([1, 2, 3, 4]) {
            cpu.cpu.load_accu(*accu, value);
        }
    }

    fn accus(cpu: &Machine) -> [u32; 4] {
        Accu::ALL.map(|a| cpu.cpu.accu(a))
    }

    #[test]
    fn test_tak() {
        let mut cpu = Machine::new();
        cpu.accus(1, 2);
        cpu.run(Opcode::Tak, None);
        assert_eq!((cpu.a1(), cpu.a2()), (2, 1));
    }

    #[test]
    fn test_push_pop_two_accus() {
        let mut cpu = Machine::new();
        four(&mut cpu);
        cpu.run(Opcode::Push, None);
        assert_eq!(accus(&cpu), [1, 1, 3, 4]);
        cpu.cpu.load_accu(Accu::A2, 7);
        cpu.run(Opcode::Pop, None);
        assert_eq!(accus(&cpu), [7, 7, 3, 4]);
    }

    #[test]
    fn test_push_pop_four_accus() {
        let mut cpu = Machine::with_accus(4);
        four(&mut cpu);
        cpu.run(Opcode::Push, None);
        assert_eq!(accus(&cpu), [1, 1, 2, 3]);
        cpu.run(Opcode::Pop, None);
        assert_eq!(accus(&cpu), [1, 2, 3, 3]);
    }

    #[test]
    fn test_ent_leave() {
        let mut cpu = Machine::with_accus(4);
        four(&mut cpu);
        cpu.run(Opcode::Ent, None);
        assert_eq!(accus(&cpu), [1, 2, 2, 3]);
        cpu.run(Opcode::Leave, None);
        assert_eq!(accus(&cpu), [1, 2, 3, 3]);

        let mut cpu = Machine::new();
        four(&mut cpu);
        cpu.run(Opcode::Ent, None);
        cpu.run(Opcode::Leave, None);
        assert_eq!(accus(&cpu), [1, 2, 3, 4]);
    }

    #[test]
    fn test_inc_dec_low_byte_only() {
        let mut cpu = Machine::new();
        cpu.accus(0x1234_56FF, 0);
        cpu.run(Opcode::Inc, Some(Operand::imm(1, Width::Byte)));
        assert_eq!(cpu.a1(), 0x1234_5600);
        cpu.run(Opcode::Dec, Some(Operand::imm(2, Width::Byte)));
        assert_eq!(cpu.a1(), 0x1234_56FE);
    }

    #[test]
    fn test_byte_swaps() {
        let mut cpu = Machine::new();
        cpu.accus(0x1122_3344, 0);
        cpu.run(Opcode::Caw, None);
        assert_eq!(cpu.a1(), 0x1122_4433);
        cpu.run(Opcode::Cad, None);
        assert_eq!(cpu.a1(), 0x3344_2211);
    }

    #[test]
    fn test_invert() {
        let mut cpu = Machine::new();
        cpu.accus(0x1234_00FF, 0);
        cpu.run(Opcode::Invi, None);
        assert_eq!(cpu.a1(), 0x1234_FF00);
        cpu.run(Opcode::Invd, None);
        assert_eq!(cpu.a1(), 0xEDCB_00FF);
    }

    #[test]
    fn test_negate_flags() {
        let mut cpu = Machine::new();
        cpu.accus(0xABCD_0005, 0);
        cpu.run(Opcode::Negi, None);
        assert_eq!(cpu.a1(), 0xABCD_FFFB);
        assert_eq!(cpu.cc(), (0, 1, 0, 0));

        cpu.accus(0x0000_8000, 0);
        cpu.run(Opcode::Negi, None);
        assert_eq!(cpu.a1() & 0xFFFF, 0x8000);
        assert_eq!(cpu.cc(), (0, 1, 1, 1));

        cpu.accus(0, 0);
        cpu.run(Opcode::Negd, None);
        assert_eq!(cpu.cc(), (0, 0, 0, 1), "OS stays set");
    }
}
