//! Integer math: `+I -I *I /I +D -D *D /D MOD +`.
//!
//! Two-operand math computes `ACCU2 op ACCU1` into ACCU1 and latches
//! CC1, CC0, OV and OS. 16-bit operations leave ACCU1-H alone unless they
//! say otherwise.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{required, DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::operand::Operand;
use crate::cpu::registers::Accu;
use crate::word::{arith, Conditions, Width, Widths};

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::AddI, |c, _| int16(c, arith::add_i16));
    table.register(Opcode::SubI, |c, _| int16(c, arith::sub_i16));
    table.register(Opcode::MulI, mul_i);
    table.register(Opcode::DivI, div_i);
    table.register(Opcode::AddD, |c, _| int32(c, arith::add_i32));
    table.register(Opcode::SubD, |c, _| int32(c, arith::sub_i32));
    table.register(Opcode::MulD, |c, _| int32(c, arith::mul_i32));
    table.register(Opcode::DivD, |c, _| int32_checked(c, arith::div_i32));
    table.register(Opcode::Mod, |c, _| int32_checked(c, arith::mod_i32));
    table.register(Opcode::AddConst, add_const);
}

fn operands_i16(ctx: &ExecContext<'_>) -> (i16, i16) {
    (ctx.cpu.accu_i16(Accu::A2), ctx.cpu.accu_i16(Accu::A1))
}

fn operands_i32(ctx: &ExecContext<'_>) -> (i32, i32) {
    (ctx.cpu.accu_i32(Accu::A2), ctx.cpu.accu_i32(Accu::A1))
}

fn finish(ctx: &mut ExecContext<'_>, conditions: Conditions) -> Result<Flow, Fault> {
    ctx.status().set_conditions(conditions);
    ctx.pop_after_math();
    Ok(Flow::Next)
}

/// `+I` / `-I`: result into ACCU1-L.
fn int16(ctx: &mut ExecContext<'_>, op: fn(i16, i16) -> (i16, Conditions)) -> Result<Flow, Fault> {
    let (a, b) = operands_i16(ctx);
    let (result, conditions) = op(a, b);
    ctx.cpu.set_accu(Accu::A1, Width::Word, result as u16 as u32);
    finish(ctx, conditions)
}

/// `*I`: the full 32-bit product replaces ACCU1.
fn mul_i(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let (a, b) = operands_i16(ctx);
    let (product, conditions) = arith::mul_i16(a, b);
    ctx.cpu.load_accu(Accu::A1, product as u32);
    finish(ctx, conditions)
}

/// `/I`: quotient into ACCU1-L, remainder into ACCU1-H.
/// On division by zero ACCU1 is unchanged and CC1 = CC0 = OV = OS = 1.
fn div_i(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let (a, b) = operands_i16(ctx);
    let (result, conditions) = arith::div_i16(a, b);
    if let Some((quotient, remainder)) = result {
        let packed = ((remainder as u16 as u32) << 16) | quotient as u16 as u32;
        ctx.cpu.load_accu(Accu::A1, packed);
    }
    finish(ctx, conditions)
}

/// `+D` / `-D` / `*D`.
fn int32(ctx: &mut ExecContext<'_>, op: fn(i32, i32) -> (i32, Conditions)) -> Result<Flow, Fault> {
    let (a, b) = operands_i32(ctx);
    let (result, conditions) = op(a, b);
    ctx.cpu.load_accu(Accu::A1, result as u32);
    finish(ctx, conditions)
}

/// `/D` / `MOD`. ACCU1 is unchanged on division by zero.
fn int32_checked(
    ctx: &mut ExecContext<'_>,
    op: fn(i32, i32) -> (Option<i32>, Conditions),
) -> Result<Flow, Fault> {
    let (a, b) = operands_i32(ctx);
    let (result, conditions) = op(a, b);
    if let Some(result) = result {
        ctx.cpu.load_accu(Accu::A1, result as u32);
    }
    finish(ctx, conditions)
}

/// `+ n`: add a constant to ACCU1-L (16-bit) or ACCU1 (32-bit).
/// No status bits, no accumulator movement.
fn add_const(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    let op = required(insn)?;
    let width = match op {
        Operand::Imm { width, .. } => *width,
        other => return Err(Fault::operand_type(other, "constant")),
    };
    let constant = ctx.fetch(op, Widths::WORD_DWORD)?;
    match width {
        Width::Word => {
            let sum = (ctx.cpu.get_accu(Accu::A1, Width::Word) as u16).wrapping_add(constant as u16);
            ctx.cpu.set_accu(Accu::A1, Width::Word, sum as u32);
        }
        _ => {
            let sum = ctx.accu1().wrapping_add(constant);
            ctx.cpu.load_accu(Accu::A1, sum);
        }
    }
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::isa::testing::Machine;

    fn i16s(a2: i16, a1: i16) -> (u32, u32) {
        (a1 as u16 as u32, a2 as u16 as u32)
    }

    #[test]
    fn test_add_i_keeps_high_word() {
        let mut cpu = Machine::new();
        cpu.accus(0xAAAA_0003, 0x5555_0004);
        cpu.run(Opcode::AddI, None);
        assert_eq!(cpu.a1(), 0xAAAA_0007);
        assert_eq!(cpu.cc(), (1, 0, 0, 0));
        assert_eq!(cpu.a2(), 0x5555_0004, "ACCU2 unchanged on 2-accu CPUs");
    }

    #[test]
    fn test_add_i_overflow() {
        let mut cpu = Machine::new();
        let (a1, a2) = i16s(32767, 1);
        cpu.accus(a1, a2);
        cpu.run(Opcode::AddI, None);
        assert_eq!(cpu.a1() & 0xFFFF, 0x8000);
        assert_eq!(cpu.cc(), (0, 1, 1, 1));
    }

    #[test]
    fn test_sub_i_operand_order() {
        let mut cpu = Machine::new();
        // ACCU2 - ACCU1
        let (a1, a2) = i16s(3, 10);
        cpu.accus(a1, a2);
        cpu.run(Opcode::SubI, None);
        assert_eq!(cpu.a1() as u16 as i16, -7);
        assert_eq!(cpu.cc(), (0, 1, 0, 0));
    }

    #[test]
    fn test_mul_i_full_product() {
        let mut cpu = Machine::new();
        let (a1, a2) = i16s(300, 300);
        cpu.accus(a1, a2);
        cpu.run(Opcode::MulI, None);
        assert_eq!(cpu.a1(), 90_000);
        assert_eq!(cpu.cc(), (1, 0, 1, 1));
    }

    #[test]
    fn test_div_i_quotient_and_remainder() {
        let mut cpu = Machine::new();
        let (a1, a2) = i16s(-17, 5);
        cpu.accus(a1, a2);
        cpu.run(Opcode::DivI, None);
        assert_eq!(cpu.a1() as u16 as i16, -3);
        assert_eq!((cpu.a1() >> 16) as u16 as i16, -2);
        assert_eq!(cpu.cc(), (0, 1, 0, 0));
    }

    #[test]
    fn test_division_by_zero() {
        let mut cpu = Machine::new();
        cpu.accus(0, 1234);
        cpu.run(Opcode::DivI, None);
        assert_eq!(cpu.a1(), 0);
        assert_eq!(cpu.cc(), (1, 1, 1, 1));

        let mut cpu = Machine::new();
        cpu.accus(0, 99);
        cpu.run(Opcode::Mod, None);
        assert_eq!(cpu.cc(), (1, 1, 1, 1));
    }

    #[test]
    fn test_dint_math() {
        let mut cpu = Machine::new();
        cpu.accus(2, 100_000);
        cpu.run(Opcode::MulD, None);
        assert_eq!(cpu.a1(), 200_000);

        cpu.accus(7, -50i32 as u32);
        cpu.run(Opcode::DivD, None);
        assert_eq!(cpu.a1() as i32, -7);

        cpu.accus(7, -50i32 as u32);
        cpu.run(Opcode::Mod, None);
        assert_eq!(cpu.a1() as i32, -1);
        assert_eq!(cpu.cc(), (0, 1, 0, 0));

        cpu.accus(1, i32::MAX as u32);
        cpu.run(Opcode::AddD, None);
        assert_eq!(cpu.a1(), 0x8000_0000);
        assert_eq!(cpu.cc(), (0, 1, 1, 1));
    }

    #[test]
    fn test_four_accus_pop_after_math() {
        let mut cpu = Machine::with_accus(4);
        cpu.accus(1, 2);
        cpu.cpu.load_accu(Accu::A3, 30);
        cpu.cpu.load_accu(Accu::A4, 40);
        cpu.run(Opcode::AddD, None);
        assert_eq!(cpu.a1(), 3);
        assert_eq!(cpu.a2(), 30);
        assert_eq!(cpu.cpu.accu(Accu::A3), 40);
        assert_eq!(cpu.cpu.accu(Accu::A4), 40);
    }

    #[test]
    fn test_add_constant_sets_no_flags() {
        let mut cpu = Machine::new();
        cpu.accus(0x1234_FFFF, 0);
        cpu.run(Opcode::AddConst, Some(Operand::int(1)));
        assert_eq!(cpu.a1(), 0x1234_0000);
        assert_eq!(cpu.cc(), (0, 0, 0, 0));

        cpu.run(Opcode::AddConst, Some(Operand::dint(-1)));
        assert_eq!(cpu.a1(), 0x1233_FFFF);
    }
}
