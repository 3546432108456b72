//! Word logic (`UW OW XOW UD OD XOD`) and shifts/rotates
//! (`SLW SRW SLD SRD SSI SSD RLD RRD`).

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::registers::Accu;
use crate::word::{arith, Conditions, Width, Widths};

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::Uw, |c, i| word_logic(c, i, Width::Word, |a, b| a & b));
    table.register(Opcode::Ow, |c, i| word_logic(c, i, Width::Word, |a, b| a | b));
    table.register(Opcode::Xow, |c, i| word_logic(c, i, Width::Word, |a, b| a ^ b));
    table.register(Opcode::Ud, |c, i| word_logic(c, i, Width::DWord, |a, b| a & b));
    table.register(Opcode::Od, |c, i| word_logic(c, i, Width::DWord, |a, b| a | b));
    table.register(Opcode::Xod, |c, i| word_logic(c, i, Width::DWord, |a, b| a ^ b));

    table.register(Opcode::Slw, |c, i| shift(c, i, Width::Word, arith::shift_left));
    table.register(Opcode::Srw, |c, i| shift(c, i, Width::Word, arith::shift_right));
    table.register(Opcode::Ssi, |c, i| shift(c, i, Width::Word, arith::shift_right_signed));
    table.register(Opcode::Sld, |c, i| shift(c, i, Width::DWord, arith::shift_left));
    table.register(Opcode::Srd, |c, i| shift(c, i, Width::DWord, arith::shift_right));
    table.register(Opcode::Ssd, |c, i| shift(c, i, Width::DWord, arith::shift_right_signed));
    table.register(Opcode::Rld, |c, i| shift(c, i, Width::DWord, |v, _, n| arith::rotate_left(v, n)));
    table.register(Opcode::Rrd, |c, i| shift(c, i, Width::DWord, |v, _, n| arith::rotate_right(v, n)));
}

/// ACCU1 := ACCU1 op (constant or ACCU2), at `width`.
/// Writes CC1 := result ≠ 0, CC0 := 0, OV := 0.
fn word_logic(
    ctx: &mut ExecContext<'_>,
    insn: &Instruction,
    width: Width,
    op: fn(u32, u32) -> u32,
) -> Result<Flow, Fault> {
    let other = match insn.operand() {
        Some(constant) => ctx.fetch(constant, Widths::from(width))?,
        None => ctx.cpu.get_accu(Accu::A2, width),
    };
    let result = op(ctx.cpu.get_accu(Accu::A1, width), other) & width.mask();
    ctx.cpu.set_accu(Accu::A1, width, result);
    ctx.status().set_conditions(Conditions::nonzero(result));
    Ok(Flow::Next)
}

/// Shift or rotate ACCU1 (ACCU1-L for word forms).
///
/// The count is the constant operand, or ACCU2-LL without one. A count of
/// zero changes nothing. Otherwise writes CC1 := last bit shifted out,
/// CC0 := 0, OV := 0.
fn shift(
    ctx: &mut ExecContext<'_>,
    insn: &Instruction,
    width: Width,
    op: fn(u32, u32, u32) -> Option<(u32, Conditions)>,
) -> Result<Flow, Fault> {
    let count = match insn.operand() {
        Some(constant) => ctx.fetch(constant, Widths::BYTE.or(Widths::BIT))?,
        None => ctx.cpu.get_accu(Accu::A2, Width::Byte),
    };
    if let Some((result, conditions)) = op(ctx.cpu.get_accu(Accu::A1, width), width.bits(), count) {
        ctx.cpu.set_accu(Accu::A1, width, result);
        ctx.status().set_conditions(conditions);
    }
    Ok(Flow::Next)
}
