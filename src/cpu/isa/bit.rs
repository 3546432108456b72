//! Bit logic: `U UN O ON X XN = S R NOT SET CLR SAVE FP FN`.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{required, DispatchTable, ExecContext, Fault, Flow};

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::U, |c, i| and(c, i, false));
    table.register(Opcode::Un, |c, i| and(c, i, true));
    table.register(Opcode::O, or);
    table.register(Opcode::On, |c, i| or_bit(c, i, true));
    table.register(Opcode::X, |c, i| xor(c, i, false));
    table.register(Opcode::Xn, |c, i| xor(c, i, true));
    table.register(Opcode::Assign, assign);
    table.register(Opcode::S, |c, i| set_reset(c, i, true));
    table.register(Opcode::R, |c, i| set_reset(c, i, false));
    table.register(Opcode::Not, not);
    table.register(Opcode::Set, |c, _| force_rlo(c, true));
    table.register(Opcode::Clr, |c, _| force_rlo(c, false));
    table.register(Opcode::Save, save);
    table.register(Opcode::Fp, |c, i| edge(c, i, true));
    table.register(Opcode::Fn, |c, i| edge(c, i, false));
}

/// `U` / `UN`. Writes STA, RLO, /FC := 1. A pending OR term (from `O`
/// without operand) is folded into the result.
fn and(ctx: &mut ExecContext<'_>, insn: &Instruction, negate: bool) -> Result<Flow, Fault> {
    let bit = ctx.fetch_bit(required(insn)?)?;
    let value = bit ^ negate;
    let s = ctx.status();
    s.rlo = (if s.fc { s.rlo && value } else { value }) || s.or;
    s.sta = bit;
    s.fc = true;
    Ok(Flow::Next)
}

/// `O` with an operand is an OR scan; without one it opens an
/// and-before-or term: OR := RLO, STA := 1, /FC := 0.
fn or(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    if insn.operand().is_some() {
        return or_bit(ctx, insn, false);
    }
    let s = ctx.status();
    s.or = s.rlo;
    s.sta = true;
    s.fc = false;
    Ok(Flow::Next)
}

/// `O` / `ON`. Writes OR := 0, STA, RLO, /FC := 1.
fn or_bit(ctx: &mut ExecContext<'_>, insn: &Instruction, negate: bool) -> Result<Flow, Fault> {
    let bit = ctx.fetch_bit(required(insn)?)?;
    let value = bit ^ negate;
    let s = ctx.status();
    s.rlo = if s.fc { s.rlo || value } else { value };
    s.or = false;
    s.sta = bit;
    s.fc = true;
    Ok(Flow::Next)
}

/// `X` / `XN`. Writes OR := 0, STA, RLO, /FC := 1.
fn xor(ctx: &mut ExecContext<'_>, insn: &Instruction, negate: bool) -> Result<Flow, Fault> {
    let bit = ctx.fetch_bit(required(insn)?)?;
    let value = bit ^ negate;
    let s = ctx.status();
    s.rlo = if s.fc { s.rlo ^ value } else { value };
    s.or = false;
    s.sta = bit;
    s.fc = true;
    Ok(Flow::Next)
}

/// Closes a logic string: OR := 0, STA := RLO, /FC := 0.
fn end_string(ctx: &mut ExecContext<'_>) {
    let s = ctx.status();
    s.or = false;
    s.sta = s.rlo;
    s.fc = false;
}

/// `=`: write RLO to the bit.
fn assign(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    let rlo = ctx.cpu.status.rlo;
    ctx.store_bit(required(insn)?, rlo)?;
    end_string(ctx);
    Ok(Flow::Next)
}

/// `S` / `R`: write `value` to the bit if RLO is set.
fn set_reset(ctx: &mut ExecContext<'_>, insn: &Instruction, value: bool) -> Result<Flow, Fault> {
    let op = required(insn)?;
    if ctx.cpu.status.rlo {
        ctx.store_bit(op, value)?;
    } else {
        // the operand is still checked even when nothing is written
        ctx.fetch_bit(op)?;
    }
    end_string(ctx);
    Ok(Flow::Next)
}

/// `NOT`: RLO inverted, STA := 1.
fn not(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let s = ctx.status();
    s.rlo = !s.rlo;
    s.sta = true;
    Ok(Flow::Next)
}

/// `SET` / `CLR`: OR := 0, STA := RLO := value, /FC := 0.
fn force_rlo(ctx: &mut ExecContext<'_>, value: bool) -> Result<Flow, Fault> {
    let s = ctx.status();
    s.or = false;
    s.sta = value;
    s.rlo = value;
    s.fc = false;
    Ok(Flow::Next)
}

/// `SAVE`: BR := RLO.
fn save(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let s = ctx.status();
    s.br = s.rlo;
    Ok(Flow::Next)
}

/// `FP` / `FN`: edge detection against an edge memory bit.
///
/// The edge bit receives the current RLO. RLO becomes 1 for exactly one
/// scan after a rising (`FP`) or falling (`FN`) RLO edge.
/// Writes OR := 0, STA := old edge bit, RLO, /FC := 1.
fn edge(ctx: &mut ExecContext<'_>, insn: &Instruction, rising: bool) -> Result<Flow, Fault> {
    let op = required(insn)?;
    let memory = ctx.fetch_bit(op)?;
    let rlo = ctx.cpu.status.rlo;
    ctx.store_bit(op, rlo)?;

    let s = ctx.status();
    s.rlo = if rising { rlo && !memory } else { !rlo && memory };
    s.or = false;
    s.sta = memory;
    s.fc = true;
    Ok(Flow::Next)
}
