//! Jumps, block end and `NOP`.

use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::execute::{required, DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::operand::Operand;
use crate::cpu::registers::{Accu, StatusWord};
use crate::word::Width;

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::Spa, |_, i| jump_if(i, true));
    table.register(Opcode::Spb, |c, i| jump_on_rlo(c, i, true, false));
    table.register(Opcode::Spbn, |c, i| jump_on_rlo(c, i, false, false));
    table.register(Opcode::Spbb, |c, i| jump_on_rlo(c, i, true, true));
    table.register(Opcode::Spbnb, |c, i| jump_on_rlo(c, i, false, true));
    table.register(Opcode::Spbi, |c, i| jump_on_br(c, i, true));
    table.register(Opcode::Spbin, |c, i| jump_on_br(c, i, false));
    table.register(Opcode::Spz, |c, i| jump_on_status(c, i, |s| !s.cc1 && !s.cc0));
    table.register(Opcode::Spn, |c, i| jump_on_status(c, i, |s| s.cc1 != s.cc0));
    table.register(Opcode::Spp, |c, i| jump_on_status(c, i, |s| s.cc1 && !s.cc0));
    table.register(Opcode::Spm, |c, i| jump_on_status(c, i, |s| !s.cc1 && s.cc0));
    table.register(Opcode::Sppz, |c, i| jump_on_status(c, i, |s| !s.cc0));
    table.register(Opcode::Spmz, |c, i| jump_on_status(c, i, |s| !s.cc1));
    table.register(Opcode::Spu, |c, i| jump_on_status(c, i, |s| s.cc1 && s.cc0));
    table.register(Opcode::Spo, |c, i| jump_on_status(c, i, |s| s.ov));
    table.register(Opcode::Sps, jump_on_os);
    table.register(Opcode::Loop, loop_);
    table.register(Opcode::Be, |_, _| Ok(Flow::End));
    table.register(Opcode::Bea, |_, _| Ok(Flow::End));
    table.register(Opcode::Beb, beb);
    table.register(Opcode::Nop, |_, _| Ok(Flow::Next));
}

fn target(insn: &Instruction) -> Result<usize, Fault> {
    match required(insn)? {
        Operand::Label { target } => Ok(*target),
        op => Err(Fault::operand_type(op, "jump label")),
    }
}

fn jump_if(insn: &Instruction, condition: bool) -> Result<Flow, Fault> {
    let target = target(insn)?;
    Ok(if condition { Flow::Jump(target) } else { Flow::Next })
}

/// After a conditional jump on RLO: OR := 0, STA := 1, RLO := 1, /FC := 0.
fn reset_string(s: &mut StatusWord) {
    s.or = false;
    s.sta = true;
    s.rlo = true;
    s.fc = false;
}

/// `SPB` / `SPBN`, and with `save` the `SPBB` / `SPBNB` forms that also
/// copy RLO to BR.
fn jump_on_rlo(ctx: &mut ExecContext<'_>, insn: &Instruction, when: bool, save: bool) -> Result<Flow, Fault> {
    let s = ctx.status();
    let rlo = s.rlo;
    if save {
        s.br = rlo;
    }
    reset_string(s);
    jump_if(insn, rlo == when)
}

/// `SPBI` / `SPBIN`: jump on BR. Writes OR := 0, STA := 1, RLO := 1,
/// /FC := 0; BR is left as is.
fn jump_on_br(ctx: &mut ExecContext<'_>, insn: &Instruction, when: bool) -> Result<Flow, Fault> {
    let s = ctx.status();
    let br = s.br;
    reset_string(s);
    jump_if(insn, br == when)
}

/// Jumps on condition codes or OV. No status bits written.
fn jump_on_status(ctx: &mut ExecContext<'_>, insn: &Instruction, holds: fn(&StatusWord) -> bool) -> Result<Flow, Fault> {
    let condition = holds(&ctx.cpu.status);
    jump_if(insn, condition)
}

/// `SPS`: jump if OS is set. Writes OS := 0.
fn jump_on_os(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    let s = ctx.status();
    let os = s.os;
    s.os = false;
    jump_if(insn, os)
}

/// `LOOP`: decrement ACCU1-L; jump while it is non-zero.
fn loop_(ctx: &mut ExecContext<'_>, insn: &Instruction) -> Result<Flow, Fault> {
    let counter = (ctx.cpu.get_accu(Accu::A1, Width::Word) as u16).wrapping_sub(1);
    ctx.cpu.set_accu(Accu::A1, Width::Word, counter as u32);
    jump_if(insn, counter != 0)
}

/// `BEB`: end the block if RLO is set. Writes OR := 0, STA := 1,
/// RLO := 1, /FC := 0.
fn beb(ctx: &mut ExecContext<'_>, _insn: &Instruction) -> Result<Flow, Fault> {
    let s = ctx.status();
    let rlo = s.rlo;
    reset_string(s);
    Ok(if rlo { Flow::End } else { Flow::Next })
}
