//! Integer compare: `==I <>I >I <I >=I <=I` and the `D` forms.
//!
//! Compares ACCU2 against ACCU1. Writes CC1/CC0 (10 greater, 01 less,
//! 00 equal), OV := 0, OR := 0, STA := RLO := result, /FC := 1.

use std::cmp::Ordering;
use crate::cpu::decode::Opcode;
use crate::cpu::execute::{DispatchTable, ExecContext, Fault, Flow};
use crate::cpu::registers::Accu;
use crate::word::Conditions;

pub(super) fn register(table: &mut DispatchTable) {
    table.register(Opcode::EqI, |c, _| compare(c, false, Ordering::is_eq));
    table.register(Opcode::NeI, |c, _| compare(c, false, Ordering::is_ne));
    table.register(Opcode::GtI, |c, _| compare(c, false, Ordering::is_gt));
    table.register(Opcode::LtI, |c, _| compare(c, false, Ordering::is_lt));
    table.register(Opcode::GeI, |c, _| compare(c, false, Ordering::is_ge));
    table.register(Opcode::LeI, |c, _| compare(c, false, Ordering::is_le));
    table.register(Opcode::EqD, |c, _| compare(c, true, Ordering::is_eq));
    table.register(Opcode::NeD, |c, _| compare(c, true, Ordering::is_ne));
    table.register(Opcode::GtD, |c, _| compare(c, true, Ordering::is_gt));
    table.register(Opcode::LtD, |c, _| compare(c, true, Ordering::is_lt));
    table.register(Opcode::GeD, |c, _| compare(c, true, Ordering::is_ge));
    table.register(Opcode::LeD, |c, _| compare(c, true, Ordering::is_le));
}

fn compare(ctx: &mut ExecContext<'_>, dint: bool, holds: fn(Ordering) -> bool) -> Result<Flow, Fault> {
    let ordering = if dint {
        ctx.cpu.accu_i32(Accu::A2).cmp(&ctx.cpu.accu_i32(Accu::A1))
    } else {
        ctx.cpu.accu_i16(Accu::A2).cmp(&ctx.cpu.accu_i16(Accu::A1))
    };
    let result = holds(ordering);

    let s = ctx.status();
    s.set_conditions(Conditions::ordering(ordering));
    s.or = false;
    s.sta = result;
    s.rlo = result;
    s.fc = true;
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::isa::testing::Machine;

    fn cmp(op: Opcode, a2: i32, a1: i32) -> (bool, (u8, u8, u8, u8)) {
        let mut cpu = Machine::new();
        cpu.accus(a1 as u32, a2 as u32);
        cpu.run(op, None);
        (cpu.cpu.status.rlo, cpu.cc())
    }

    #[test]
    fn test_compare_condition_codes() {
        assert_eq!(cmp(Opcode::GtI, 5, 3), (true, (1, 0, 0, 0)));
        assert_eq!(cmp(Opcode::GtI, 3, 5), (false, (0, 1, 0, 0)));
        assert_eq!(cmp(Opcode::EqI, 4, 4), (true, (0, 0, 0, 0)));
        assert_eq!(cmp(Opcode::NeD, 4, 4), (false, (0, 0, 0, 0)));
        assert_eq!(cmp(Opcode::LeD, -1, 0), (true, (0, 1, 0, 0)));
        assert_eq!(cmp(Opcode::GeI, 7, 7), (true, (0, 0, 0, 0)));
        assert_eq!(cmp(Opcode::LtD, i32::MIN, i32::MAX), (true, (0, 1, 0, 0)));
    }

    #[test]
    fn test_compare_i_uses_low_words_signed() {
        // ACCU2-L = -1 (0xFFFF), ACCU1-L = 1; high words are ignored
        assert!(cmp(Opcode::LtI, 0x0000_FFFF, 0x7FFF_0001).0);
    }

    #[test]
    fn test_compare_status_bits() {
        let mut cpu = Machine::new();
        cpu.cpu.status.or = true;
        cpu.cpu.status.ov = true;
        cpu.cpu.status.os = true;
        cpu.accus(1, 1);
        cpu.run(Opcode::EqI, None);
        let s = cpu.cpu.status;
        assert!(s.rlo && s.sta && s.fc);
        assert!(!s.or && !s.ov);
        assert!(s.os, "compare does not clear OS");
    }
}
