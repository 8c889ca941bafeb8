//! Control flow: conditional/unconditional branches, CALL/PCALL/TCALL,
//! RET/RETI/BRK, JMP, and the compare-and-branch / decrement-and-branch
//! combined instructions.

use super::Spc700;
use super::flags::Psw;
use crate::bus::Bus;

impl Spc700 {
    /// Shared implementation for the 8 `BPL/BMI/BVC/BVS/BCC/BCS/BNE/BEQ`
    /// opcodes: branches when the named flag bit's state matches `want_set`.
    pub(crate) fn op_branch_if(&mut self, flag_bit: u8, want_set: bool, bus: &mut dyn Bus) -> u32 {
        let target = self.fetch_branch_target(bus);
        if (self.regs.psw & flag_bit != 0) == want_set {
            self.regs.pc = target;
            4
        } else {
            2
        }
    }

    pub(crate) fn op_bra(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.pc = self.fetch_branch_target(bus);
        4
    }

    /// `CBNE dp, rel`: branches unless A equals the direct-page operand.
    pub(crate) fn op_cbne_dp(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.dp_addr(bus);
        let value = bus.read(addr);
        let target = self.fetch_branch_target(bus);
        if self.regs.a != value {
            self.regs.pc = target;
            7
        } else {
            5
        }
    }

    pub(crate) fn op_cbne_dp_x(&mut self, bus: &mut dyn Bus) -> u32 {
        let dp = self.fetch_u8(bus);
        let addr = crate::bus::direct_page_addr(dp.wrapping_add(self.regs.x), self.page_flag());
        let value = bus.read(addr);
        let target = self.fetch_branch_target(bus);
        if self.regs.a != value {
            self.regs.pc = target;
            8
        } else {
            6
        }
    }

    /// `DBNZ dp, rel`: decrements the direct-page byte, branches while
    /// it's still nonzero.
    pub(crate) fn op_dbnz_dp(&mut self, bus: &mut dyn Bus) -> u32 {
        let addr = self.dp_addr(bus);
        let value = bus.read(addr).wrapping_sub(1);
        bus.write(addr, value);
        let target = self.fetch_branch_target(bus);
        if value != 0 {
            self.regs.pc = target;
            6
        } else {
            4
        }
    }

    /// `DBNZ Y, rel`: decrements Y, branches while it's still nonzero.
    pub(crate) fn op_dbnz_y(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.y = self.regs.y.wrapping_sub(1);
        let target = self.fetch_branch_target(bus);
        if self.regs.y != 0 {
            self.regs.pc = target;
            6
        } else {
            4
        }
    }

    /// `TCALL n`: calls the vector stored at $FFC0-$FFDE, indexed down
    /// from the top by `n` (n=0 is the highest vector, $FFDE/$FFDF; n=15
    /// is the lowest, $FFC0/$FFC1).
    pub(crate) fn op_tcall(&mut self, n: u8, bus: &mut dyn Bus) -> u32 {
        let vector_addr = 0xFFDEu16.wrapping_sub((n as u16) * 2);
        self.push_u16(bus, self.regs.pc);
        self.regs.pc = bus.read_word(vector_addr);
        8
    }

    /// `PCALL upage`: calls $FF00 | upage (a fixed "page FF" call area).
    pub(crate) fn op_pcall(&mut self, bus: &mut dyn Bus) -> u32 {
        let upage = self.fetch_u8(bus);
        self.push_u16(bus, self.regs.pc);
        self.regs.pc = 0xFF00 | upage as u16;
        6
    }

    pub(crate) fn op_call_abs(&mut self, bus: &mut dyn Bus) -> u32 {
        let target = self.addr_abs(bus);
        self.push_u16(bus, self.regs.pc);
        self.regs.pc = target;
        8
    }

    pub(crate) fn op_ret(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.pc = self.pop_u16(bus);
        5
    }

    pub(crate) fn op_reti(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.psw = self.pop_u8(bus);
        self.regs.pc = self.pop_u16(bus);
        6
    }

    /// `BRK`: a software interrupt through the vector at $FFDE/$FFFF,
    /// pushing PC and PSW and setting the Break flag.
    pub(crate) fn op_brk(&mut self, bus: &mut dyn Bus) -> u32 {
        self.push_u16(bus, self.regs.pc);
        self.push_u8(bus, self.regs.psw);
        self.set_flag(Psw::B, true);
        self.set_flag(Psw::I, false);
        self.regs.pc = bus.read_word(0xFFDE);
        8
    }

    pub(crate) fn op_jmp_abs(&mut self, bus: &mut dyn Bus) -> u32 {
        self.regs.pc = self.addr_abs(bus);
        3
    }

    /// `JMP [!abs+X]`: dereferences a pointer stored at `abs+X`.
    pub(crate) fn op_jmp_abs_x_indirect(&mut self, bus: &mut dyn Bus) -> u32 {
        let ptr_addr = self.addr_abs_x(bus);
        self.regs.pc = bus.read_word(ptr_addr);
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Registers;

    struct FakeBus([u8; 0x10000]);
    impl Bus for FakeBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
        fn write(&mut self, addr: u16, value: u8) {
            self.0[addr as usize] = value;
        }
    }

    #[test]
    fn call_then_ret_restores_pc() {
        let mut cpu = Spc700 { regs: Registers { sp: 0xEF, pc: 0x0200, ..Default::default() }, ..Default::default() };
        let mut bus = FakeBus([0; 0x10000]);
        bus.0[0x0200] = 0x00;
        bus.0[0x0201] = 0x10; // target 0x1000
        cpu.op_call_abs(&mut bus);
        assert_eq!(cpu.regs.pc, 0x1000);
        cpu.op_ret(&mut bus);
        assert_eq!(cpu.regs.pc, 0x0202);
        assert_eq!(cpu.regs.sp, 0xEF);
    }

    #[test]
    fn branch_taken_only_when_condition_matches() {
        let mut cpu = Spc700 { regs: Registers { sp: 0xEF, pc: 0x0200, ..Default::default() }, ..Default::default() };
        let mut bus = FakeBus([0; 0x10000]);
        bus.0[0x0200] = 0x05; // +5
        cpu.set_flag(Psw::Z, true);
        cpu.op_branch_if(Psw::Z.bits(), true, &mut bus);
        assert_eq!(cpu.regs.pc, 0x0206);
    }

    #[test]
    fn tcall_0_and_15_hit_the_opposite_ends_of_the_vector_table() {
        let mut cpu = Spc700 { regs: Registers { sp: 0xEF, pc: 0x0200, ..Default::default() }, ..Default::default() };
        let mut bus = FakeBus([0; 0x10000]);
        bus.0[0xFFDE] = 0x00;
        bus.0[0xFFDF] = 0x40; // TCALL 0 -> $FFDE -> target 0x4000
        bus.0[0xFFC0] = 0x00;
        bus.0[0xFFC1] = 0x80; // TCALL 15 -> $FFC0 -> target 0x8000
        cpu.op_tcall(0, &mut bus);
        assert_eq!(cpu.regs.pc, 0x4000);
        cpu.regs.pc = 0x0200;
        cpu.op_tcall(15, &mut bus);
        assert_eq!(cpu.regs.pc, 0x8000);
    }

    #[test]
    fn dbnz_y_branches_while_nonzero() {
        let mut cpu = Spc700 { regs: Registers { pc: 0x0200, y: 1, ..Default::default() }, ..Default::default() };
        let mut bus = FakeBus([0; 0x10000]);
        bus.0[0x0200] = 0xFE; // -2
        cpu.op_dbnz_y(&mut bus);
        assert_eq!(cpu.regs.y, 0);
        assert_eq!(cpu.regs.pc, 0x0200); // not taken, Y hit zero
    }
}
