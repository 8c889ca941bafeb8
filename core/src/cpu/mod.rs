//! SPC700 CPU interpreter.
//!
//! `step()` fetches and executes exactly one instruction to completion,
//! returning its aggregated cycle cost — there is no per-cycle bus-phase
//! state machine here, since the timing model this crate targets only
//! needs cycle counts accumulated per instruction, not per memory access.
//! The instruction set is still organized the way a cycle-exact
//! interpreter would be: one file per opcode family, with flag-setting
//! helpers shared across them.

mod addressing;
mod alu;
mod bitops;
mod branch;
mod flags;
mod load_store;
mod stack;

pub use flags::{Psw, PswBit};

use crate::bus::Bus;

/// The SPC700's register file (spc-core's DATA MODEL carries this verbatim).
#[derive(Debug, Clone, Copy, Default)]
pub struct Registers {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub psw: u8,
}

/// CPU interpreter state plus the aggregate cycle counter driving the
/// rest of the machine's scheduling.
#[derive(Debug, Clone, Default)]
pub struct Spc700 {
    pub regs: Registers,
    pub cycle: u64,
    /// Set by STOP/SLEEP; once true, `step()` is a no-op that still
    /// reports one cycle so the caller's clock keeps advancing.
    pub halted: bool,
}

impl Spc700 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets registers to the documented post-reset state and jumps to
    /// the reset vector at $FFFE/$FFFF.
    pub fn reset(&mut self, bus: &mut dyn Bus) {
        self.regs = Registers { sp: 0xEF, psw: Psw::I.bits(), ..Default::default() };
        self.regs.pc = bus.read_word(0xFFFE);
        self.halted = false;
        self.cycle = 0;
    }

    #[inline]
    fn fetch_u8(&mut self, bus: &mut dyn Bus) -> u8 {
        let v = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        v
    }

    #[inline]
    fn fetch_u16(&mut self, bus: &mut dyn Bus) -> u16 {
        let v = bus.read_word(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(2);
        v
    }

    #[inline]
    fn page_flag(&self) -> bool {
        self.regs.psw & Psw::P.bits() != 0
    }

    #[inline]
    fn dp_addr(&mut self, bus: &mut dyn Bus) -> u16 {
        let dp = self.fetch_u8(bus);
        crate::bus::direct_page_addr(dp, self.page_flag())
    }

    /// Executes one instruction, returning its cycle cost.
    pub fn step(&mut self, bus: &mut dyn Bus) -> u32 {
        if self.halted {
            return 1;
        }
        let opcode = self.fetch_u8(bus);
        let cycles = self.execute(opcode, bus);
        self.cycle += cycles as u64;
        cycles
    }

    fn execute(&mut self, opcode: u8, bus: &mut dyn Bus) -> u32 {
        use alu::AluOp::*;
        match opcode {
            0x00 => 2, // NOP
            0x01 => self.op_tcall(0, bus),
            0x02 => self.op_set1(0, bus),
            0x03 => self.op_bbs(0, bus),
            0x04 => self.op_alu_dp(Or, bus),
            0x05 => self.op_alu_abs(Or, bus),
            0x06 => self.op_alu_indirect_x(Or, bus),
            0x07 => self.op_alu_indexed_indirect(Or, bus),
            0x08 => self.op_alu_imm(Or, bus),
            0x09 => self.op_alu_dp_dp(Or, bus),
            0x0A => self.op_or1(false, bus),
            0x0B => self.op_shift_dp(bitops::ShiftOp::Asl, bus),
            0x0C => self.op_shift_abs(bitops::ShiftOp::Asl, bus),
            0x0D => self.op_push_psw(bus),
            0x0E => self.op_tset1(bus),
            0x0F => self.op_brk(bus),

            0x10 => self.op_branch_if(Psw::N.bits(), false, bus),
            0x11 => self.op_tcall(1, bus),
            0x12 => self.op_clr1(0, bus),
            0x13 => self.op_bbc(0, bus),
            0x14 => self.op_alu_dp_x(Or, bus),
            0x15 => self.op_alu_abs_x(Or, bus),
            0x16 => self.op_alu_abs_y(Or, bus),
            0x17 => self.op_alu_indirect_indexed(Or, bus),
            0x18 => self.op_alu_dp_imm(Or, bus),
            0x19 => self.op_alu_indirect_xy(Or, bus),
            0x1A => self.op_decw(bus),
            0x1B => self.op_shift_dp_x(bitops::ShiftOp::Asl, bus),
            0x1C => self.op_shift_a(bitops::ShiftOp::Asl, bus),
            0x1D => self.op_dec_x(bus),
            0x1E => self.op_cmp_x_abs(bus),
            0x1F => self.op_jmp_abs_x_indirect(bus),

            0x20 => self.op_clrp(bus),
            0x21 => self.op_tcall(2, bus),
            0x22 => self.op_set1(1, bus),
            0x23 => self.op_bbs(1, bus),
            0x24 => self.op_alu_dp(And, bus),
            0x25 => self.op_alu_abs(And, bus),
            0x26 => self.op_alu_indirect_x(And, bus),
            0x27 => self.op_alu_indexed_indirect(And, bus),
            0x28 => self.op_alu_imm(And, bus),
            0x29 => self.op_alu_dp_dp(And, bus),
            0x2A => self.op_or1(true, bus),
            0x2B => self.op_shift_dp(bitops::ShiftOp::Rol, bus),
            0x2C => self.op_shift_abs(bitops::ShiftOp::Rol, bus),
            0x2D => self.op_push_a(bus),
            0x2E => self.op_cbne_dp(bus),
            0x2F => self.op_bra(bus),

            0x30 => self.op_branch_if(Psw::N.bits(), true, bus),
            0x31 => self.op_tcall(3, bus),
            0x32 => self.op_clr1(1, bus),
            0x33 => self.op_bbc(1, bus),
            0x34 => self.op_alu_dp_x(And, bus),
            0x35 => self.op_alu_abs_x(And, bus),
            0x36 => self.op_alu_abs_y(And, bus),
            0x37 => self.op_alu_indirect_indexed(And, bus),
            0x38 => self.op_alu_dp_imm(And, bus),
            0x39 => self.op_alu_indirect_xy(And, bus),
            0x3A => self.op_incw(bus),
            0x3B => self.op_shift_dp_x(bitops::ShiftOp::Rol, bus),
            0x3C => self.op_shift_a(bitops::ShiftOp::Rol, bus),
            0x3D => self.op_inc_x(bus),
            0x3E => self.op_cmp_x_dp(bus),
            0x3F => self.op_call_abs(bus),

            0x40 => self.op_setp(bus),
            0x41 => self.op_tcall(4, bus),
            0x42 => self.op_set1(2, bus),
            0x43 => self.op_bbs(2, bus),
            0x44 => self.op_alu_dp(Eor, bus),
            0x45 => self.op_alu_abs(Eor, bus),
            0x46 => self.op_alu_indirect_x(Eor, bus),
            0x47 => self.op_alu_indexed_indirect(Eor, bus),
            0x48 => self.op_alu_imm(Eor, bus),
            0x49 => self.op_alu_dp_dp(Eor, bus),
            0x4A => self.op_and1(false, bus),
            0x4B => self.op_shift_dp(bitops::ShiftOp::Lsr, bus),
            0x4C => self.op_shift_abs(bitops::ShiftOp::Lsr, bus),
            0x4D => self.op_push_x(bus),
            0x4E => self.op_tclr1(bus),
            0x4F => self.op_pcall(bus),

            0x50 => self.op_branch_if(Psw::V.bits(), false, bus),
            0x51 => self.op_tcall(5, bus),
            0x52 => self.op_clr1(2, bus),
            0x53 => self.op_bbc(2, bus),
            0x54 => self.op_alu_dp_x(Eor, bus),
            0x55 => self.op_alu_abs_x(Eor, bus),
            0x56 => self.op_alu_abs_y(Eor, bus),
            0x57 => self.op_alu_indirect_indexed(Eor, bus),
            0x58 => self.op_alu_dp_imm(Eor, bus),
            0x59 => self.op_alu_indirect_xy(Eor, bus),
            0x5A => self.op_cmpw_ya_dp(bus),
            0x5B => self.op_shift_dp_x(bitops::ShiftOp::Lsr, bus),
            0x5C => self.op_shift_a(bitops::ShiftOp::Lsr, bus),
            0x5D => self.op_mov_x_a(bus),
            0x5E => self.op_cmp_y_abs(bus),
            0x5F => self.op_jmp_abs(bus),

            0x60 => self.op_clrc(bus),
            0x61 => self.op_tcall(6, bus),
            0x62 => self.op_set1(3, bus),
            0x63 => self.op_bbs(3, bus),
            0x64 => self.op_alu_dp(Cmp, bus),
            0x65 => self.op_alu_abs(Cmp, bus),
            0x66 => self.op_alu_indirect_x(Cmp, bus),
            0x67 => self.op_alu_indexed_indirect(Cmp, bus),
            0x68 => self.op_alu_imm(Cmp, bus),
            0x69 => self.op_alu_dp_dp(Cmp, bus),
            0x6A => self.op_and1(true, bus),
            0x6B => self.op_shift_dp(bitops::ShiftOp::Ror, bus),
            0x6C => self.op_shift_abs(bitops::ShiftOp::Ror, bus),
            0x6D => self.op_push_y(bus),
            0x6E => self.op_dbnz_dp(bus),
            0x6F => self.op_ret(bus),

            0x70 => self.op_branch_if(Psw::V.bits(), true, bus),
            0x71 => self.op_tcall(7, bus),
            0x72 => self.op_clr1(3, bus),
            0x73 => self.op_bbc(3, bus),
            0x74 => self.op_alu_dp_x(Cmp, bus),
            0x75 => self.op_alu_abs_x(Cmp, bus),
            0x76 => self.op_alu_abs_y(Cmp, bus),
            0x77 => self.op_alu_indirect_indexed(Cmp, bus),
            0x78 => self.op_alu_dp_imm(Cmp, bus),
            0x79 => self.op_alu_indirect_xy(Cmp, bus),
            0x7A => self.op_addw_ya_dp(bus),
            0x7B => self.op_shift_dp_x(bitops::ShiftOp::Ror, bus),
            0x7C => self.op_shift_a(bitops::ShiftOp::Ror, bus),
            0x7D => self.op_mov_a_x(bus),
            0x7E => self.op_cmp_y_dp(bus),
            0x7F => self.op_reti(bus),

            0x80 => self.op_setc(bus),
            0x81 => self.op_tcall(8, bus),
            0x82 => self.op_set1(4, bus),
            0x83 => self.op_bbs(4, bus),
            0x84 => self.op_alu_dp(Adc, bus),
            0x85 => self.op_alu_abs(Adc, bus),
            0x86 => self.op_alu_indirect_x(Adc, bus),
            0x87 => self.op_alu_indexed_indirect(Adc, bus),
            0x88 => self.op_alu_imm(Adc, bus),
            0x89 => self.op_alu_dp_dp(Adc, bus),
            0x8A => self.op_eor1(bus),
            0x8B => self.op_dec_dp(bus),
            0x8C => self.op_dec_abs(bus),
            0x8D => self.op_mov_y_imm(bus),
            0x8E => self.op_pop_psw(bus),
            0x8F => self.op_mov_dp_imm(bus),

            0x90 => self.op_branch_if(Psw::C.bits(), false, bus),
            0x91 => self.op_tcall(9, bus),
            0x92 => self.op_clr1(4, bus),
            0x93 => self.op_bbc(4, bus),
            0x94 => self.op_alu_dp_x(Adc, bus),
            0x95 => self.op_alu_abs_x(Adc, bus),
            0x96 => self.op_alu_abs_y(Adc, bus),
            0x97 => self.op_alu_indirect_indexed(Adc, bus),
            0x98 => self.op_alu_dp_imm(Adc, bus),
            0x99 => self.op_alu_indirect_xy(Adc, bus),
            0x9A => self.op_subw_ya_dp(bus),
            0x9B => self.op_dec_dp_x(bus),
            0x9C => self.op_dec_a(bus),
            0x9D => self.op_mov_x_sp(bus),
            0x9E => self.op_div_ya_x(bus),
            0x9F => self.op_xcn(bus),

            0xA0 => self.op_ei(bus),
            0xA1 => self.op_tcall(10, bus),
            0xA2 => self.op_set1(5, bus),
            0xA3 => self.op_bbs(5, bus),
            0xA4 => self.op_alu_dp(Sbc, bus),
            0xA5 => self.op_alu_abs(Sbc, bus),
            0xA6 => self.op_alu_indirect_x(Sbc, bus),
            0xA7 => self.op_alu_indexed_indirect(Sbc, bus),
            0xA8 => self.op_alu_imm(Sbc, bus),
            0xA9 => self.op_alu_dp_dp(Sbc, bus),
            0xAA => self.op_mov1_c_from_mem(bus),
            0xAB => self.op_inc_dp(bus),
            0xAC => self.op_inc_abs(bus),
            0xAD => self.op_cmp_y_imm(bus),
            0xAE => self.op_pop_a(bus),
            0xAF => self.op_mov_indirect_x_inc_a(bus),

            0xB0 => self.op_branch_if(Psw::C.bits(), true, bus),
            0xB1 => self.op_tcall(11, bus),
            0xB2 => self.op_clr1(5, bus),
            0xB3 => self.op_bbc(5, bus),
            0xB4 => self.op_alu_dp_x(Sbc, bus),
            0xB5 => self.op_alu_abs_x(Sbc, bus),
            0xB6 => self.op_alu_abs_y(Sbc, bus),
            0xB7 => self.op_alu_indirect_indexed(Sbc, bus),
            0xB8 => self.op_alu_dp_imm(Sbc, bus),
            0xB9 => self.op_alu_indirect_xy(Sbc, bus),
            0xBA => self.op_movw_ya_dp(bus),
            0xBB => self.op_inc_dp_x(bus),
            0xBC => self.op_inc_a(bus),
            0xBD => self.op_mov_sp_x(bus),
            0xBE => self.op_das(bus),
            0xBF => self.op_mov_a_indirect_x_inc(bus),

            0xC0 => self.op_di(bus),
            0xC1 => self.op_tcall(12, bus),
            0xC2 => self.op_set1(6, bus),
            0xC3 => self.op_bbs(6, bus),
            0xC4 => self.op_mov_dp_a(bus),
            0xC5 => self.op_mov_abs_a(bus),
            0xC6 => self.op_mov_indirect_x_a(bus),
            0xC7 => self.op_mov_indexed_indirect_a(bus),
            0xC8 => self.op_cmp_x_imm(bus),
            0xC9 => self.op_mov_abs_x(bus),
            0xCA => self.op_mov1_mem_from_c(bus),
            0xCB => self.op_mov_dp_y(bus),
            0xCC => self.op_mov_abs_y(bus),
            0xCD => self.op_mov_x_imm(bus),
            0xCE => self.op_pop_x(bus),
            0xCF => self.op_mul_ya(bus),

            0xD0 => self.op_branch_if(Psw::Z.bits(), false, bus),
            0xD1 => self.op_tcall(13, bus),
            0xD2 => self.op_clr1(6, bus),
            0xD3 => self.op_bbc(6, bus),
            0xD4 => self.op_mov_dp_x_a(bus),
            0xD5 => self.op_mov_abs_x_a(bus),
            0xD6 => self.op_mov_abs_y_a(bus),
            0xD7 => self.op_mov_indirect_indexed_a(bus),
            0xD8 => self.op_mov_dp_x(bus),
            0xD9 => self.op_mov_dp_y_x(bus),
            0xDA => self.op_movw_dp_ya(bus),
            0xDB => self.op_mov_dp_x_y(bus),
            0xDC => self.op_dec_y(bus),
            0xDD => self.op_mov_a_y(bus),
            0xDE => self.op_cbne_dp_x(bus),
            0xDF => self.op_daa(bus),

            0xE0 => self.op_clrv(bus),
            0xE1 => self.op_tcall(14, bus),
            0xE2 => self.op_set1(7, bus),
            0xE3 => self.op_bbs(7, bus),
            0xE4 => self.op_mov_a_dp(bus),
            0xE5 => self.op_mov_a_abs(bus),
            0xE6 => self.op_mov_a_indirect_x(bus),
            0xE7 => self.op_mov_a_indexed_indirect(bus),
            0xE8 => self.op_mov_a_imm(bus),
            0xE9 => self.op_mov_x_abs(bus),
            0xEA => self.op_not1(bus),
            0xEB => self.op_mov_y_dp(bus),
            0xEC => self.op_mov_y_abs(bus),
            0xED => self.op_notc(bus),
            0xEE => self.op_pop_y(bus),
            0xEF => self.op_sleep(bus),

            0xF0 => self.op_branch_if(Psw::Z.bits(), true, bus),
            0xF1 => self.op_tcall(15, bus),
            0xF2 => self.op_clr1(7, bus),
            0xF3 => self.op_bbc(7, bus),
            0xF4 => self.op_mov_a_dp_x(bus),
            0xF5 => self.op_mov_a_abs_x(bus),
            0xF6 => self.op_mov_a_abs_y(bus),
            0xF7 => self.op_mov_a_indirect_indexed(bus),
            0xF8 => self.op_mov_x_dp(bus),
            0xF9 => self.op_mov_x_dp_y(bus),
            0xFA => self.op_mov_dp_dp(bus),
            0xFB => self.op_mov_y_dp_x(bus),
            0xFC => self.op_inc_y(bus),
            0xFD => self.op_mov_y_a(bus),
            0xFE => self.op_dbnz_y(bus),
            0xFF => self.op_stop(bus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBus(Vec<u8>);
    impl Bus for FakeBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
        fn write(&mut self, addr: u16, value: u8) {
            self.0[addr as usize] = value;
        }
    }

    /// Every opcode value must decode to a defined execution path. This
    /// runs one instance of each opcode from freshly reset state and
    /// asserts the interpreter never panics (the only acceptable panic
    /// path is a genuinely unimplemented opcode, and there must be none).
    #[test]
    fn every_opcode_has_a_handler() {
        for opcode in 0u16..=255 {
            let mut mem = vec![0u8; 0x10000];
            mem[0] = opcode as u8;
            // Supply non-zero operand bytes so indirect/indexed modes
            // that dereference through them don't panic on out-of-range
            // reads (the whole 64K is backed here, so this is moot, but
            // keeps intent obvious).
            let mut bus = FakeBus(mem);
            let mut cpu = Spc700::new();
            cpu.reset(&mut bus);
            cpu.regs.pc = 0;
            let cycles = cpu.step(&mut bus);
            assert!(cycles > 0, "opcode {opcode:#04x} reported zero cycles");
        }
    }

    #[test]
    fn reset_vector_is_read_from_fffe() {
        let mut mem = vec![0u8; 0x10000];
        mem[0xFFFE] = 0x34;
        mem[0xFFFF] = 0x12;
        let mut bus = FakeBus(mem);
        let mut cpu = Spc700::new();
        cpu.reset(&mut bus);
        assert_eq!(cpu.regs.pc, 0x1234);
        assert_eq!(cpu.regs.sp, 0xEF);
    }
}
