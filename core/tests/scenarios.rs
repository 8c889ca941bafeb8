//! Integration tests for the worked scenarios and quantified invariants
//! that don't fit naturally inside a single module's unit tests.

use spc_core::machine::Machine;
use spc_core::cpu::Psw;
use spc_core::dsp::envelope::{AdsrParams, Envelope, EnvelopeMode};
use spc_core::dsp::voice::Voice;

fn machine_with_program(pc: u16, bytes: &[u8]) -> Machine {
    let mut machine = Machine::new();
    for (i, &b) in bytes.iter().enumerate() {
        machine.ram_mut()[pc as usize + i] = b;
    }
    machine.cpu_mut().regs.pc = pc;
    machine
}

// S1 - arithmetic sanity: MOV A,#5; AND A,#3; CMP A,#8; BEQ +2.
#[test]
fn s1_arithmetic_sanity() {
    let mut machine = machine_with_program(
        0x0200,
        &[0xE8, 0x05, 0x28, 0x03, 0x68, 0x08, 0xF0, 0x02, 0x00, 0x00],
    );
    let pc_before_branch_instr = 0x0200 + 6;
    for _ in 0..4 {
        machine.step();
    }
    assert_eq!(machine.cpu().regs.a, 1);
    assert_eq!(machine.cpu().regs.psw & Psw::Z.bits(), 0);
    assert_eq!(machine.cpu().regs.psw & Psw::C.bits(), 0);
    // BEQ not taken: PC lands right after its own 2-byte encoding.
    assert_eq!(machine.cpu().regs.pc, pc_before_branch_instr + 2);
}

// S2 - direct-page write then read: MOV A,#0x42; MOV dp[$10],A; MOV A,dp[$10].
#[test]
fn s2_direct_page_write_then_read() {
    let mut machine = machine_with_program(0x0200, &[0xE8, 0x42, 0xC4, 0x10, 0xE4, 0x10]);
    for _ in 0..3 {
        machine.step();
    }
    assert_eq!(machine.cpu().regs.a, 0x42);
    assert_eq!(machine.ram()[0x0010], 0x42);
}

// S3 - stack round trip: MOV A,#0xAA; PUSH A; MOV A,#0; POP A.
#[test]
fn s3_stack_round_trip() {
    let mut machine = machine_with_program(0x0200, &[0xE8, 0xAA, 0x2D, 0xE8, 0x00, 0xAE]);
    let sp_before = machine.cpu().regs.sp;
    for _ in 0..4 {
        machine.step();
    }
    assert_eq!(machine.cpu().regs.sp, sp_before);
    assert_eq!(machine.cpu().regs.a, 0xAA);
}

// S6 - ADSR attack time: AR=0 takes 64 steps of 32 at a 2048-sample period
// to clamp at 0x7FF and move on to Decay.
#[test]
fn s6_adsr_attack_time() {
    let mut env = Envelope::new();
    env.key_on(EnvelopeMode::Adsr(AdsrParams {
        attack_rate: 0,
        decay_rate: 0,
        sustain_rate: 0,
        sustain_level: 7,
    }));
    let mut samples = 0u64;
    while env.level < 0x7FF {
        env.tick();
        samples += 1;
    }
    assert_eq!(env.level, 0x7FF);
    assert_eq!(samples, 64 * 2048);
}

// Invariant 9 - key-on then immediate key-off eventually drives env to 0
// and leaves the voice inactive.
#[test]
fn invariant9_key_off_settles_to_silence() {
    let mut voice = Voice::new();
    struct FakeBus(Vec<u8>);
    impl spc_core::bus::Bus for FakeBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
        fn write(&mut self, addr: u16, value: u8) {
            self.0[addr as usize] = value;
        }
    }
    let mut mem = vec![0u8; 0x10000];
    mem[0] = 0b0000_0011; // range 0, filter 0, loop=1, end=1: silent looping block
    let mut bus = FakeBus(mem);

    voice.regs.pitch = 0x1000;
    voice.regs.adsr = AdsrParams { attack_rate: 15, decay_rate: 7, sustain_rate: 31, sustain_level: 0 };
    voice.regs.adsr_enabled = true;
    voice.key_on(0, &mut bus);
    voice.key_off();

    for _ in 0..0x7FF {
        voice.advance(&mut bus);
        if voice.envelope.level == 0 {
            break;
        }
    }
    assert_eq!(voice.envelope.level, 0);
    assert!(!voice.key_on);
}

// Invariant 1/3 - cycle count is monotonic and every emitted sample is a
// valid i16 on both channels, exercised over a short real program.
#[test]
fn invariants_cycle_monotonic_and_samples_in_range() {
    let mut machine = machine_with_program(0x0200, &[0xE8, 0x42, 0x2D, 0xAE, 0x5F, 0x00, 0x02]);
    let mut last_cycle = machine.cpu().cycle;
    for _ in 0..2000 {
        let before = machine.cpu().cycle;
        if let Some((l, r)) = machine.step() {
            let _ = (l, r); // i16 by construction; range is a type invariant.
        }
        assert!(machine.cpu().cycle >= before);
        assert!(machine.cpu().cycle > last_cycle || machine.cpu().cycle == before);
        last_cycle = machine.cpu().cycle;
    }
}
