//! Read-only state snapshots for the debugger-shell collaborator (trace
//! flags, breakpoints and the REPL itself are out of scope; only the
//! "dump registers"/"dump DSP" data these commands would print lives
//! here, grounded in the original player's `dump_registers`).

use crate::cpu::{Psw, PswBit};
use crate::machine::Machine;

/// Plain snapshot of the CPU register file, formatted the way the
/// original player's register dump printed it (`[n v p b h i z c]`).
#[derive(Debug, Clone, Copy)]
pub struct RegisterDump {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub psw: u8,
}

impl RegisterDump {
    pub fn capture(machine: &Machine) -> Self {
        let regs = machine.cpu().regs;
        Self { pc: regs.pc, a: regs.a, x: regs.x, y: regs.y, sp: regs.sp, psw: regs.psw }
    }

    /// Renders the PSW as `[n v p b h i z c]`, lowercase letter when the
    /// flag is set, blank when clear.
    pub fn flags_str(&self) -> String {
        let bit = |flag: PswBit, ch: char| {
            if self.psw & flag.bits() != 0 { ch } else { ' ' }
        };
        format!(
            "[{}{}{}{}{}{}{}{}]",
            bit(Psw::N, 'n'),
            bit(Psw::V, 'v'),
            bit(Psw::P, 'p'),
            bit(Psw::B, 'b'),
            bit(Psw::H, 'h'),
            bit(Psw::I, 'i'),
            bit(Psw::Z, 'z'),
            bit(Psw::C, 'c'),
        )
    }
}

/// Snapshot of one voice's live-visible state (what ENVX/OUTX expose plus
/// the bookkeeping a "dump voice" command would want to print).
#[derive(Debug, Clone, Copy)]
pub struct VoiceDump {
    pub envelope_level: i32,
    pub key_on: bool,
    pub volume_left: i8,
    pub volume_right: i8,
    pub pitch: u16,
}

/// Plain snapshot of the DSP's externally-visible state.
#[derive(Debug, Clone)]
pub struct DspDump {
    pub endx: u8,
    pub flg: u8,
    pub master_volume_left: i8,
    pub master_volume_right: i8,
    pub voices: [VoiceDump; 8],
}

impl DspDump {
    pub fn capture(machine: &Machine) -> Self {
        let dsp = machine.dsp();
        let voices = std::array::from_fn(|v| VoiceDump {
            envelope_level: dsp.voices[v].envelope.level,
            key_on: dsp.voices[v].key_on,
            volume_left: dsp.voices[v].regs.volume_left,
            volume_right: dsp.voices[v].regs.volume_right,
            pitch: dsp.voices[v].regs.pitch,
        });
        Self {
            endx: dsp.endx(),
            flg: dsp.flg(),
            master_volume_left: dsp.master_volume_left(),
            master_volume_right: dsp.master_volume_right(),
            voices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_str_shows_only_set_bits() {
        let dump = RegisterDump { pc: 0, a: 0, x: 0, y: 0, sp: 0, psw: Psw::Z.bits() | Psw::C.bits() };
        assert_eq!(dump.flags_str(), "[    z c]");
    }

    #[test]
    fn register_dump_captures_reset_state() {
        let machine = Machine::new();
        let dump = RegisterDump::capture(&machine);
        assert_eq!(dump.sp, 0xEF);
    }
}
