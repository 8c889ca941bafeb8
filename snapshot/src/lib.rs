//! Decoder/encoder for the fixed-layout `.spc` snapshot format and the
//! glue that loads one into (or captures one from) a running
//! [`spc_core::Machine`].

mod error;

pub use error::{Result, SnapshotError};

use spc_core::machine::Machine;

pub const MAGIC: &[u8; 33] = b"SNES-SPC700 Sound File Data v0.30";
const ID_TAG_TYPE: u8 = 26;

const OFF_HEADER: usize = 0x00;
const OFF_TAG_TYPE: usize = 0x23;
const OFF_VERSION_MINOR: usize = 0x24;
const OFF_PC: usize = 0x25;
const OFF_A: usize = 0x27;
const OFF_X: usize = 0x28;
const OFF_Y: usize = 0x29;
const OFF_PSW: usize = 0x2A;
const OFF_SP: usize = 0x2B;
const OFF_ID_TAG: usize = 0x2E;
const ID_TAG_LEN: usize = 210;
const OFF_RAM: usize = 0x0100;
const RAM_LEN: usize = 0x10000;
const OFF_DSP_REGS: usize = 0x10100;
const DSP_REG_LEN: usize = 128;
const FILE_LEN: usize = 0x10200;

/// Initial register file a snapshot wants the CPU to resume from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitialRegisters {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub psw: u8,
    pub sp: u8,
}

/// The optional 210-byte ID tag (song title, game title, and further
/// fields the format defines beyond what this player surfaces). Kept as
/// raw bytes; [`IdTag::song_title`]/[`IdTag::game_title`] decode the two
/// fields this player actually displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTag(pub [u8; ID_TAG_LEN]);

impl IdTag {
    fn field_str(&self, start: usize, len: usize) -> String {
        let bytes = &self.0[start..start + len];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    pub fn song_title(&self) -> String {
        self.field_str(0, 32)
    }

    pub fn game_title(&self) -> String {
        self.field_str(32, 32)
    }
}

/// A fully-parsed `.spc` snapshot: initial register file, full 64K RAM
/// image, the 128-byte DSP register image, and the optional ID tag.
#[derive(Clone)]
pub struct Snapshot {
    pub version_minor: u8,
    pub registers: InitialRegisters,
    pub ram: Box<[u8; RAM_LEN]>,
    pub dsp_registers: [u8; DSP_REG_LEN],
    pub id_tag: Option<IdTag>,
}

impl Snapshot {
    /// Parses a snapshot from its on-disk byte layout.
    ///
    /// Rejects anything shorter than the fixed layout or whose header
    /// doesn't match the required magic; both are the only decode
    /// failures this format defines (spc-snapshot's error kinds).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_LEN {
            return Err(SnapshotError::ShortRead { expected_at_least: FILE_LEN, got: data.len() });
        }
        if &data[OFF_HEADER..OFF_HEADER + MAGIC.len()] != MAGIC.as_slice() {
            return Err(SnapshotError::BadMagic);
        }

        let tag_type = data[OFF_TAG_TYPE];
        let version_minor = data[OFF_VERSION_MINOR];
        let registers = InitialRegisters {
            pc: u16::from_le_bytes([data[OFF_PC], data[OFF_PC + 1]]),
            a: data[OFF_A],
            x: data[OFF_X],
            y: data[OFF_Y],
            psw: data[OFF_PSW],
            sp: data[OFF_SP],
        };

        let id_tag = if tag_type == ID_TAG_TYPE {
            let mut tag = [0u8; ID_TAG_LEN];
            tag.copy_from_slice(&data[OFF_ID_TAG..OFF_ID_TAG + ID_TAG_LEN]);
            Some(IdTag(tag))
        } else {
            None
        };

        let mut ram = Box::new([0u8; RAM_LEN]);
        ram.copy_from_slice(&data[OFF_RAM..OFF_RAM + RAM_LEN]);

        let mut dsp_registers = [0u8; DSP_REG_LEN];
        dsp_registers.copy_from_slice(&data[OFF_DSP_REGS..OFF_DSP_REGS + DSP_REG_LEN]);

        Ok(Self { version_minor, registers, ram, dsp_registers, id_tag })
    }

    /// Serialises back to the on-disk byte layout. Bytes the format
    /// leaves as "ignored"/"reserved"/"unused" are written as zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; FILE_LEN];
        out[OFF_HEADER..OFF_HEADER + MAGIC.len()].copy_from_slice(MAGIC.as_slice());
        out[OFF_TAG_TYPE] = if self.id_tag.is_some() { ID_TAG_TYPE } else { 0 };
        out[OFF_VERSION_MINOR] = self.version_minor;
        let pc = self.registers.pc.to_le_bytes();
        out[OFF_PC] = pc[0];
        out[OFF_PC + 1] = pc[1];
        out[OFF_A] = self.registers.a;
        out[OFF_X] = self.registers.x;
        out[OFF_Y] = self.registers.y;
        out[OFF_PSW] = self.registers.psw;
        out[OFF_SP] = self.registers.sp;
        if let Some(tag) = &self.id_tag {
            out[OFF_ID_TAG..OFF_ID_TAG + ID_TAG_LEN].copy_from_slice(&tag.0);
        }
        out[OFF_RAM..OFF_RAM + RAM_LEN].copy_from_slice(&self.ram[..]);
        out[OFF_DSP_REGS..OFF_DSP_REGS + DSP_REG_LEN].copy_from_slice(&self.dsp_registers);
        out
    }

    /// Captures the current state of a running machine into a snapshot.
    /// The ID tag is never populated this way; a captured snapshot is a
    /// fresh machine state, not a re-tagging of a loaded song.
    pub fn capture_from(machine: &mut Machine) -> Self {
        let regs = machine.cpu().regs;
        Self {
            version_minor: 30,
            registers: InitialRegisters {
                pc: regs.pc,
                a: regs.a,
                x: regs.x,
                y: regs.y,
                psw: regs.psw,
                sp: regs.sp,
            },
            ram: Box::new(*machine.ram()),
            dsp_registers: machine.dsp_mut().dump_registers(),
            id_tag: None,
        }
    }

    /// Loads this snapshot into `machine`: RAM first (so sample
    /// directories and echo buffers are in place), then the DSP register
    /// image (replaying each register write, including any pending
    /// key-on — a voice captured mid-playback resumes from Attack
    /// rather than bit-exact mid-envelope, a known limitation of the
    /// 128-byte register-only DSP image this format carries), then the
    /// CPU's initial register file.
    pub fn load_into(&self, machine: &mut Machine) {
        machine.ram_mut().copy_from_slice(&self.ram[..]);
        machine.load_dsp_registers(&self.dsp_registers);

        let cpu = machine.cpu_mut();
        cpu.regs.pc = self.registers.pc;
        cpu.regs.a = self.registers.a;
        cpu.regs.x = self.registers.x;
        cpu.regs.y = self.registers.y;
        cpu.regs.psw = self.registers.psw;
        cpu.regs.sp = self.registers.sp;
        cpu.cycle = 0;
        cpu.halted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut ram = Box::new([0u8; RAM_LEN]);
        ram[0x0200] = 0xE8;
        Snapshot {
            version_minor: 30,
            registers: InitialRegisters { pc: 0x0200, a: 1, x: 2, y: 3, psw: 0x04, sp: 0xEF },
            ram,
            dsp_registers: [0u8; DSP_REG_LEN],
            id_tag: None,
        }
    }

    #[test]
    fn round_trip_preserves_registers_and_ram() {
        let snap = sample_snapshot();
        let bytes = snap.to_bytes();
        let decoded = Snapshot::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.registers, snap.registers);
        assert_eq!(decoded.ram[0x0200], 0xE8);
        assert_eq!(decoded.dsp_registers, snap.dsp_registers);
        assert!(decoded.id_tag.is_none());
    }

    #[test]
    fn round_trip_preserves_id_tag() {
        let mut snap = sample_snapshot();
        let mut tag = [0u8; ID_TAG_LEN];
        tag[..5].copy_from_slice(b"Song\0");
        snap.id_tag = Some(IdTag(tag));
        let decoded = Snapshot::from_bytes(&snap.to_bytes()).unwrap();
        assert_eq!(decoded.id_tag.unwrap().song_title(), "Song");
    }

    #[test]
    fn rejects_short_file() {
        let err = Snapshot::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, SnapshotError::ShortRead { .. }));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; FILE_LEN];
        bytes[0..4].copy_from_slice(b"NOPE");
        let err = Snapshot::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, SnapshotError::BadMagic);
    }

    #[test]
    fn load_into_then_capture_round_trips_through_a_machine() {
        let snap = sample_snapshot();
        let mut machine = Machine::new();
        snap.load_into(&mut machine);
        assert_eq!(machine.cpu().regs.pc, 0x0200);
        assert_eq!(machine.ram()[0x0200], 0xE8);

        let captured = Snapshot::capture_from(&mut machine);
        assert_eq!(captured.registers, snap.registers);
        assert_eq!(captured.ram[0x0200], 0xE8);
    }
}
