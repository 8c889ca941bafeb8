//! The S-DSP: 8-voice BRR sample playback, mixed down to a stereo pair.
//!
//! Echo and noise generation are not implemented; their registers are
//! stored faithfully (so nothing a game writes is lost) but have no
//! effect on the mix, matching the playback-only scope of this crate.

pub mod brr;
pub mod envelope;
pub mod gaussian;
pub mod voice;

use crate::bus::Bus;
use envelope::{AdsrParams, EnvelopeMode, GainMode};
use voice::Voice;

const VOICE_COUNT: usize = 8;
const REGISTER_COUNT: usize = 128;

pub struct Dsp {
    regs: [u8; REGISTER_COUNT],
    pub voices: [Voice; VOICE_COUNT],
    endx: u8,
    flg: u8,
}

fn voice_reg_addr(voice: usize, offset: u8) -> usize {
    voice * 0x10 + offset as usize
}

impl Dsp {
    pub fn new() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
            voices: std::array::from_fn(|_| Voice::new()),
            endx: 0,
            flg: 0xE0, // reset + mute + echo-disable asserted on power-up
        }
    }

    fn sample_dir_addr(&self) -> u16 {
        (self.regs[0x5D] as u16) << 8
    }

    fn sample_table_entry(&self, bus: &mut dyn Bus, source: u8) -> (u16, u16) {
        let entry_addr = self.sample_dir_addr().wrapping_add(source as u16 * 4);
        let start = bus.read_word(entry_addr);
        let loop_addr = bus.read_word(entry_addr.wrapping_add(2));
        (start, loop_addr)
    }

    pub fn read_register(&mut self, addr: u8) -> u8 {
        let a = addr as usize & 0x7F;
        match a {
            0x7C => self.endx,
            _ if a % 0x10 == 0x08 => {
                let voice = a / 0x10;
                ((self.voices[voice].envelope.level >> 4).clamp(0, 0x7F)) as u8
            }
            _ if a % 0x10 == 0x09 => {
                let voice = a / 0x10;
                ((self.voices[voice].last_output() >> 12) & 0x0F) as u8
            }
            _ => self.regs[a],
        }
    }

    pub fn write_register(&mut self, addr: u8, value: u8, bus: &mut dyn Bus) {
        let a = addr as usize & 0x7F;
        // Registers at offset 0x08/0x09 within a voice block (ENVX/OUTX) are
        // read-only hardware outputs; writes are dropped like real silicon.
        if a % 0x10 == 0x08 || a % 0x10 == 0x09 {
            return;
        }
        self.regs[a] = value;

        match a {
            0x4C => self.apply_key_on(value, bus),
            0x5C => self.apply_key_off(value),
            0x6C => {
                self.flg = value;
                if value & 0x80 != 0 {
                    self.apply_key_off(0xFF);
                }
            }
            0x7C => {
                // Writing ENDX of any value clears it.
                self.endx = 0;
            }
            _ if a % 0x10 == 0x02 => self.sync_voice_pitch(a / 0x10),
            _ if a % 0x10 == 0x03 => self.sync_voice_pitch(a / 0x10),
            _ if a % 0x10 == 0x04 => {
                self.voices[a / 0x10].regs.source_number = value;
            }
            _ if a % 0x10 == 0x05 || a % 0x10 == 0x06 => self.sync_voice_adsr(a / 0x10),
            _ if a % 0x10 == 0x07 => self.sync_voice_gain(a / 0x10, value),
            _ if a % 0x10 == 0x00 => {
                self.voices[a / 0x10].regs.volume_left = value as i8;
            }
            _ if a % 0x10 == 0x01 => {
                self.voices[a / 0x10].regs.volume_right = value as i8;
            }
            _ => {}
        }
    }

    fn sync_voice_pitch(&mut self, voice: usize) {
        let lo = self.regs[voice_reg_addr(voice, 0x02)] as u16;
        let hi = self.regs[voice_reg_addr(voice, 0x03)] as u16 & 0x3F;
        self.voices[voice].regs.pitch = lo | (hi << 8);
    }

    fn sync_voice_adsr(&mut self, voice: usize) {
        let adsr1 = self.regs[voice_reg_addr(voice, 0x05)];
        let adsr2 = self.regs[voice_reg_addr(voice, 0x06)];
        let enabled = adsr1 & 0x80 != 0;
        let params = AdsrParams {
            attack_rate: adsr1 & 0x0F,
            decay_rate: (adsr1 >> 4) & 0x07,
            sustain_rate: adsr2 & 0x1F,
            sustain_level: (adsr2 >> 5) & 0x07,
        };
        self.voices[voice].regs.adsr = params;
        self.voices[voice].regs.adsr_enabled = enabled;
        self.voices[voice].regs.gain_enabled = !enabled;
        if !matches!(self.voices[voice].envelope.phase, envelope::Phase::Release) {
            self.voices[voice].envelope.set_mode(self.voices[voice].envelope_mode_pub());
        }
    }

    fn sync_voice_gain(&mut self, voice: usize, value: u8) {
        let mode = if value & 0x80 == 0 {
            GainMode::Direct(value & 0x7F)
        } else {
            let rate = value & 0x1F;
            match (value >> 5) & 0x03 {
                0 => GainMode::LinearDecrease(rate),
                1 => GainMode::ExponentialDecrease(rate),
                2 => GainMode::LinearIncrease(rate),
                _ => GainMode::BentLineIncrease(rate),
            }
        };
        self.voices[voice].regs.gain = mode;
        if self.voices[voice].regs.gain_enabled
            && !matches!(self.voices[voice].envelope.phase, envelope::Phase::Release)
        {
            self.voices[voice].envelope.set_mode(EnvelopeMode::Gain(mode));
        }
    }

    fn apply_key_on(&mut self, mask: u8, bus: &mut dyn Bus) {
        for voice in 0..VOICE_COUNT {
            if mask & (1 << voice) != 0 {
                let source = self.voices[voice].regs.source_number;
                let (start, _loop_addr) = self.sample_table_entry(bus, source);
                self.voices[voice].key_on(start, bus);
                self.endx &= !(1 << voice);
            }
        }
    }

    fn apply_key_off(&mut self, mask: u8) {
        for voice in 0..VOICE_COUNT {
            if mask & (1 << voice) != 0 {
                self.voices[voice].key_off();
            }
        }
    }

    fn master_muted(&self) -> bool {
        self.flg & 0x40 != 0
    }

    pub fn endx(&self) -> u8 {
        self.endx
    }

    pub fn flg(&self) -> u8 {
        self.flg
    }

    pub fn master_volume_left(&self) -> i8 {
        self.regs[0x0C] as i8
    }

    pub fn master_volume_right(&self) -> i8 {
        self.regs[0x1C] as i8
    }

    /// Reads every register through [`Dsp::read_register`] so ENVX/OUTX
    /// reflect live voice state rather than the stale byte last written.
    pub fn dump_registers(&mut self) -> [u8; REGISTER_COUNT] {
        std::array::from_fn(|a| self.read_register(a as u8))
    }

    /// Restores a register image captured by [`Dsp::dump_registers`].
    /// ENVX/OUTX bytes in `image` are ignored (those slots are read-only
    /// outputs; `write_register` drops writes to them), matching the
    /// round-trip contract: only the writable register state is restored,
    /// and the voices resync their pitch/ADSR/gain from it as each byte
    /// lands.
    pub fn load_registers(&mut self, image: &[u8; REGISTER_COUNT], bus: &mut dyn Bus) {
        for (a, &value) in image.iter().enumerate() {
            self.write_register(a as u8, value, bus);
        }
        self.endx = image[0x7C];
    }

    /// Produces one stereo sample by advancing every voice and mixing
    /// with the master volume registers ($0C/$1C), clamped to i16 range.
    pub fn next_sample(&mut self, bus: &mut dyn Bus) -> (i16, i16) {
        // Voices keep advancing even while muted, so unmuting resumes
        // mid-envelope rather than restarting from silence.
        let mut left = 0i32;
        let mut right = 0i32;
        for voice in 0..VOICE_COUNT {
            let (out, ended) = self.voices[voice].advance(bus);
            if ended {
                self.endx |= 1 << voice;
            }
            let vl = self.voices[voice].regs.volume_left as i32;
            let vr = self.voices[voice].regs.volume_right as i32;
            left += (out * vl) >> 7;
            right += (out * vr) >> 7;
        }

        let mvol_l = self.regs[0x0C] as i8 as i32;
        let mvol_r = self.regs[0x1C] as i8 as i32;
        left = (left * mvol_l) >> 7;
        right = (right * mvol_r) >> 7;

        // Static headroom gain; the per-voice/master scaling above is
        // heavily attenuated by the >>7 shifts, so this brings playback
        // volume back up to a useful level.
        const STATIC_GAIN: i32 = 16;
        left *= STATIC_GAIN;
        right *= STATIC_GAIN;

        if self.master_muted() {
            return (0, 0);
        }

        (
            left.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            right.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        )
    }
}

impl voice::Voice {
    fn envelope_mode_pub(&self) -> EnvelopeMode {
        if self.regs.gain_enabled {
            EnvelopeMode::Gain(self.regs.gain)
        } else {
            EnvelopeMode::Adsr(self.regs.adsr)
        }
    }
}

impl Default for Dsp {
    fn default() -> Self {
        Self::new()
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

    #[test]
    fn master_volume_scales_output() {
        let mut dsp = Dsp::new();
        dsp.write_register(0x6C, 0x00, &mut FakeBus(vec![0; 0x10000]));
        dsp.write_register(0x0C, 0x40, &mut FakeBus(vec![0; 0x10000]));
        dsp.write_register(0x1C, 0x40, &mut FakeBus(vec![0; 0x10000]));
        assert_eq!(dsp.regs[0x0C] as i8, 0x40);
    }

    #[test]
    fn endx_clears_on_any_write() {
        let mut dsp = Dsp::new();
        dsp.endx = 0xFF;
        let mut bus = FakeBus(vec![0; 0x10000]);
        dsp.write_register(0x7C, 0x00, &mut bus);
        assert_eq!(dsp.endx, 0);
    }

    #[test]
    fn key_on_clears_endx_bit_for_that_voice() {
        let mut dsp = Dsp::new();
        dsp.endx = 0xFF;
        let mut bus = FakeBus(vec![0; 0x10000]);
        dsp.write_register(0x4C, 0x01, &mut bus);
        assert_eq!(dsp.endx & 0x01, 0);
    }

    #[test]
    fn pitch_register_pair_combines_into_14_bits() {
        let mut dsp = Dsp::new();
        let mut bus = FakeBus(vec![0; 0x10000]);
        dsp.write_register(0x02, 0x34, &mut bus);
        dsp.write_register(0x03, 0x12, &mut bus);
        assert_eq!(dsp.voices[0].regs.pitch, 0x1234);
    }

    #[test]
    fn gain_register_decoded_into_correct_mode() {
        let mut dsp = Dsp::new();
        let mut bus = FakeBus(vec![0; 0x10000]);
        dsp.write_register(0x05, 0x00, &mut bus); // ADSR disabled -> gain active
        dsp.write_register(0x07, 0b1010_0101, &mut bus);
        assert!(matches!(dsp.voices[0].regs.gain, GainMode::ExponentialDecrease(5)));
    }
}
