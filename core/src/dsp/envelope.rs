//! Per-voice ADSR envelope and GAIN mode engine.
//!
//! Ports the standard SPC700 rate-table model: a 32-entry period table
//! shared by attack, decay and sustain, indexed differently by each
//! phase's 4- or 5-bit rate field. Decay and sustain periods depend only
//! on the rate field, not on the sustain level (the sustain level only
//! decides the level decay stops at, not how fast it runs).

/// Master period table, entry 0 meaning "never ticks".
const RATES: [u32; 32] = [
    0, 2048, 1536, 1280, 1024, 768, 640, 512, 384, 320, 256, 192, 160, 128, 96, 80, 64, 48, 40,
    32, 24, 20, 16, 12, 10, 8, 6, 5, 4, 3, 2, 1,
];

fn attack_period(ar: u8) -> u32 {
    if ar == 15 { 1 } else { RATES[(2 * ar as usize + 1).min(31)] }
}

fn decay_period(dr: u8) -> u32 {
    RATES[(dr as usize * 2 + 16).min(31)]
}

fn sustain_period(sr: u8) -> u32 {
    RATES[sr as usize & 0x1F]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Attack,
    Decay,
    Sustain,
    Release,
    /// Direct/linear/exponential GAIN control, bypassing the ADSR state machine.
    Gain,
}

#[derive(Debug, Clone, Copy)]
pub enum GainMode {
    Direct(u8),
    LinearDecrease(u8),
    ExponentialDecrease(u8),
    LinearIncrease(u8),
    BentLineIncrease(u8),
}

#[derive(Debug, Clone, Copy)]
pub struct AdsrParams {
    pub attack_rate: u8,
    pub decay_rate: u8,
    pub sustain_rate: u8,
    pub sustain_level: u8, // 0..=7
}

#[derive(Debug, Clone, Copy)]
pub enum EnvelopeMode {
    Adsr(AdsrParams),
    Gain(GainMode),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub phase: Phase,
    pub level: i32, // 0..=0x7FF
    counter: u32,
    mode: EnvelopeMode,
}

const LEVEL_MAX: i32 = 0x7FF;

impl Envelope {
    pub fn new() -> Self {
        Self { phase: Phase::Release, level: 0, counter: 0, mode: EnvelopeMode::Gain(GainMode::Direct(0)) }
    }

    pub fn key_on(&mut self, mode: EnvelopeMode) {
        self.level = 0;
        self.counter = 0;
        self.mode = mode;
        self.phase = match mode {
            EnvelopeMode::Adsr(_) => Phase::Attack,
            EnvelopeMode::Gain(_) => Phase::Gain,
        };
    }

    pub fn key_off(&mut self) {
        self.phase = Phase::Release;
    }

    pub fn set_mode(&mut self, mode: EnvelopeMode) {
        self.mode = mode;
        if !matches!(self.phase, Phase::Release) {
            self.phase = match mode {
                EnvelopeMode::Adsr(_) => self.phase,
                EnvelopeMode::Gain(_) => Phase::Gain,
            };
        }
    }

    fn period_for_current_phase(&self) -> u32 {
        match (self.phase, self.mode) {
            (Phase::Attack, EnvelopeMode::Adsr(p)) => attack_period(p.attack_rate),
            (Phase::Decay, EnvelopeMode::Adsr(p)) => decay_period(p.decay_rate),
            (Phase::Sustain, EnvelopeMode::Adsr(p)) => sustain_period(p.sustain_rate),
            (Phase::Release, _) => RATES[31],
            (Phase::Gain, EnvelopeMode::Gain(GainMode::Direct(_))) => 0,
            (Phase::Gain, EnvelopeMode::Gain(GainMode::LinearDecrease(r))) => sustain_period(r),
            (Phase::Gain, EnvelopeMode::Gain(GainMode::ExponentialDecrease(r))) => sustain_period(r),
            (Phase::Gain, EnvelopeMode::Gain(GainMode::LinearIncrease(r))) => sustain_period(r),
            (Phase::Gain, EnvelopeMode::Gain(GainMode::BentLineIncrease(r))) => sustain_period(r),
            _ => 0,
        }
    }

    /// Advances the envelope by one DSP sample tick (32 kHz).
    pub fn tick(&mut self) {
        if self.phase == Phase::Release {
            self.level = (self.level - 8).max(0);
            return;
        }

        if let (Phase::Gain, EnvelopeMode::Gain(GainMode::Direct(value))) = (self.phase, self.mode) {
            self.level = ((value & 0x7F) as i32) * 16;
            return;
        }

        let period = self.period_for_current_phase();
        if period == 0 {
            return;
        }
        self.counter += 1;
        if self.counter < period {
            return;
        }
        self.counter = 0;

        match (self.phase, self.mode) {
            (Phase::Attack, EnvelopeMode::Adsr(p)) => {
                let step = if p.attack_rate == 15 { 1024 } else { 32 };
                self.level = (self.level + step).min(LEVEL_MAX);
                if self.level >= LEVEL_MAX {
                    self.phase = Phase::Decay;
                }
            }
            (Phase::Decay, EnvelopeMode::Adsr(p)) => {
                self.level -= ((self.level - 1) >> 8) + 1;
                self.level = self.level.max(0);
                let sustain_threshold = (p.sustain_level as i32 + 1) * 0x100 - 1;
                if self.level <= sustain_threshold {
                    self.phase = Phase::Sustain;
                }
            }
            (Phase::Sustain, EnvelopeMode::Adsr(_)) => {
                self.level -= ((self.level - 1) >> 8) + 1;
                self.level = self.level.max(0);
            }
            (Phase::Gain, EnvelopeMode::Gain(GainMode::LinearDecrease(_))) => {
                self.level = (self.level - 32).max(0);
            }
            (Phase::Gain, EnvelopeMode::Gain(GainMode::ExponentialDecrease(_))) => {
                self.level -= ((self.level - 1) >> 8) + 1;
                self.level = self.level.max(0);
            }
            (Phase::Gain, EnvelopeMode::Gain(GainMode::LinearIncrease(_))) => {
                self.level = (self.level + 32).min(LEVEL_MAX);
            }
            (Phase::Gain, EnvelopeMode::Gain(GainMode::BentLineIncrease(_))) => {
                let step = if self.level < 0x600 { 32 } else { 8 };
                self.level = (self.level + step).min(LEVEL_MAX);
            }
            _ => {}
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_rate_15_is_fast_path() {
        assert_eq!(attack_period(15), 1);
    }

    #[test]
    fn decay_and_sustain_periods_ignore_sustain_level() {
        for sl in 0..8u8 {
            assert_eq!(decay_period(3), RATES[22]);
            let _ = sl;
        }
    }

    #[test]
    fn key_off_always_enters_release_and_decays_linearly() {
        let mut env = Envelope::new();
        env.key_on(EnvelopeMode::Adsr(AdsrParams { attack_rate: 10, decay_rate: 3, sustain_rate: 5, sustain_level: 7 }));
        env.level = 400;
        env.key_off();
        assert_eq!(env.phase, Phase::Release);
        env.tick();
        assert_eq!(env.level, 392);
    }

    #[test]
    fn gain_direct_snaps_immediately() {
        let mut env = Envelope::new();
        env.key_on(EnvelopeMode::Gain(GainMode::Direct(0x20)));
        env.tick();
        assert_eq!(env.level, 0x20 * 16);
    }

    #[test]
    fn attack_phase_reaches_full_and_transitions_to_decay() {
        let mut env = Envelope::new();
        env.key_on(EnvelopeMode::Adsr(AdsrParams { attack_rate: 15, decay_rate: 0, sustain_rate: 0, sustain_level: 7 }));
        for _ in 0..3 {
            env.tick();
        }
        assert_eq!(env.phase, Phase::Decay);
        assert_eq!(env.level, LEVEL_MAX);
    }
}
