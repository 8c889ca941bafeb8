//! The three SPC700 hardware timers.
//!
//! Timers 0 and 1 tick every 256 CPU cycles (8 kHz); timer 2 ticks every
//! 32 CPU cycles (64 kHz). Each timer has an 8-bit divider (reloaded from
//! $FA+i) and a 4-bit output counter read (and cleared) through $FD+i.

/// CPU-cycle period of each timer, indexed 0..=2.
pub const TIMER_PERIOD_CYCLES: [u64; 3] = [256, 256, 32];

#[derive(Debug, Clone, Copy)]
pub struct Timer {
    pub enabled: bool,
    pub divider: u8,     // programmed reload value ($FA+i); 0 means 256
    pub lower_count: u8,
    pub upper_count: u8, // 4-bit output counter
    pub next_tick_cycle: u64,
    period: u64,
}

impl Timer {
    fn new(period: u64) -> Self {
        Self {
            enabled: false,
            divider: 0,
            lower_count: 0,
            upper_count: 0,
            next_tick_cycle: 0,
            period,
        }
    }

    fn reload_divider(&self) -> u16 {
        if self.divider == 0 { 256 } else { self.divider as u16 }
    }

    /// Enables the timer: resets both counters and schedules the next
    /// tick `period` cycles from now.
    pub fn enable(&mut self, cpu_cycle: u64) {
        self.enabled = true;
        self.lower_count = 0;
        self.upper_count = 0;
        self.next_tick_cycle = cpu_cycle + self.period;
    }

    /// Disables the timer and resets both counters.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.lower_count = 0;
        self.upper_count = 0;
    }

    /// Advances the timer as far as `cpu_cycle` allows. May step more than
    /// once if multiple periods have elapsed since the last check.
    pub fn advance(&mut self, cpu_cycle: u64) {
        if !self.enabled {
            return;
        }
        while cpu_cycle >= self.next_tick_cycle {
            self.next_tick_cycle += self.period;
            self.lower_count = self.lower_count.wrapping_add(1);
            if self.lower_count as u16 == self.reload_divider() {
                self.lower_count = 0;
                self.upper_count = (self.upper_count + 1) & 0x0F;
            }
        }
    }

    /// Reads the 4-bit output counter and clears it to 0.
    pub fn read_and_clear(&mut self) -> u8 {
        let value = self.upper_count;
        self.upper_count = 0;
        value
    }
}

#[derive(Debug, Clone)]
pub struct Timers {
    pub timers: [Timer; 3],
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

impl Timers {
    pub fn new() -> Self {
        Self {
            timers: [
                Timer::new(TIMER_PERIOD_CYCLES[0]),
                Timer::new(TIMER_PERIOD_CYCLES[1]),
                Timer::new(TIMER_PERIOD_CYCLES[2]),
            ],
        }
    }

    /// Sets the Control register's enable bits for all three timers,
    /// enabling/disabling as needed ($F1).
    pub fn apply_control(&mut self, control: u8, cpu_cycle: u64) {
        for (i, timer) in self.timers.iter_mut().enumerate() {
            let should_enable = control & (1 << i) != 0;
            if should_enable && !timer.enabled {
                timer.enable(cpu_cycle);
            } else if !should_enable && timer.enabled {
                timer.disable();
            }
        }
    }

    /// Writes a new divider reload value to timer `i` ($FA+i). Takes effect
    /// on the timer's next enable, not immediately.
    pub fn write_divider(&mut self, timer: usize, value: u8) {
        self.timers[timer].divider = value;
    }

    pub fn advance_all(&mut self, cpu_cycle: u64) {
        for timer in &mut self.timers {
            timer.advance(cpu_cycle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Control=0x01, T0DIV=0x04, drive 4*256=1024 cycles: TxOUT reads 1
    // then resets to 0.
    #[test]
    fn s4_timer_tick() {
        let mut timers = Timers::new();
        timers.write_divider(0, 0x04);
        timers.apply_control(0x01, 0);
        timers.advance_all(1024);
        assert_eq!(timers.timers[0].read_and_clear(), 1);
        assert_eq!(timers.timers[0].upper_count, 0);
    }

    #[test]
    fn divider_zero_means_256() {
        let mut timers = Timers::new();
        timers.write_divider(1, 0);
        timers.apply_control(0x02, 0);
        timers.advance_all(256 * 256 - 1);
        assert_eq!(timers.timers[1].upper_count, 0);
        timers.advance_all(256 * 256);
        assert_eq!(timers.timers[1].upper_count, 1);
    }

    #[test]
    fn disabled_timer_does_not_advance() {
        let mut timers = Timers::new();
        timers.write_divider(2, 1);
        timers.advance_all(1_000_000);
        assert_eq!(timers.timers[2].upper_count, 0);
    }

    #[test]
    fn read_clears_output_counter() {
        let mut timers = Timers::new();
        timers.write_divider(2, 1);
        timers.apply_control(0x04, 0);
        timers.advance_all(32 * 3);
        assert_eq!(timers.timers[2].read_and_clear(), 3);
        assert_eq!(timers.timers[2].read_and_clear(), 0);
    }
}
