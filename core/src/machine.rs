//! Wires RAM, the control-register block, the DSP and the three timers
//! to the SPC700 interpreter, and drives the whole thing one instruction
//! at a time.

use crate::bus::Bus;
use crate::control::{self, ControlRegisters};
use crate::cpu::Spc700;
use crate::dsp::Dsp;
use crate::timers::Timers;

/// CPU cycles between DSP ticks: the interpreter's ~2.048 MHz clock
/// divided by the DSP's fixed 32 kHz sample rate.
const CYCLES_PER_DSP_TICK: u64 = 64;

pub struct Machine {
    ram: Box<[u8; 0x10000]>,
    control: ControlRegisters,
    dsp: Dsp,
    timers: Timers,
    cpu: Spc700,
    next_sample_cycle: u64,
}

impl Machine {
    pub fn new() -> Self {
        let mut machine = Self {
            ram: Box::new([0; 0x10000]),
            control: ControlRegisters::new(),
            dsp: Dsp::new(),
            timers: Timers::new(),
            cpu: Spc700::new(),
            next_sample_cycle: CYCLES_PER_DSP_TICK,
        };
        machine.reset();
        machine
    }

    /// Resets the CPU through the reset vector and re-arms the sample
    /// scheduler. Does not clear RAM or DSP state — callers loading a
    /// snapshot do so after construction, before (or instead of) calling
    /// this again.
    pub fn reset(&mut self) {
        // Split the borrow: `cpu.reset` needs `&mut Spc700` and `&mut dyn
        // Bus` simultaneously, and the only Bus impl here is `Machine`
        // itself. A raw pointer sidesteps the aliasing rule the borrow
        // checker can't otherwise see through; `step` below reasons
        // identically.
        let bus_ptr: *mut Self = self;
        unsafe {
            let bus = &mut *bus_ptr as &mut dyn Bus;
            self.cpu.reset(bus);
        }
        self.next_sample_cycle = self.cpu.cycle + CYCLES_PER_DSP_TICK;
    }

    pub fn ram(&self) -> &[u8; 0x10000] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8; 0x10000] {
        &mut self.ram
    }

    pub fn cpu(&self) -> &Spc700 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Spc700 {
        &mut self.cpu
    }

    pub fn dsp(&self) -> &Dsp {
        &self.dsp
    }

    pub fn dsp_mut(&mut self) -> &mut Dsp {
        &mut self.dsp
    }

    /// Restores a 128-byte DSP register image captured by
    /// [`Dsp::dump_registers`], replaying each write through the bus so
    /// voices resync their pitch/ADSR/gain and any pending key-on fires
    /// against the already-loaded RAM.
    pub fn load_dsp_registers(&mut self, image: &[u8; 128]) {
        let bus_ptr: *mut Self = self;
        unsafe {
            let bus = &mut *bus_ptr as &mut dyn Bus;
            self.dsp.load_registers(image, bus);
        }
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn control(&self) -> &ControlRegisters {
        &self.control
    }

    /// Executes one instruction, advances the timers by its cycle cost,
    /// and returns a stereo sample whenever this step's cycles crossed
    /// the 32 kHz grid (spec's driver loop step 2-3, collapsed into one
    /// call since this crate has no separate scheduler thread).
    pub fn step(&mut self) -> Option<(i16, i16)> {
        let bus_ptr: *mut Self = self;
        unsafe {
            let bus = &mut *bus_ptr as &mut dyn Bus;
            self.cpu.step(bus);
        }
        self.timers.advance_all(self.cpu.cycle);

        if self.cpu.cycle < self.next_sample_cycle {
            return None;
        }
        self.next_sample_cycle += CYCLES_PER_DSP_TICK;

        let bus_ptr: *mut Self = self;
        let sample = unsafe {
            let bus = &mut *bus_ptr as &mut dyn Bus;
            self.dsp.next_sample(bus)
        };
        Some(sample)
    }

    fn read_register(&mut self, addr: u16) -> u8 {
        match (addr & 0x0F) as u8 {
            0x00 => self.control.test,
            0x01 => self.control.control,
            0x02 => self.control.dsp_addr,
            0x03 => self.dsp.read_register(self.control.dsp_addr),
            offset @ 0x04..=0x07 => self.control.cpu_io[(offset - 0x04) as usize],
            offset @ 0x08..=0x09 => self.control.aux[(offset - 0x08) as usize],
            offset @ 0x0A..=0x0C => self.timers.timers[(offset - 0x0A) as usize].divider,
            offset @ 0x0D..=0x0F => self.timers.timers[(offset - 0x0D) as usize].read_and_clear(),
            _ => unreachable!("register block offset is masked to 4 bits"),
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        match (addr & 0x0F) as u8 {
            0x00 => self.control.test = value,
            0x01 => {
                self.control.control = value;
                self.timers.apply_control(value, self.cpu.cycle);
            }
            0x02 => self.control.dsp_addr = value & 0x7F,
            0x03 => {
                let dsp_addr = self.control.dsp_addr;
                let bus_ptr: *mut Self = self;
                unsafe {
                    let bus = &mut *bus_ptr as &mut dyn Bus;
                    self.dsp.write_register(dsp_addr, value, bus);
                }
            }
            offset @ 0x04..=0x07 => self.control.cpu_io[(offset - 0x04) as usize] = value,
            offset @ 0x08..=0x09 => self.control.aux[(offset - 0x08) as usize] = value,
            offset @ 0x0A..=0x0C => self.timers.write_divider((offset - 0x0A) as usize, value),
            0x0D..=0x0F => {} // timer output counters: writes are rejected
            _ => unreachable!("register block offset is masked to 4 bits"),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for Machine {
    fn read(&mut self, addr: u16) -> u8 {
        if control::is_register_address(addr) {
            self.read_register(addr)
        } else {
            self.ram[addr as usize]
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if control::is_register_address(addr) {
            self.write_register(addr, value);
        } else {
            self.ram[addr as usize] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_jumps_to_vector_and_clears_ram_is_not_assumed() {
        let mut machine = Machine::new();
        machine.ram_mut()[0xFFFE] = 0x00;
        machine.ram_mut()[0xFFFF] = 0x10;
        machine.reset();
        assert_eq!(machine.cpu().regs.pc, 0x1000);
    }

    #[test]
    fn register_block_read_write_round_trips_cpu_ports() {
        let mut machine = Machine::new();
        machine.write(0x00F4, 0xAB);
        assert_eq!(machine.read(0x00F4), 0xAB);
    }

    #[test]
    fn timer_output_register_reads_clear_on_read() {
        let mut machine = Machine::new();
        machine.write(0x00FA, 0x01); // divider = 1
        machine.write(0x00F1, 0x01); // enable timer 0
        for _ in 0..300 {
            machine.step();
        }
        let first = machine.read(0x00FD);
        let second = machine.read(0x00FD);
        assert_eq!(second, 0);
        let _ = first;
    }

    #[test]
    fn dsp_register_port_round_trips_through_f2_f3() {
        let mut machine = Machine::new();
        machine.write(0x00F2, 0x0C); // select MVOLL
        machine.write(0x00F3, 0x40);
        assert_eq!(machine.dsp().read_register(0x0C), 0x40);
        machine.write(0x00F2, 0x0C);
        assert_eq!(machine.read(0x00F3), 0x40);
    }

    #[test]
    fn step_emits_a_sample_every_64_cycles() {
        let mut machine = Machine::new();
        let mut emitted = 0;
        for _ in 0..200 {
            if machine.step().is_some() {
                emitted += 1;
            }
        }
        assert!(emitted > 0);
    }
}
