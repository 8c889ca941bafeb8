//! The $F0-$FF control-register block.
//!
//! This struct only holds the registers that are plain byte stores
//! (Test, Control, DSP-address, the four CPU I/O ports, the two aux
//! ports). The registers with cross-component side effects — DSP-data
//! ($F3, routes through [`crate::dsp::Dsp`]) and the timer dividers/outputs
//! ($FA-$FF, route through [`crate::timers::Timers`]) — are dispatched by
//! [`crate::machine::Machine`] directly, since they need to reach into
//! sibling components that this struct does not own.
#[derive(Debug, Clone, Default)]
pub struct ControlRegisters {
    pub test: u8,
    pub control: u8,
    pub dsp_addr: u8,
    pub cpu_io: [u8; 4], // $F4-$F7
    pub aux: [u8; 2],    // $F8-$F9
}

/// Base address of the control-register block. Any address with
/// `addr & 0xFFF0 == REGISTER_BLOCK_BASE` is routed here.
pub const REGISTER_BLOCK_BASE: u16 = 0x00F0;

#[inline]
pub fn is_register_address(addr: u16) -> bool {
    addr & 0xFFF0 == REGISTER_BLOCK_BASE
}

impl ControlRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Control register bit for timer `i`'s enable flag ($F1).
    #[inline]
    pub fn timer_enabled(&self, timer: usize) -> bool {
        self.control & (1 << timer) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_block_address_mask() {
        assert!(is_register_address(0x00F0));
        assert!(is_register_address(0x00FF));
        assert!(!is_register_address(0x00EF));
        assert!(!is_register_address(0x0100));
        // The mask only looks at the low byte's high nibble plus zero
        // elsewhere in the low byte - high byte must also be zero.
        assert!(!is_register_address(0x01F0));
    }

    #[test]
    fn timer_enable_bits() {
        let mut c = ControlRegisters::new();
        c.control = 0b0000_0101; // timers 0 and 2 enabled
        assert!(c.timer_enabled(0));
        assert!(!c.timer_enabled(1));
        assert!(c.timer_enabled(2));
    }
}
