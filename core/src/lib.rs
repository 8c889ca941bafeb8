pub mod bus;
pub mod control;
pub mod cpu;
pub mod debug;
pub mod dsp;
pub mod machine;
pub mod timers;

pub mod prelude {
    pub use crate::bus::Bus;
    pub use crate::cpu::Spc700;
    pub use crate::debug::{DspDump, RegisterDump};
    pub use crate::machine::Machine;
}
