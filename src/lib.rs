//! A CHIP-8 interpreter core: memory, registers, timers, the instruction set with
//! its variant quirks, and a two-clock scheduler that talks to a host-supplied
//! [`emu::DisplayDriver`].

pub mod emu;
mod nibble;

pub use nibble::u4;
