pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
/// A type alias for the CHIP-8 display buffer representation
pub type Display<T> = [[T; DISPLAY_X]; DISPLAY_Y];
/// A full-frame snapshot handed to the display driver.
pub type Frame = Display<bool>;

/// An all-off frame.
pub const BLANK_FRAME: Frame = [[false; DISPLAY_X]; DISPLAY_Y];

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Unknown opcode {:02X}{:02X} at address {pc:#05X}", .instruction[0], .instruction[1])]
    UnknownOpcode { pc: u16, instruction: [u8; 2] },

    #[error("Stack underflow: return with empty call stack at address {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("Instruction clock rate must be a positive number of hertz")]
    InvalidClockRate,
}
