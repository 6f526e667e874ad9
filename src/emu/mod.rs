mod chip8;
mod driver;
mod execute;
mod font;
pub mod link;
mod opcode;
mod quirks;
mod runner;
mod types;

pub use chip8::*;
pub use driver::DisplayDriver;
pub use font::*;
pub use opcode::*;
pub use quirks::*;
pub use runner::*;
pub use types::*;
