use std::collections::VecDeque;

use chip8_vm::emu::{Chip8, DisplayDriver, Frame, Quirks};
use rand::{SeedableRng, rngs::StdRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCommand {
    Start,
    Stop,
}

/// Records everything the interpreter sends and replays scripted key sets.
#[derive(Default)]
pub struct RecordingDriver {
    pub frames: Vec<Frame>,
    pub tone: Vec<ToneCommand>,
    /// Key sets returned by successive `pressed_keys` calls; empty once exhausted.
    pub scripted_keys: VecDeque<Vec<u8>>,
}

impl DisplayDriver for RecordingDriver {
    fn publish_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pressed_keys(&mut self) -> Vec<u8> {
        self.scripted_keys.pop_front().unwrap_or_default()
    }

    fn start_tone(&mut self) {
        self.tone.push(ToneCommand::Start);
    }

    fn stop_tone(&mut self) {
        self.tone.push(ToneCommand::Stop);
    }
}

pub fn chip8(rom: &[u8]) -> Chip8 {
    Chip8::with_rng(rom, Quirks::default(), StdRng::seed_from_u64(0x5EED)).unwrap()
}
