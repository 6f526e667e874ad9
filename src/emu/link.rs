//! Hand-off between the interpreter thread and a front end running on another thread.
//!
//! Only copies cross the boundary: the interpreter publishes frames by value into
//! a single pending slot, and the front end writes key state and reads the tone flag.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use super::{DisplayDriver, Frame};
use crate::u4;

#[derive(Default)]
struct Shared {
    /// Latest unconsumed frame. A newer frame replaces a stale one.
    pending_frame: Mutex<Option<Frame>>,
    keypad: [AtomicBool; 16],
    tone: AtomicBool,
}

/// Creates a connected pair: the driver goes to the interpreter, the front end
/// stays with the rendering loop.
pub fn channel() -> (LinkDriver, Frontend) {
    let shared = Arc::new(Shared::default());

    (
        LinkDriver {
            shared: shared.clone(),
        },
        Frontend { shared },
    )
}

/// Interpreter side of the link.
pub struct LinkDriver {
    shared: Arc<Shared>,
}

impl DisplayDriver for LinkDriver {
    fn publish_frame(&mut self, frame: Frame) {
        *self
            .shared
            .pending_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    fn pressed_keys(&mut self) -> Vec<u8> {
        self.shared
            .keypad
            .iter()
            .enumerate()
            .filter(|(_, pressed)| pressed.load(Ordering::Relaxed))
            .map(|(key, _)| key as u8)
            .collect()
    }

    fn start_tone(&mut self) {
        self.shared.tone.store(true, Ordering::Relaxed);
    }

    fn stop_tone(&mut self) {
        self.shared.tone.store(false, Ordering::Relaxed);
    }
}

/// Front-end side of the link.
#[derive(Clone)]
pub struct Frontend {
    shared: Arc<Shared>,
}

impl Frontend {
    /// Takes the latest published frame, if one arrived since the last call.
    pub fn take_frame(&self) -> Option<Frame> {
        self.shared
            .pending_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&self, key: u4, pressed: bool) {
        self.shared.keypad[key].store(pressed, Ordering::Relaxed);
    }

    /// Returns true while the interpreter wants the tone to play.
    pub fn tone(&self) -> bool {
        self.shared.tone.load(Ordering::Relaxed)
    }
}
