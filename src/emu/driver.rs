use super::Frame;
use crate::u4;

/// The host side of the interpreter: renders frames, reports keys and plays the tone.
///
/// Implementations live outside the core and are called synchronously from the
/// interpreter thread, so none of these calls may block for long.
pub trait DisplayDriver {
    /// Hands over a copy of the display buffer. The driver owns it from now on.
    fn publish_frame(&mut self, frame: Frame);

    /// Keys currently held down. Order is irrelevant; values outside 0x0-0xF are ignored.
    fn pressed_keys(&mut self) -> Vec<u8>;

    /// Starts the tone. Calling it while the tone is already playing is a no-op.
    fn start_tone(&mut self);

    /// Stops the tone. Calling it while the tone is silent is a no-op.
    fn stop_tone(&mut self);
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for &mut D {
    fn publish_frame(&mut self, frame: Frame) {
        (**self).publish_frame(frame)
    }

    fn pressed_keys(&mut self) -> Vec<u8> {
        (**self).pressed_keys()
    }

    fn start_tone(&mut self) {
        (**self).start_tone()
    }

    fn stop_tone(&mut self) {
        (**self).stop_tone()
    }
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for Box<D> {
    fn publish_frame(&mut self, frame: Frame) {
        (**self).publish_frame(frame)
    }

    fn pressed_keys(&mut self) -> Vec<u8> {
        (**self).pressed_keys()
    }

    fn start_tone(&mut self) {
        (**self).start_tone()
    }

    fn stop_tone(&mut self) {
        (**self).stop_tone()
    }
}

/// Queries the driver and keeps only valid key values, in reported order.
pub(crate) fn valid_pressed_keys<D: DisplayDriver + ?Sized>(driver: &mut D) -> Vec<u4> {
    driver
        .pressed_keys()
        .into_iter()
        .filter_map(|key| {
            let valid = u4::try_new(key);
            if valid.is_none() {
                log::warn!("Ignoring invalid key value {key:#04X} reported by display driver");
            }
            valid
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Keys(Vec<u8>);

    impl DisplayDriver for Keys {
        fn publish_frame(&mut self, _frame: Frame) {}
        fn pressed_keys(&mut self) -> Vec<u8> {
            self.0.clone()
        }
        fn start_tone(&mut self) {}
        fn stop_tone(&mut self) {}
    }

    #[test]
    fn invalid_keys_are_filtered_out() {
        let mut driver = Keys(vec![0x10, 0x3, 0xFF, 0xA]);
        assert_eq!(valid_pressed_keys(&mut driver), [u4::new(0x3), u4::new(0xA)]);
    }
}
