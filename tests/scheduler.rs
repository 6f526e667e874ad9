mod common;

use std::{thread, time::Duration};

use chip8_vm::emu::{Chip8Error, Chip8Runner, RunState, link};
use common::{RecordingDriver, ToneCommand, chip8};
use crossbeam_channel::bounded;

/// 200: jump to 200
const SPIN: [u8; 2] = [0x12, 0x00];

#[test]
fn spawned_run_stops_on_cancel() {
    let runner = Chip8Runner::new(chip8(&SPIN), RecordingDriver::default(), 500).unwrap();
    let handle = runner.spawn().unwrap();

    thread::sleep(Duration::from_millis(50));
    assert!(!handle.is_finished());

    handle.stop();
    assert_eq!(handle.join(), Ok(()));
}

#[test]
fn fault_ends_the_run_with_the_error() {
    let runner = Chip8Runner::new(chip8(&[0x00, 0xEE]), RecordingDriver::default(), 500).unwrap();
    let handle = runner.spawn().unwrap();

    assert_eq!(handle.join(), Err(Chip8Error::StackUnderflow { pc: 0x200 }));
}

#[test]
fn dropped_cancel_sender_stops_the_run() {
    let mut runner = Chip8Runner::new(chip8(&SPIN), RecordingDriver::default(), 500).unwrap();
    let (cancel_tx, cancel_rx) = bounded::<()>(1);
    drop(cancel_tx);

    assert_eq!(runner.run(&cancel_rx), Ok(()));
    assert_eq!(runner.state(), RunState::Stopped);
    assert_eq!(runner.driver_ref().tone.last(), Some(&ToneCommand::Stop));

    // Stopped is terminal
    assert_eq!(runner.run(&cancel_rx), Ok(()));
    assert_eq!(runner.state(), RunState::Stopped);
}

#[test]
fn both_clocks_advance_while_running() {
    let (driver, frontend) = link::channel();
    let mut runner = Chip8Runner::new(
        chip8(&[
            0x60, 0x78, // V0 = 120
            0xF0, 0x15, // delay = V0
            0x00, 0xE0, // clear screen
            0x12, 0x06, // loop
        ]),
        driver,
        500,
    )
    .unwrap();
    let (cancel_tx, cancel_rx) = bounded(1);

    let result = thread::scope(|s| {
        let run = s.spawn(|| runner.run(&cancel_rx));
        thread::sleep(Duration::from_millis(300));
        cancel_tx.send(()).unwrap();
        run.join().unwrap()
    });

    assert_eq!(result, Ok(()));
    assert_eq!(runner.chip8_ref().pc(), 0x206);
    let delay = runner.chip8_ref().delay_timer();
    assert!(delay > 0 && delay < 120, "delay timer at {delay}");
    assert!(frontend.take_frame().is_some());
    assert!(!frontend.tone());
}
