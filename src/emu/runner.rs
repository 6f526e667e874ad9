use std::{
    io,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};

use super::{Chip8, Chip8Error, DisplayDriver};

pub const DEFAULT_CPU_HZ: u32 = 500;
pub const TIMER_HZ: u32 = 60;

/// Lifecycle of a runner. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// Drives a [`Chip8`] from two independent clocks: the instruction clock at the
/// configured rate and the 60Hz timer clock.
///
/// Both clocks are serviced from the one thread that calls [`Chip8Runner::run`],
/// so instructions and timer decrements never overlap.
pub struct Chip8Runner<D> {
    chip8: Chip8,
    driver: D,
    cpu_hz: u32,
    state: RunState,
}

impl<D: DisplayDriver> Chip8Runner<D> {
    pub fn new(chip8: Chip8, driver: D, cpu_hz: u32) -> Result<Self, Chip8Error> {
        if cpu_hz == 0 {
            return Err(Chip8Error::InvalidClockRate);
        }

        Ok(Self {
            chip8,
            driver,
            cpu_hz,
            state: RunState::Running,
        })
    }

    /// Services one instruction clock firing: a full fetch-decode-execute cycle.
    pub fn cpu_tick(&mut self) -> Result<(), Chip8Error> {
        self.chip8.cpu_cycle(&mut self.driver)
    }

    /// Services one timer clock firing.
    pub fn timer_tick(&mut self) {
        self.chip8.timers_cycle(&mut self.driver);
    }

    /// Runs until `cancel` receives a message or is disconnected, or until an
    /// instruction faults.
    ///
    /// Returns `Ok(())` on cancellation and the fault otherwise. Firings missed
    /// while busy are coalesced, not caught up. Either way the runner ends up
    /// `Stopped` and the tone is switched off.
    pub fn run(&mut self, cancel: &Receiver<()>) -> Result<(), Chip8Error> {
        if self.state == RunState::Stopped {
            log::warn!("Runner already stopped, not starting again");
            return Ok(());
        }

        let cpu_clock = tick(Duration::from_secs(1) / self.cpu_hz);
        let timer_clock = tick(Duration::from_secs(1) / TIMER_HZ);
        log::info!(
            "Interpreter running at {} Hz (timers at {} Hz)",
            self.cpu_hz,
            TIMER_HZ
        );

        let result = loop {
            select! {
                recv(cancel) -> _ => break Ok(()),
                recv(cpu_clock) -> _ => {
                    if let Err(e) = self.cpu_tick() {
                        break Err(e);
                    }
                }
                recv(timer_clock) -> _ => self.timer_tick(),
            }
        };

        self.state = RunState::Stopped;
        self.driver.stop_tone();

        match &result {
            Ok(()) => log::info!("Interpreter stopped"),
            Err(e) => log::error!("Interpreter stopped on fault: {e}"),
        }

        result
    }

    pub fn cpu_hz(&self) -> u32 {
        self.cpu_hz
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }

    pub fn driver_ref(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: DisplayDriver + Send + 'static> Chip8Runner<D> {
    /// Starts [`Chip8Runner::run`] on its own thread.
    pub fn spawn(mut self) -> io::Result<RunHandle> {
        let (cancel_tx, cancel_rx) = bounded(1);

        let thread = thread::Builder::new()
            .name("chip8-interpreter".to_string())
            .spawn(move || self.run(&cancel_rx))?;

        Ok(RunHandle {
            cancel: cancel_tx,
            thread,
        })
    }
}

/// Controls a runner started with [`Chip8Runner::spawn`].
pub struct RunHandle {
    cancel: Sender<()>,
    thread: JoinHandle<Result<(), Chip8Error>>,
}

impl RunHandle {
    /// Asks the runner to stop after the instruction in flight.
    pub fn stop(&self) {
        // A full channel means a stop is already pending
        let _ = self.cancel.try_send(());
    }

    /// True once the runner has stopped, by cancellation or fault.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the runner to finish, returning the fault if one ended the run.
    /// Call [`RunHandle::stop`] first unless the run is expected to fault.
    pub fn join(self) -> Result<(), Chip8Error> {
        match self.thread.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
