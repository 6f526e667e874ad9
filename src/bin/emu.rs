use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pixels::{Pixels, SurfaceTexture};
use rand::{SeedableRng, rngs::StdRng};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, NamedKey},
    window::{Window, WindowId},
};

use chip8_vm::{
    emu::{
        BLANK_FRAME, Chip8, Chip8Runner, DEFAULT_CPU_HZ, DISPLAY_X, DISPLAY_Y, Display, Frame,
        Quirks, RunHandle,
        link::{self, Frontend},
    },
    u4,
};

/// The rate at which pixels fade out (phosphor decay).
const DISPLAY_PHOSPHOR_RATE: f32 = 10.0;

/// Colour of lit pixels in even columns in verbose mode.
const DEBUG_COLOUR: Rgb = Rgb([0xFF, 0x00, 0x00]);

/// Mapping from physical keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x00
    KeyCode::Digit1, // 0x01
    KeyCode::Digit2, // 0x02
    KeyCode::Digit3, // 0x03
    KeyCode::KeyQ,   // 0x04
    KeyCode::KeyW,   // 0x05
    KeyCode::KeyE,   // 0x06
    KeyCode::KeyA,   // 0x07
    KeyCode::KeyS,   // 0x08
    KeyCode::KeyD,   // 0x09
    KeyCode::KeyZ,   // 0x0A
    KeyCode::KeyC,   // 0x0B
    KeyCode::Digit4, // 0x0C
    KeyCode::KeyR,   // 0x0D
    KeyCode::KeyF,   // 0x0E
    KeyCode::KeyV,   // 0x0F
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb([u8; 3]);

impl Rgb {
    /// Linear blend from `self` (t = 0) to `other` (t = 1).
    fn mix(self, other: Rgb, t: f32) -> Rgb {
        let mut out = [0; 3];
        for (c, (&a, &b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *c = (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
        }
        Rgb(out)
    }
}

/// Parses `RRGGBB` or `RGB`, with or without a leading `#`.
fn parse_colour(s: &str) -> Result<Rgb, String> {
    let hex = s.trim().trim_start_matches('#');
    let channel = |digits: &str| {
        u8::from_str_radix(digits, 16).map_err(|_| format!("Invalid hex colour: '{s}'"))
    };

    match hex.len() {
        6 if hex.is_ascii() => Ok(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 if hex.is_ascii() => {
            let mut rgb = [0; 3];
            for (c, digit) in rgb.iter_mut().zip(hex.chars()) {
                *c = channel(format!("{digit}{digit}").as_str())?;
            }
            Ok(Rgb(rgb))
        }
        _ => Err(format!("Invalid hex colour: '{s}', expected RRGGBB or RGB")),
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QuirksProfile {
    Modern,
    CosmacVip,
    SuperChip,
}

impl From<QuirksProfile> for Quirks {
    fn from(profile: QuirksProfile) -> Self {
        match profile {
            QuirksProfile::Modern => Quirks::modern(),
            QuirksProfile::CosmacVip => Quirks::cosmac_vip(),
            QuirksProfile::SuperChip => Quirks::super_chip(),
        }
    }
}

struct App {
    pixels: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    title: String,
    scale: u32,
    /// Stores the brightness of each pixel (0.0 to 1.0) to implement phosphor decay.
    display_float: Display<f32>,
    /// Latest frame received from the interpreter.
    frame: Frame,
    foreground: Rgb,
    background: Rgb,
    verbose: bool,

    /// Audio output stream (must be kept alive).
    _audio_stream: OutputStream,
    audio_sink: Sink,

    frontend: Frontend,
    run: Option<RunHandle>,
    /// Used for delta time calculation.
    last_frame_instant: Instant,

    /// Stores the result of the application to be returned from main.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(args: &Args, rom: &[u8]) -> anyhow::Result<Self> {
        // Initialize audio
        let mut _audio_stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        _audio_stream.log_on_drop(false);

        let audio_sink = Sink::connect_new(_audio_stream.mixer());
        audio_sink.pause();
        audio_sink.append(SquareWave::new(args.frequency).amplify(0.5));

        // Initialize CHIP-8
        let quirks = args.quirks();
        log::debug!("Using quirks {quirks:?}");
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let chip8 =
            Chip8::with_rng(rom, quirks, rng).context("Failed to load ROM into CHIP-8 memory")?;

        let (driver, frontend) = link::channel();
        let run = Chip8Runner::new(chip8, driver, args.clock)
            .context("Failed to configure CHIP-8 runner")?
            .spawn()
            .context("Failed to start interpreter thread")?;

        let title = args
            .rom_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chip8-vm".to_string());

        Ok(Self {
            pixels: None,
            window: None,
            title,
            scale: args.scale,
            display_float: [[0.0; DISPLAY_X]; DISPLAY_Y],
            frame: BLANK_FRAME,
            foreground: args.foreground,
            background: args.background,
            verbose: args.verbose,

            _audio_stream,
            audio_sink,

            frontend,
            run: Some(run),
            last_frame_instant: Instant::now(),
            exit_result: Ok(()),
        })
    }

    /// Stops the interpreter if it is still running and collects its result.
    fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(run) = self.run.take() {
            run.stop();
            run.join().context("Chip8 Execution error")?;
        }
        Ok(())
    }

    fn process_display(&mut self, dt: f32) -> anyhow::Result<()> {
        let buff = self
            .pixels
            .as_mut()
            .context("Pixels surface not initialized")?
            .frame_mut();

        for (i, pxl) in buff.chunks_exact_mut(4).enumerate() {
            let x = i % DISPLAY_X;
            let y = i / DISPLAY_X;
            let lit = self.frame[y][x];

            // We use display_float to track the "brightness" of each pixel over time.
            // This allows us to implement a phosphor decay effect where pixels fade out
            // slowly instead of turning off instantly.
            self.display_float[y][x] = if lit {
                1.0
            } else {
                (self.display_float[y][x] - DISPLAY_PHOSPHOR_RATE * dt).max(0.0)
            };

            let Rgb([r, g, b]) = if lit && self.verbose && x % 2 == 0 {
                DEBUG_COLOUR
            } else {
                self.background
                    .mix(self.foreground, self.display_float[y][x])
            };
            pxl.copy_from_slice(&[r, g, b, 0xff]);
        }

        Ok(())
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = {
            let size = LogicalSize::new(DISPLAY_X as u32 * self.scale, DISPLAY_Y as u32 * self.scale);
            let min_size = LogicalSize::new(DISPLAY_X as u32, DISPLAY_Y as u32);

            Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title(self.title.clone())
                            .with_inner_size(size)
                            .with_min_inner_size(min_size),
                    )
                    .context("Failed to create window")?,
            )
        };

        self.window = Some(window.clone());
        self.pixels = {
            let window_size = window.inner_size();
            let surface_texture =
                SurfaceTexture::new(window_size.width, window_size.height, window.clone());

            let pixels = Pixels::new(DISPLAY_X as u32, DISPLAY_Y as u32, surface_texture)
                .context("Failed to create pixels surface")?;

            window.request_redraw();
            Some(pixels)
        };

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        Ok(())
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                event_loop.exit();
                self.shutdown()?;
            }

            WindowEvent::Resized(size) => {
                if let Some(pixels) = self.pixels.as_mut() {
                    pixels
                        .resize_surface(size.width, size.height)
                        .context("Failed to resize pixels surface")?;
                }
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame_instant).as_secs_f32();
                self.last_frame_instant = now;

                // The interpreter only finishes on its own when it faults
                if self.run.as_ref().is_some_and(RunHandle::is_finished) {
                    event_loop.exit();
                    self.shutdown()?;
                    return Ok(());
                }

                if let Some(frame) = self.frontend.take_frame() {
                    self.frame = frame;
                }

                if self.frontend.tone() {
                    self.audio_sink.play();
                } else {
                    self.audio_sink.pause();
                }

                self.process_display(dt)?;

                self.pixels
                    .as_ref()
                    .context("Pixels surface not initialized")?
                    .render()
                    .context("Pixels render error")?;

                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = KEY_MAP.iter().position(|&k| k == event.physical_key) {
                    let pressed = event.state == ElementState::Pressed;
                    self.frontend.set_key(u4::new(key as u8), pressed);
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

/// CHIP-8 interpreter written in Rust.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape is used to exit the emulator.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Approximate instruction clock speed in hertz
    #[arg(short, long, default_value_t = DEFAULT_CPU_HZ, value_parser = clap::value_parser!(u32).range(1..))]
    clock: u32,

    /// Window scale factor
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=64))]
    scale: u32,

    /// Sound timer tone frequency in hertz
    #[arg(long, default_value_t = 350.0)]
    frequency: f32,

    /// Foreground hex colour
    #[arg(short, long, default_value = "3D8026", value_parser = parse_colour)]
    foreground: Rgb,

    /// Background hex colour
    #[arg(short, long, default_value = "F9FFB3", value_parser = parse_colour)]
    background: Rgb,

    /// CPU variant whose quirks to emulate
    #[arg(long, value_enum, default_value_t = QuirksProfile::Modern)]
    quirks: QuirksProfile,

    /// Override: copy VY into VX before 8XY6/8XYE shifts
    #[arg(long, value_name = "BOOL")]
    copy_registers_on_shift: Option<bool>,

    /// Override: BNNN jumps to XNN + VX
    #[arg(long, value_name = "BOOL")]
    variable_offset_register: Option<bool>,

    /// Override: FX1E leaves VF alone when I passes 0xFFF
    #[arg(long, value_name = "BOOL")]
    disable_set_flag_on_ir_overflow: Option<bool>,

    /// Override: FX55/FX65 advance I
    #[arg(long, value_name = "BOOL")]
    increment_index_register_on_load_save: Option<bool>,

    /// Seed for the CXNN random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Log every executed instruction and highlight even pixel columns
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn quirks(&self) -> Quirks {
        let profile = Quirks::from(self.quirks);

        Quirks {
            copy_registers_on_shift: self
                .copy_registers_on_shift
                .unwrap_or(profile.copy_registers_on_shift),
            variable_offset_register: self
                .variable_offset_register
                .unwrap_or(profile.variable_offset_register),
            disable_set_flag_on_ir_overflow: self
                .disable_set_flag_on_ir_overflow
                .unwrap_or(profile.disable_set_flag_on_ir_overflow),
            increment_index_register_on_load_save: self
                .increment_index_register_on_load_save
                .unwrap_or(profile.increment_index_register_on_load_save),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "info,chip8_vm=trace,emu=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&args, &rom).context("Failed to initialize application")?;
    event_loop
        .run_app(&mut app)
        .context("Error occurred during event loop execution")?;

    // The event loop may end without a close event
    let shutdown = app.shutdown();

    // Return the result captured during the event loop
    app.exit_result.and(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_colours() {
        assert_eq!(parse_colour("3D8026"), Ok(Rgb([0x3D, 0x80, 0x26])));
        assert_eq!(parse_colour("#f9ffb3"), Ok(Rgb([0xF9, 0xFF, 0xB3])));
        assert_eq!(parse_colour("#abc"), Ok(Rgb([0xAA, 0xBB, 0xCC])));
    }

    #[test]
    fn rejects_malformed_colours() {
        assert!(parse_colour("12345").is_err());
        assert!(parse_colour("GG0000").is_err());
        assert!(parse_colour("").is_err());
    }

    #[test]
    fn quirk_overrides_apply_on_top_of_profile() {
        let args = Args::parse_from([
            "emu",
            "rom.ch8",
            "--quirks",
            "cosmac-vip",
            "--increment-index-register-on-load-save",
            "false",
        ]);

        let quirks = args.quirks();
        assert!(quirks.disable_set_flag_on_ir_overflow);
        assert!(!quirks.increment_index_register_on_load_save);
    }

    #[test]
    fn defaults_match_modern_profile() {
        let args = Args::parse_from(["emu", "rom.ch8"]);

        assert_eq!(args.clock, DEFAULT_CPU_HZ);
        assert_eq!(args.quirks(), Quirks::default());
        assert_eq!(args.foreground, Rgb([0x3D, 0x80, 0x26]));
    }

    #[test]
    fn zero_clock_is_rejected() {
        assert!(Args::try_parse_from(["emu", "rom.ch8", "--clock", "0"]).is_err());
    }
}
