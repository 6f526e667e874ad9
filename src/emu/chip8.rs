use rand::{SeedableRng, rngs::StdRng};

use super::{
    BLANK_FRAME, Chip8Error, DisplayDriver, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, Frame,
    Opcode, Quirks,
};
use crate::u4;

// Standard CHIP-8 memory layout
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;
/// Every address an instruction computes is reduced to 12 bits.
pub(crate) const ADDRESS_MASK: u16 = 0x0FFF;

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Frame,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: Vec<u16>,
    /// The two bytes fetched by the last cycle
    pub(crate) current_instruction: [u8; 2],

    /// Delay timer: decrements at 60Hz until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements at 60Hz, beeps while non-zero
    pub(crate) sound_timer: u8,

    pub(crate) quirks: Quirks,
    /// Source of CXNN random bytes
    pub(crate) rng: StdRng,
}

impl Chip8 {
    /// Creates a machine with `rom` loaded and a generator seeded from the OS.
    pub fn new(rom: &[u8], quirks: Quirks) -> Result<Self, Chip8Error> {
        Self::with_rng(rom, quirks, StdRng::from_os_rng())
    }

    /// Creates a machine with `rom` loaded, drawing CXNN bytes from `rng`.
    pub fn with_rng(rom: &[u8], quirks: Quirks, rng: StdRng) -> Result<Self, Chip8Error> {
        let mut chip8 = Chip8 {
            memory: [0; MEMORY_SIZE],
            display: BLANK_FRAME,
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: Vec::new(),
            current_instruction: [0; 2],
            delay_timer: 0,
            sound_timer: 0,
            quirks,
            rng,
        };
        chip8.load(rom)?;

        Ok(chip8)
    }

    /// Loads the font and copies `rom` to 0x200.
    fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        let rom_end = ROM_START_ADDRESS + rom.len();
        self.memory
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomTooLarge {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            })?
            .copy_from_slice(rom);

        log::info!(
            "Loaded {} byte ROM at {:#05X}..{:#05X}",
            rom.len(),
            ROM_START_ADDRESS,
            rom_end
        );

        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    pub fn cpu_cycle<D: DisplayDriver + ?Sized>(&mut self, driver: &mut D) -> Result<(), Chip8Error> {
        let instruction = self.fetch();

        let Some(opcode) = Opcode::decode(instruction) else {
            return Err(Chip8Error::UnknownOpcode {
                pc: self.instruction_address(),
                instruction,
            });
        };

        log::trace!("{:#05X}: {:?}", self.instruction_address(), opcode);
        self.execute(opcode, driver)
    }

    /// Decrements both timers and switches the tone to match the sound timer.
    /// Should be called at 60Hz.
    pub fn timers_cycle<D: DisplayDriver + ?Sized>(&mut self, driver: &mut D) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);

        if self.should_beep() {
            driver.start_tone();
        } else {
            driver.stop_tone();
        }
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn register(&self, x: u4) -> u8 {
        self.v[x]
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn current_instruction(&self) -> [u8; 2] {
        self.current_instruction
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn display(&self) -> &Frame {
        &self.display
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.display[y][x]
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    /// Fetches the two instruction bytes at the program counter and advances it.
    fn fetch(&mut self) -> [u8; 2] {
        self.current_instruction = [self.mem_read(self.pc), self.mem_read(self.pc.wrapping_add(1))];
        self.pc = self.pc.wrapping_add(2);

        self.current_instruction
    }

    /// Address the current instruction was fetched from. Only meaningful until
    /// the instruction modifies the program counter.
    pub(crate) fn instruction_address(&self) -> u16 {
        self.pc.wrapping_sub(2) & ADDRESS_MASK
    }

    pub(crate) fn mem_read(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr & ADDRESS_MASK)]
    }

    pub(crate) fn mem_write(&mut self, addr: u16, value: u8) {
        self.memory[usize::from(addr & ADDRESS_MASK)] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_places_font_and_rom() {
        let chip8 = Chip8::new(&[0xAB, 0xCD], Quirks::default()).unwrap();

        assert_eq!(chip8.memory[FONT_START_ADDRESS..FONT_END_ADDRESS], FONT);
        assert_eq!(chip8.memory[0x200..0x202], [0xAB, 0xCD]);
        assert_eq!(chip8.pc(), 0x200);
    }

    #[test]
    fn load_accepts_rom_filling_memory() {
        let rom = vec![0x12; MAX_ROM_SIZE];
        let chip8 = Chip8::new(&rom, Quirks::default()).unwrap();

        assert_eq!(chip8.memory[MEMORY_SIZE - 1], 0x12);
    }

    #[test]
    fn load_rejects_oversized_rom() {
        let rom = vec![0; MAX_ROM_SIZE + 1];

        let err = Chip8::new(&rom, Quirks::default()).err();
        assert_eq!(
            err,
            Some(Chip8Error::RomTooLarge {
                size: MAX_ROM_SIZE + 1,
                max_size: 3584
            })
        );
    }

    #[test]
    fn memory_access_wraps_at_4k() {
        let mut chip8 = Chip8::new(&[], Quirks::default()).unwrap();

        chip8.mem_write(0x1005, 0x77);
        assert_eq!(chip8.memory[0x005], 0x77);
        assert_eq!(chip8.mem_read(0xF005), 0x77);
    }

    #[test]
    fn fetch_wraps_past_end_of_memory() {
        let mut chip8 = Chip8::new(&[], Quirks::default()).unwrap();
        chip8.memory[0xFFF] = 0x12;
        chip8.memory[0x000] = 0x34;
        chip8.pc = 0xFFF;

        assert_eq!(chip8.fetch(), [0x12, 0x34]);
        assert_eq!(chip8.pc(), 0x1001);
    }
}
