use rand::Rng;

use super::{
    BLANK_FRAME, Chip8, Chip8Error, DISPLAY_X, DISPLAY_Y, DisplayDriver, Opcode, OpcodeALU,
    driver::valid_pressed_keys, font::glyph_address,
};
use crate::u4;

impl Chip8 {
    /// Executes an already fetched and decoded instruction. The program counter
    /// already points past it.
    pub(crate) fn execute<D: DisplayDriver + ?Sized>(
        &mut self,
        opcode: Opcode,
        driver: &mut D,
    ) -> Result<(), Chip8Error> {
        match opcode {
            Opcode::ClearDisplay => {
                self.display = BLANK_FRAME;
                driver.publish_frame(self.display);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { nnn } => {
                let offset_reg = if self.quirks.variable_offset_register {
                    u4::low((nnn >> 8) as u8)
                } else {
                    u4::new(0)
                };
                self.pc = nnn.wrapping_add(self.v[offset_reg].into());
            }
            Opcode::Call { nnn } => {
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self.stack.pop().ok_or(Chip8Error::StackUnderflow {
                    pc: self.instruction_address(),
                })?;
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
                if !self.quirks.disable_set_flag_on_ir_overflow {
                    self.v[u4::VF] = u8::from(self.i > 0x0FFF);
                }
            }
            Opcode::Draw { x, y, n } => {
                self.execute_draw(x, y, n);
                driver.publish_frame(self.display);
            }
            Opcode::SkipIfPressed { x } => {
                let pressed = self.is_key_pressed(driver, self.v[x]);
                self.skip_if(pressed);
            }
            Opcode::SkipIfNotPressed { x } => {
                let pressed = self.is_key_pressed(driver, self.v[x]);
                self.skip_if(!pressed);
            }
            Opcode::WaitForKey { x } => {
                self.execute_wait_for_key(x, driver);
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = glyph_address(self.v[x]);
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                self.mem_write(self.i, value / 100);
                self.mem_write(self.i.wrapping_add(1), (value / 10) % 10);
                self.mem_write(self.i.wrapping_add(2), value % 10);
            }
            Opcode::StoreRegs { x } => {
                for (offset, reg) in x.up_to().enumerate() {
                    self.mem_write(self.i.wrapping_add(offset as u16), self.v[reg]);
                }
                self.advance_index_after_transfer(x);
            }
            Opcode::LoadRegs { x } => {
                for (offset, reg) in x.up_to().enumerate() {
                    self.v[reg] = self.mem_read(self.i.wrapping_add(offset as u16));
                }
                self.advance_index_after_transfer(x);
            }
        };

        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn advance_index_after_transfer(&mut self, x: u4) {
        if self.quirks.increment_index_register_on_load_save {
            self.i = self.i.wrapping_add(x.value().into());
        }
    }

    fn is_key_pressed<D: DisplayDriver + ?Sized>(&self, driver: &mut D, key: u8) -> bool {
        valid_pressed_keys(driver)
            .into_iter()
            .any(|pressed| u8::from(pressed) == key)
    }

    /// Flags are computed from the operands before Vx is written, and VF is
    /// written last so it wins when x is VF.
    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        let (vx, vy) = (self.v[x], self.v[y]);

        let (result, flag) = match op {
            OpcodeALU::Set => (vy, None),
            OpcodeALU::Or => (vx | vy, None),
            OpcodeALU::And => (vx & vy, None),
            OpcodeALU::Xor => (vx ^ vy, None),
            OpcodeALU::Add => {
                let (res, overflow) = vx.overflowing_add(vy);
                (res, Some(overflow))
            }
            OpcodeALU::Sub => (vx.wrapping_sub(vy), Some(vx >= vy)),
            OpcodeALU::SubReverse => (vy.wrapping_sub(vx), Some(vx < vy)),
            OpcodeALU::ShiftRight => {
                let source = self.shift_source(vx, vy);
                (source >> 1, Some(source & 0x01 != 0))
            }
            OpcodeALU::ShiftLeft => {
                let source = self.shift_source(vx, vy);
                (source << 1, Some(source & 0x80 != 0))
            }
        };

        self.v[x] = result;
        if let Some(flag) = flag {
            self.v[u4::VF] = u8::from(flag);
        }
    }

    fn shift_source(&self, vx: u8, vy: u8) -> u8 {
        if self.quirks.copy_registers_on_shift { vy } else { vx }
    }

    /// XORs an n-row sprite from memory at I onto the display. The start point
    /// wraps around the screen, the sprite itself is clipped at the edges.
    fn execute_draw(&mut self, x: u4, y: u4, n: u4) {
        let x_pos = self.v[x] as usize % DISPLAY_X;
        let y_pos = self.v[y] as usize % DISPLAY_Y;

        // Don't draw out of bounds
        let row_count = std::cmp::min(usize::from(n), DISPLAY_Y - y_pos);
        let col_count = std::cmp::min(8, DISPLAY_X - x_pos);

        let mut any_erased = false;
        for row in 0..row_count {
            let sprite_byte = self.mem_read(self.i.wrapping_add(row as u16));

            for col in 0..col_count {
                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let pixel = &mut self.display[y_pos + row][x_pos + col];

                    // Flip the pixel
                    *pixel ^= true;

                    if !*pixel {
                        any_erased = true;
                    }
                }
            }
        }

        self.v[u4::VF] = u8::from(any_erased);
    }

    fn execute_wait_for_key<D: DisplayDriver + ?Sized>(&mut self, x: u4, driver: &mut D) {
        match valid_pressed_keys(driver).first() {
            Some(&key) => {
                self.v[x] = key.into();
            }
            None => {
                // Repeat this instruction on the next tick
                self.pc = self.pc.wrapping_sub(2);
            }
        }
    }
}
