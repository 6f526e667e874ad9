/// Selects between documented behavioural differences of CHIP-8 variants.
///
/// Fixed at construction; the interpreter never changes it during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE: copy VY into VX before shifting.
    pub copy_registers_on_shift: bool,
    /// BNNN behaves as BXNN: jump to XNN + VX instead of NNN + V0.
    pub variable_offset_register: bool,
    /// FX1E: leave VF untouched when I passes 0x0FFF.
    pub disable_set_flag_on_ir_overflow: bool,
    /// FX55/FX65: advance I by X after the transfer.
    pub increment_index_register_on_load_save: bool,
}

impl Quirks {
    /// Modern CHIP-8 behaviour, expected by most ROMs written today.
    pub const fn modern() -> Self {
        Self {
            copy_registers_on_shift: true,
            variable_offset_register: false,
            disable_set_flag_on_ir_overflow: false,
            increment_index_register_on_load_save: false,
        }
    }

    /// The original COSMAC VIP interpreter.
    pub const fn cosmac_vip() -> Self {
        Self {
            copy_registers_on_shift: true,
            variable_offset_register: false,
            disable_set_flag_on_ir_overflow: true,
            increment_index_register_on_load_save: true,
        }
    }

    /// SUPER-CHIP 1.1 on the HP48.
    pub const fn super_chip() -> Self {
        Self {
            copy_registers_on_shift: false,
            variable_offset_register: true,
            disable_set_flag_on_ir_overflow: true,
            increment_index_register_on_load_save: false,
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self::modern()
    }
}
