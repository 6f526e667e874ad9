use std::fmt;
use std::ops::{Index, IndexMut};

/// A 4-bit unsigned integer (nibble), used to address the sixteen V registers
/// and the sixteen keypad keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// The flag register VF.
    pub const VF: u4 = u4(0xF);

    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    /// Creates a `u4` from the low four bits of `value`, discarding the rest.
    pub const fn low(value: u8) -> Self {
        Self(value & 0x0F)
    }

    /// Creates a `u4` if `value` fits in four bits.
    pub const fn try_new(value: u8) -> Option<Self> {
        if value <= 0x0F { Some(Self(value)) } else { None }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Iterates over V0..=self.
    pub fn up_to(self) -> impl Iterator<Item = u4> {
        (0..=self.0).map(u4)
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl From<u4> for u8 {
    fn from(v: u4) -> u8 {
        v.0
    }
}

impl fmt::Display for u4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_masks_high_bits() {
        assert_eq!(u4::low(0xAB), u4::new(0xB));
    }

    #[test]
    fn try_new_rejects_out_of_range() {
        assert_eq!(u4::try_new(0x0F), Some(u4::VF));
        assert_eq!(u4::try_new(0x10), None);
    }

    #[test]
    fn up_to_is_inclusive() {
        let regs: Vec<u8> = u4::new(3).up_to().map(u8::from).collect();
        assert_eq!(regs, [0, 1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn new_panics_out_of_range() {
        u4::new(0x10);
    }
}
