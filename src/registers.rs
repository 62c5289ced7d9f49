use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{REGISTER_COUNT, VALUE_MASK};

/// One of the eight general registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Register(u8);

impl Register {
    pub fn new(index: usize) -> Result<Self, RegisterError> {
        if index < REGISTER_COUNT {
            Ok(Register(index as u8))
        } else {
            Err(RegisterError::InvalidIndex(index))
        }
    }

    pub(crate) fn from_checked_index(index: u8) -> Self {
        debug_assert!((index as usize) < REGISTER_COUNT);
        Register(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = Register> {
        (0..REGISTER_COUNT as u8).map(Register)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl FromStr for Register {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let digits = lower
            .strip_prefix('r')
            .ok_or_else(|| RegisterError::UnknownRegister(s.into()))?;
        let index: usize = digits
            .parse()
            .map_err(|_| RegisterError::UnknownRegister(s.into()))?;
        Register::new(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("register index {0} out of range")]
    InvalidIndex(usize),
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
    #[error("value {0} does not fit in 15 bits")]
    ValueOutOfRange(u16),
}

/// The register bank. Stored values always stay inside the 15-bit space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    values: [u16; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Register) -> u16 {
        self.values[reg.index()]
    }

    /// Store `value` masked to 15 bits.
    pub fn set(&mut self, reg: Register, value: u16) {
        self.values[reg.index()] = value & VALUE_MASK;
    }

    pub fn values(&self) -> [u16; REGISTER_COUNT] {
        self.values
    }

    /// Build a bank from raw values, rejecting anything outside the 15-bit space.
    pub fn from_values(values: [u16; REGISTER_COUNT]) -> Result<Self, RegisterError> {
        if let Some(bad) = values.iter().find(|v| **v > VALUE_MASK) {
            return Err(RegisterError::ValueOutOfRange(*bad));
        }
        Ok(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registers_are_zeroed() {
        let regs = Registers::new();
        for reg in Register::all() {
            assert_eq!(regs.get(reg), 0);
        }
    }

    #[test]
    fn stored_values_are_masked_to_15_bits() {
        let mut regs = Registers::new();
        let r3 = Register::new(3).unwrap();
        regs.set(r3, 0xFFFF);
        assert_eq!(regs.get(r3), 0x7FFF);
    }

    #[test]
    fn from_values_rejects_wide_values() {
        let mut raw = [0u16; REGISTER_COUNT];
        raw[5] = 32768;
        assert_eq!(
            Registers::from_values(raw),
            Err(RegisterError::ValueOutOfRange(32768))
        );
        raw[5] = 32767;
        assert_eq!(Registers::from_values(raw).unwrap().values()[5], 32767);
    }

    #[test]
    fn register_name_parsing() {
        assert_eq!(Register::from_str("r0").unwrap(), Register::new(0).unwrap());
        assert_eq!(Register::from_str("R7").unwrap().index(), 7);
        assert!(Register::from_str("r8").is_err());
        assert!(Register::from_str("x1").is_err());
        assert_eq!(Register::new(2).unwrap().to_string(), "r2");
    }
}
