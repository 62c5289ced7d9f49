//! Literal/register classification of raw cells.

use crate::constants::{INVALID_OPERAND_START, MODULUS, REGISTER_BASE};
use crate::fault::FaultKind;
use crate::registers::{Register, Registers};

/// A classified raw cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Literal(u16),
    Register(Register),
}

impl Operand {
    pub fn classify(raw: u16) -> Result<Self, FaultKind> {
        if raw < MODULUS {
            return Ok(Operand::Literal(raw));
        }
        if raw < INVALID_OPERAND_START {
            return Ok(Operand::Register(register_for(raw)));
        }
        Err(FaultKind::InvalidOperand { raw })
    }
}

/// Effective value of a source operand.
pub fn resolve(raw: u16, registers: &Registers) -> Result<u16, FaultKind> {
    match Operand::classify(raw)? {
        Operand::Literal(value) => Ok(value),
        Operand::Register(reg) => Ok(registers.get(reg)),
    }
}

/// Register index named by a destination operand. Literals are rejected.
pub fn as_register_index(raw: u16) -> Result<u16, FaultKind> {
    if (REGISTER_BASE..INVALID_OPERAND_START).contains(&raw) {
        Ok(raw - REGISTER_BASE)
    } else {
        Err(FaultKind::InvalidDestination { raw })
    }
}

/// Typed form of [`as_register_index`].
pub fn destination(raw: u16) -> Result<Register, FaultKind> {
    as_register_index(raw).map(|_| register_for(raw))
}

fn register_for(raw: u16) -> Register {
    // Callers have checked the range, so the index is always < REGISTER_COUNT.
    Register::from_checked_index((raw - REGISTER_BASE) as u8)
}
