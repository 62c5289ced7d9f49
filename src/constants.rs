//! Architectural constants for the 15-bit register machine.

/// Literals occupy `0..MODULUS`; arithmetic wraps at this value.
pub const MODULUS: u16 = 32768;

/// Mask applied to every value stored in a register.
pub const VALUE_MASK: u16 = 0x7FFF;

/// Raw cell value that names register 0.
pub const REGISTER_BASE: u16 = MODULUS;

/// Number of general registers.
pub const REGISTER_COUNT: usize = 8;

/// First raw cell value that is neither a literal nor a register reference.
pub const INVALID_OPERAND_START: u16 = REGISTER_BASE + REGISTER_COUNT as u16;

/// Largest number of operand cells any opcode consumes.
pub const MAX_OPERANDS: usize = 3;
