//! Opcode table and lookup for the fixed instruction set.

use std::fmt;

use serde::Serialize;

/// How an operand cell is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Must literally name a register; written by the instruction.
    Dest,
    /// Literal or register reference; read by the instruction.
    Src,
}

use OperandKind::{Dest, Src};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum Opcode {
    Halt = 0,
    Set,
    Push,
    Pop,
    Eq,
    Gt,
    Jmp,
    Jt,
    Jf,
    Add,
    Mult,
    Mod,
    And,
    Or,
    Not,
    Rmem,
    Wmem,
    Call,
    Ret,
    Out,
    In,
    Noop,
}

/// Static description of one opcode.
#[derive(Debug)]
pub struct OpcodeMetadata {
    pub opcode: Opcode,
    pub mnemonic: &'static str,
    pub operands: &'static [OperandKind],
}

/// Indexed by opcode value.
pub static OPCODES: [OpcodeMetadata; 22] = [
    entry(Opcode::Halt, "halt", &[]),
    entry(Opcode::Set, "set", &[Dest, Src]),
    entry(Opcode::Push, "push", &[Src]),
    entry(Opcode::Pop, "pop", &[Dest]),
    entry(Opcode::Eq, "eq", &[Dest, Src, Src]),
    entry(Opcode::Gt, "gt", &[Dest, Src, Src]),
    entry(Opcode::Jmp, "jmp", &[Src]),
    entry(Opcode::Jt, "jt", &[Src, Src]),
    entry(Opcode::Jf, "jf", &[Src, Src]),
    entry(Opcode::Add, "add", &[Dest, Src, Src]),
    entry(Opcode::Mult, "mult", &[Dest, Src, Src]),
    entry(Opcode::Mod, "mod", &[Dest, Src, Src]),
    entry(Opcode::And, "and", &[Dest, Src, Src]),
    entry(Opcode::Or, "or", &[Dest, Src, Src]),
    entry(Opcode::Not, "not", &[Dest, Src]),
    entry(Opcode::Rmem, "rmem", &[Dest, Src]),
    entry(Opcode::Wmem, "wmem", &[Src, Src]),
    entry(Opcode::Call, "call", &[Src]),
    entry(Opcode::Ret, "ret", &[]),
    entry(Opcode::Out, "out", &[Src]),
    entry(Opcode::In, "in", &[Dest]),
    entry(Opcode::Noop, "noop", &[]),
];

const fn entry(
    opcode: Opcode,
    mnemonic: &'static str,
    operands: &'static [OperandKind],
) -> OpcodeMetadata {
    OpcodeMetadata {
        opcode,
        mnemonic,
        operands,
    }
}

impl Opcode {
    /// Returns `None` for values outside the instruction set.
    pub fn decode(raw: u16) -> Option<Self> {
        OPCODES.get(raw as usize).map(|meta| meta.opcode)
    }

    pub fn metadata(self) -> &'static OpcodeMetadata {
        &OPCODES[self as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        self.metadata().mnemonic
    }

    pub fn operand_kinds(self) -> &'static [OperandKind] {
        self.metadata().operands
    }

    /// Encoded length in cells, opcode included.
    pub fn length(self) -> u16 {
        1 + self.operand_kinds().len() as u16
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

pub fn all_opcodes() -> impl Iterator<Item = &'static OpcodeMetadata> {
    OPCODES.iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_opcode_value() {
        for (index, meta) in all_opcodes().enumerate() {
            assert_eq!(meta.opcode as usize, index, "{}", meta.mnemonic);
        }
    }

    #[test]
    fn decode_known_opcodes() {
        assert_eq!(Opcode::decode(0), Some(Opcode::Halt));
        assert_eq!(Opcode::decode(9), Some(Opcode::Add));
        assert_eq!(Opcode::decode(21), Some(Opcode::Noop));
        assert_eq!(Opcode::decode(22), None);
        assert_eq!(Opcode::decode(u16::MAX), None);
    }

    #[test]
    fn lengths_follow_operand_counts() {
        assert_eq!(Opcode::Halt.length(), 1);
        assert_eq!(Opcode::Set.length(), 3);
        assert_eq!(Opcode::Gt.length(), 4);
        assert_eq!(Opcode::Wmem.operand_kinds(), &[Src, Src]);
        assert_eq!(Opcode::In.operand_kinds(), &[Dest]);
    }
}
