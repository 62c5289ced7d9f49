//! Text rendering of instructions, for fault reports and the `--disasm` dump.

use std::fmt;

use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::operand::Operand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: u16,
    /// `None` when the cell is not a valid opcode (usually data).
    pub opcode: Option<Opcode>,
    /// Opcode cell followed by whatever operand cells exist in memory.
    pub cells: Vec<u16>,
}

impl Instruction {
    /// Cells covered, at least one.
    pub fn len(&self) -> u16 {
        self.cells.len().max(1) as u16
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn next_address(&self) -> Option<u16> {
        self.address.checked_add(self.len())
    }
}

fn render_operand(f: &mut fmt::Formatter<'_>, opcode: Opcode, raw: u16) -> fmt::Result {
    match Operand::classify(raw) {
        Ok(Operand::Register(reg)) => write!(f, " {reg}"),
        Ok(Operand::Literal(value)) if opcode == Opcode::Out => {
            match char::from_u32(value as u32) {
                Some(ch) if ch.is_ascii_graphic() || ch == ' ' => write!(f, " '{ch}'"),
                Some('\n') => write!(f, " '\\n'"),
                _ => write!(f, " {value}"),
            }
        }
        Ok(Operand::Literal(value)) => write!(f, " {value}"),
        Err(_) => write!(f, " <invalid {raw}>"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:5}: ", self.address)?;
        let Some(opcode) = self.opcode else {
            return write!(f, "data {}", self.cells.first().copied().unwrap_or(0));
        };
        f.write_str(opcode.mnemonic())?;
        for raw in self.cells.iter().skip(1) {
            render_operand(f, opcode, *raw)?;
        }
        let expected = opcode.length() as usize;
        if self.cells.len() < expected {
            write!(f, " <truncated>")?;
        }
        Ok(())
    }
}

/// Decode the instruction at `address`, or `None` past the end of memory.
pub fn disassemble(memory: &Memory, address: u16) -> Option<Instruction> {
    let first = memory.load(address)?;
    let opcode = Opcode::decode(first);
    let mut cells = vec![first];
    if let Some(op) = opcode {
        for offset in 1..op.length() {
            let Some(cell) = address.checked_add(offset).and_then(|a| memory.load(a)) else {
                break;
            };
            cells.push(cell);
        }
    }
    Some(Instruction {
        address,
        opcode,
        cells,
    })
}

/// Up to `count` consecutive instructions starting at `start`.
pub fn disassemble_range(memory: &Memory, start: u16, count: usize) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(count);
    let mut address = Some(start);
    while out.len() < count {
        let Some(instr) = address.and_then(|a| disassemble(memory, a)) else {
            break;
        };
        address = instr.next_address();
        out.push(instr);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registers_literals_and_characters() {
        let memory = Memory::new(vec![9, 32768, 32769, 4, 19, 72, 19, 10, 0]);
        let lines: Vec<String> = disassemble_range(&memory, 0, 10)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec![
                "    0: add r0 r1 4",
                "    4: out 'H'",
                "    6: out '\\n'",
                "    8: halt",
            ]
        );
    }

    #[test]
    fn unknown_cells_render_as_data() {
        let memory = Memory::new(vec![500, 32800]);
        let instr = disassemble(&memory, 0).unwrap();
        assert_eq!(instr.opcode, None);
        assert_eq!(instr.len(), 1);
        assert_eq!(instr.to_string(), "    0: data 500");
        assert!(disassemble(&memory, 2).is_none());
    }

    #[test]
    fn truncated_and_invalid_operands_are_marked() {
        let memory = Memory::new(vec![1, 40000]);
        let instr = disassemble(&memory, 0).unwrap();
        assert_eq!(instr.to_string(), "    0: set <invalid 40000> <truncated>");
    }
}
