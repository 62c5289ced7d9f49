//! Fatal execution faults and the outcome reported by the execution engine.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Every way an instruction can abort the running program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultKind {
    #[error("invalid operand {raw} (not a literal or register reference)")]
    InvalidOperand { raw: u16 },
    #[error("invalid destination {raw} (must name a register)")]
    InvalidDestination { raw: u16 },
    #[error("unknown opcode {opcode}")]
    UnknownOpcode { opcode: u16 },
    #[error("stack underflow")]
    StackUnderflow,
    #[error("divide by zero")]
    DivideByZero,
    #[error("memory access at {address} outside {len} cells")]
    OutOfBoundsMemoryAccess { address: u32, len: usize },
}

/// A fault together with the machine context at the faulting instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} at pc {pc} ({})", describe_cells(.opcode, .operands))]
pub struct Fault {
    pub kind: FaultKind,
    /// Address the opcode was fetched from.
    pub pc: u16,
    /// Raw opcode cell; `None` when the fetch itself failed.
    pub opcode: Option<u16>,
    /// Raw operand cells decoded before the fault.
    pub operands: Vec<u16>,
}

fn describe_cells(opcode: &Option<u16>, operands: &[u16]) -> String {
    match opcode {
        Some(opcode) => format!("opcode {opcode}, operands {operands:?}"),
        None => "opcode not fetched".to_string(),
    }
}

/// How a call to `run`/`run_for`/`step` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The instruction budget ran out; the machine can be resumed.
    Paused,
    /// `halt` executed.
    Halted,
    /// A fault terminated the program.
    Faulted(Fault),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Paused)
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Faulted(fault) => Some(fault),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Paused => write!(f, "paused"),
            Outcome::Halted => write!(f, "halted"),
            Outcome::Faulted(fault) => write!(f, "faulted: {fault}"),
        }
    }
}
