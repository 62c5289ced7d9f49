//! Core of the Synacor 15-bit register machine.
//!
//! The crate is built around [`Vm`]: an owned machine holding memory, eight
//! registers, a stack and a program counter, driven one instruction at a
//! time by the fetch/decode/execute loop in [`vm`]. Console I/O, program image
//! loading, debug traces and snapshot persistence are thin collaborators
//! around that loop.

use once_cell::sync::Lazy;
use std::env;
use std::time::SystemTime;
use thiserror::Error;

static DEBUG_ENABLED: Lazy<bool> = Lazy::new(|| env::var_os("SYNACOR_DEBUG").is_some());

/// True when `SYNACOR_DEBUG` is set.
pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED
}

pub mod config;
pub mod console;
pub mod constants;
pub mod disasm;
pub mod fault;
pub mod memory;
pub mod opcode;
pub mod operand;
pub mod registers;
pub mod snapshot;
pub mod stack;
pub mod trace;
pub mod vm;

macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::debug_enabled() {
            eprintln!("[synacor-debug] {}", format_args!($($arg)*));
        }
    };
}
pub(crate) use debug_log;

pub use config::{InputMode, RunConfig};
pub use console::{
    code_point_to_char, BufferOutput, CharInput, CharOutput, NoInput, PollingStdin, QueuedInput,
    ReaderInput, ScriptedInput, WriterOutput,
};
pub use constants::{MODULUS, REGISTER_BASE, REGISTER_COUNT, VALUE_MASK};
pub use disasm::{disassemble, disassemble_range, Instruction};
pub use fault::{Fault, FaultKind, Outcome};
pub use memory::Memory;
pub use opcode::{Opcode, OperandKind, OPCODES};
pub use operand::{as_register_index, resolve, Operand};
pub use registers::{Register, RegisterError, Registers};
pub use snapshot::{
    load_snapshot, save_snapshot, Snapshot, SnapshotMetadata, SNAPSHOT_MAGIC, SNAPSHOT_VERSION,
};
pub use stack::Stack;
pub use trace::{StepObserver, StepRecord, TraceWriter};
pub use vm::{RunState, Vm};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("snapshot error: {0}")]
    InvalidSnapshot(String),
    #[error("program image error: {0}")]
    InvalidImage(String),
    #[error("config error: {0}")]
    Config(String),
}

pub fn now_timestamp() -> String {
    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => format!("{}Z", duration.as_secs()),
        Err(_) => "0Z".to_string(),
    }
}
