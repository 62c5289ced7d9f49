//! Per-instruction debug trace.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::constants::REGISTER_COUNT;
use crate::opcode::Opcode;
use crate::{debug_log, Result};

/// Machine state at a decoded instruction, before its effect is applied.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord<'a> {
    pub step: u64,
    pub pc: u16,
    pub opcode: Opcode,
    pub mnemonic: &'static str,
    /// Raw operand cells.
    pub operands: &'a [u16],
    pub registers: [u16; REGISTER_COUNT],
    pub stack_depth: usize,
}

pub trait StepObserver {
    fn on_step(&mut self, record: &StepRecord<'_>);
}

/// Writes one JSON object per executed instruction.
pub struct TraceWriter<W: Write> {
    writer: W,
    records: u64,
    error: Option<io::Error>,
}

impl TraceWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        debug_log!("trace enabled: {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records: 0,
            error: None,
        }
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flush buffered records and surface the first write error, if any.
    pub fn finish(mut self) -> Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err.into());
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_record(&mut self, record: &StepRecord<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> StepObserver for TraceWriter<W> {
    fn on_step(&mut self, record: &StepRecord<'_>) {
        if self.error.is_some() {
            return;
        }
        match self.write_record(record) {
            Ok(()) => self.records += 1,
            Err(err) => self.error = Some(err),
        }
    }
}
