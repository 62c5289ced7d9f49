//! Suspend/resume of machine state.
//!
//! A plain snapshot holds registers, stack and program counter only; memory
//! written by `wmem` after the snapshot was taken is not rolled back on
//! restore. [`Vm::save_with_memory`] opts into capturing the memory image as
//! well. Snapshots persist as a zip archive holding `snapshot.json` and, when
//! memory was captured, `memory.bin` (little-endian words).

use crate::constants::REGISTER_COUNT;
use crate::memory::Memory;
use crate::registers::Registers;
use crate::stack::Stack;
use crate::vm::{RunState, Vm};
use crate::{debug_log, now_timestamp, CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SNAPSHOT_MAGIC: &str = "synacor.snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;

const METADATA_ENTRY: &str = "snapshot.json";
const MEMORY_ENTRY: &str = "memory.bin";
/// Every address a 16-bit pc can name.
const MAX_MEMORY_CELLS: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub registers: [u16; REGISTER_COUNT],
    /// Bottom-to-top.
    pub stack: Vec<u16>,
    pub pc: u16,
    pub instruction_count: u64,
    /// Present only for snapshots taken with [`Vm::save_with_memory`].
    pub memory: Option<Vec<u16>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub magic: String,
    pub version: u32,
    pub created: String,
    pub pc: u16,
    pub registers: [u16; REGISTER_COUNT],
    #[serde(default)]
    pub stack: Vec<u16>,
    #[serde(default)]
    pub instruction_count: u64,
    /// Word count of `memory.bin`, when present.
    #[serde(default)]
    pub memory_size: Option<usize>,
}

impl SnapshotMetadata {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC.to_string(),
            version: SNAPSHOT_VERSION,
            created: now_timestamp(),
            pc: snapshot.pc,
            registers: snapshot.registers,
            stack: snapshot.stack.clone(),
            instruction_count: snapshot.instruction_count,
            memory_size: snapshot.memory.as_ref().map(Vec::len),
        }
    }
}

impl Vm {
    /// Capture registers, stack and program counter.
    pub fn save(&self) -> Snapshot {
        Snapshot {
            registers: self.registers.values(),
            stack: self.stack.as_slice().to_vec(),
            pc: self.pc,
            instruction_count: self.instruction_count,
            memory: None,
        }
    }

    /// Capture everything [`Vm::save`] does plus the full memory image.
    pub fn save_with_memory(&self) -> Snapshot {
        Snapshot {
            memory: Some(self.memory.as_slice().to_vec()),
            ..self.save()
        }
    }

    /// Overwrite registers, stack and program counter (and memory, if the
    /// snapshot carries it). The snapshot is validated in full first; on error
    /// the machine is left untouched. A restored machine is back in the
    /// running state. Any pc is accepted: a program that halts on its last
    /// cell saves a pc one past the end, and a pc outside memory faults on the
    /// next fetch.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let registers = Registers::from_values(snapshot.registers)
            .map_err(|err| CoreError::InvalidSnapshot(err.to_string()))?;
        if let Some(memory) = &snapshot.memory {
            if memory.len() != self.memory.len() {
                return Err(CoreError::InvalidSnapshot(format!(
                    "memory size mismatch (machine has {} cells, snapshot {})",
                    self.memory.len(),
                    memory.len()
                )));
            }
        }

        self.registers = registers;
        self.stack = Stack::from(snapshot.stack.clone());
        self.pc = snapshot.pc;
        self.instruction_count = snapshot.instruction_count;
        if let Some(memory) = &snapshot.memory {
            self.memory = Memory::new(memory.clone());
        }
        self.state = RunState::Running;
        self.last_fault = None;
        Ok(())
    }
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(METADATA_ENTRY, options)?;
    let meta_bytes = serde_json::to_vec_pretty(&SnapshotMetadata::from_snapshot(snapshot))?;
    zip.write_all(&meta_bytes)?;

    if let Some(memory) = &snapshot.memory {
        zip.start_file(MEMORY_ENTRY, options)?;
        zip.write_all(&Memory::new(memory.clone()).to_image_bytes())?;
    }

    zip.finish()?;
    debug_log!(
        "snapshot saved to {} (pc {}, stack depth {}, memory {})",
        path.display(),
        snapshot.pc,
        snapshot.stack.len(),
        snapshot.memory.is_some()
    );
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let metadata = {
        let mut meta_buf = Vec::new();
        let mut meta_file = archive.by_name(METADATA_ENTRY).map_err(|e| {
            CoreError::InvalidSnapshot(format!("{METADATA_ENTRY} missing: {e}"))
        })?;
        meta_file.read_to_end(&mut meta_buf)?;
        let metadata: SnapshotMetadata = serde_json::from_slice(&meta_buf)?;
        metadata
    };
    if metadata.magic != SNAPSHOT_MAGIC || metadata.version != SNAPSHOT_VERSION {
        return Err(CoreError::InvalidSnapshot(
            "snapshot magic/version mismatch".to_string(),
        ));
    }

    let memory = match metadata.memory_size {
        Some(size) if size > MAX_MEMORY_CELLS => {
            return Err(CoreError::InvalidSnapshot(format!(
                "memory size {size} exceeds {MAX_MEMORY_CELLS} cells"
            )));
        }
        Some(size) => {
            let mut mem_buf = Vec::new();
            let mut mem_file = archive.by_name(MEMORY_ENTRY).map_err(|e| {
                CoreError::InvalidSnapshot(format!("{MEMORY_ENTRY} missing: {e}"))
            })?;
            mem_file.read_to_end(&mut mem_buf)?;
            let mut image = Memory::new(vec![0; size]);
            image.copy_from_image(&mem_buf)?;
            Some(image.as_slice().to_vec())
        }
        None => None,
    };

    debug_log!(
        "snapshot loaded from {} (created {}, pc {})",
        path.display(),
        metadata.created,
        metadata.pc
    );
    Ok(Snapshot {
        registers: metadata.registers,
        stack: metadata.stack,
        pc: metadata.pc,
        instruction_count: metadata.instruction_count,
        memory,
    })
}
