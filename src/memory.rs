use crate::{debug_log, CoreError, Result};
use std::fs;
use std::path::Path;

/// Flat word-addressed memory holding both code and data.
///
/// The size is fixed at construction by the loaded image; the machine never
/// grows it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    pub fn new(cells: Vec<u16>) -> Self {
        Self { cells }
    }

    /// Decode a little-endian program image. A trailing odd byte is dropped.
    pub fn from_image_bytes(blob: &[u8]) -> Self {
        let cells = blob
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self { cells }
    }

    pub fn load_image_file(path: &Path) -> Result<Self> {
        let blob = fs::read(path)?;
        if blob.len() < 2 {
            return Err(CoreError::InvalidImage(format!(
                "{} holds {} bytes, need at least one word",
                path.display(),
                blob.len()
            )));
        }
        let memory = Self::from_image_bytes(&blob);
        debug_log!(
            "image {} loaded: {} words{}",
            path.display(),
            memory.len(),
            if blob.len() % 2 == 1 { " (odd trailing byte dropped)" } else { "" }
        );
        Ok(memory)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn load(&self, address: u16) -> Option<u16> {
        self.cells.get(address as usize).copied()
    }

    pub fn store(&mut self, address: u16, value: u16) -> Option<()> {
        let slot = self.cells.get_mut(address as usize)?;
        *slot = value;
        Some(())
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.cells
    }

    /// Encode the current contents back into the little-endian image layout.
    pub fn to_image_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cells.len() * 2);
        for cell in &self.cells {
            out.extend_from_slice(&cell.to_le_bytes());
        }
        out
    }

    /// Replace every cell from an image of the same size.
    pub fn copy_from_image(&mut self, blob: &[u8]) -> Result<()> {
        if blob.len() != self.cells.len() * 2 {
            return Err(CoreError::InvalidSnapshot(format!(
                "memory image length mismatch (expected {} bytes, got {})",
                self.cells.len() * 2,
                blob.len()
            )));
        }
        for (cell, pair) in self.cells.iter_mut().zip(blob.chunks_exact(2)) {
            *cell = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(())
    }
}
