//! Byte-addressable memory banks.
//!
//! The machine owns two independent banks of identical shape: program
//! memory (the instruction stream) and data memory (scratch storage for
//! `MVCD`). Memory is pure storage and never interprets its contents.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Default capacity of each memory bank, in bytes.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Number of bytes per row in a memory dump.
pub const DUMP_ROW_WIDTH: usize = 16;

/// A fixed-size, zero-initialized byte array.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a zeroed memory bank with `size` cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    /// Capacity in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Read the byte at `addr`.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange { addr, size: self.size() })
    }

    /// Write `value` to `addr`.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let size = self.size();
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange { addr, size })?;
        *cell = value;
        Ok(())
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program image to address 0.
    ///
    /// Cells past the end of the image are zeroed, so a short image is
    /// followed by implicit HALT opcodes.
    pub fn load(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        if image.len() > self.size() {
            return Err(MemoryError::ProgramTooLarge {
                size: image.len(),
                available: self.size(),
            });
        }

        self.clear();
        self.cells[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Raw view of the bank.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Snapshot the bank as rows of [`DUMP_ROW_WIDTH`] bytes.
    pub fn dump(&self) -> Vec<MemoryRow> {
        self.cells
            .chunks(DUMP_ROW_WIDTH)
            .enumerate()
            .map(|(i, chunk)| MemoryRow {
                base: i * DUMP_ROW_WIDTH,
                bytes: chunk.to_vec(),
            })
            .collect()
    }

    /// Count the cells holding a non-zero byte.
    ///
    /// This is a heuristic: a cell that was deliberately written with zero
    /// is indistinguishable from one that was never touched, so it is
    /// reported as unallocated.
    pub fn allocation(&self) -> Allocation {
        Allocation {
            used: self.cells.iter().filter(|&&b| b != 0).count(),
            capacity: self.size(),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let allocation = self.allocation();
        f.debug_struct("Memory")
            .field("non_zero_cells", &allocation.used)
            .field("total_cells", &allocation.capacity)
            .finish()
    }
}

/// One row of a memory dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRow {
    /// Address of the first byte in the row.
    pub base: usize,
    pub bytes: Vec<u8>,
}

impl std::fmt::Display for MemoryRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}:", self.base)?;
        for byte in &self.bytes {
            write!(f, " {:02x}", byte)?;
        }
        Ok(())
    }
}

/// Non-zero cell count of a memory bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub used: usize,
    pub capacity: usize,
}

impl Allocation {
    /// Share of non-zero cells, in percent.
    pub fn percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used as f64 / self.capacity as f64 * 100.0
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {addr:#04x} out of range (size {size})")]
    AddressOutOfRange { addr: usize, size: usize },

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
