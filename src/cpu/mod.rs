//! CPU emulation for the tiny computer.
//!
//! This module implements the complete machine:
//! - two independent byte-addressable banks (program and data)
//! - a program counter and three 8-bit registers: A, X, Y
//! - a nine-instruction set with fixed-width operands

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError, MemoryRow, Allocation};
pub use registers::{Register, Registers};
pub use decode::{Instruction, Opcode, DecodeError, decode, encode, assemble_image};
pub use execute::{Machine, MachineState, CpuError};
