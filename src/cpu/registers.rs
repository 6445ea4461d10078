//! CPU register file.
//!
//! The machine has a program counter and three 8-bit accumulators:
//! - A: main accumulator, target of ADDA/SUBA
//! - X, Y: general purpose
//!
//! There is no flags register; branches test live register values.

use serde::{Serialize, Deserialize};

/// A general-purpose register, as named by a JMPZR selector byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    A,
    X,
    Y,
}

impl Register {
    pub const ALL: [Register; 3] = [Register::A, Register::X, Register::Y];

    /// Decode a selector byte (0 = A, 1 = X, 2 = Y).
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Register::A),
            1 => Some(Register::X),
            2 => Some(Register::Y),
            _ => None,
        }
    }

    /// Encode back to a selector byte.
    pub fn selector(self) -> u8 {
        match self {
            Register::A => 0,
            Register::X => 1,
            Register::Y => 2,
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
        };
        f.write_str(name)
    }
}

/// The register file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Address of the next opcode in program memory.
    pub pc: usize,
    pub a: u8,
    pub x: u8,
    pub y: u8,
}

impl Registers {
    /// Create a register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read a general-purpose register.
    pub fn get(&self, reg: Register) -> u8 {
        match reg {
            Register::A => self.a,
            Register::X => self.x,
            Register::Y => self.y,
        }
    }

    /// Move the program counter forward by `count` bytes.
    pub fn advance_pc(&mut self, count: usize) {
        self.pc += count;
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr as usize;
    }
}
