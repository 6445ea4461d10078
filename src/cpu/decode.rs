//! Instruction decoder.
//!
//! An instruction is one opcode byte followed by a fixed number of operand
//! bytes taken from the program memory cells right after it. The operand
//! count is determined entirely by the opcode.

use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::Register;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Decoded instruction.
///
/// Each variant carries its operands in decoded form, so the executor
/// never touches program memory after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Stop execution.
    Halt,

    // ==================== Data Transfer ====================

    /// Move constant to data memory: D[addr] := constant
    Mvcd { constant: u8, addr: u8 },

    /// Move constant to A: A := constant
    Mvca { constant: u8 },

    /// Move constant to X: X := constant
    Mvcx { constant: u8 },

    /// Move constant to Y: Y := constant
    Mvcy { constant: u8 },

    // ==================== Control Flow ====================

    /// Jump if the immediate value is zero: if value = 0 then PC := addr
    Jmpz { value: u8, addr: u8 },

    /// Jump if a register is zero: if reg = 0 then PC := addr
    Jmpzr { reg: Register, addr: u8 },

    // ==================== Arithmetic ====================

    /// Add to A, wrapping: A := A + value
    Adda { value: u8 },

    /// Subtract from A, wrapping: A := A - value
    Suba { value: u8 },
}

/// Opcode byte values.
pub struct Opcode;

impl Opcode {
    pub const HALT: u8 = 0;
    pub const MVCD: u8 = 1;
    pub const MVCA: u8 = 2;
    pub const MVCX: u8 = 3;
    pub const MVCY: u8 = 4;
    pub const JMPZ: u8 = 5;
    pub const JMPZR: u8 = 6;
    pub const ADDA: u8 = 7;
    pub const SUBA: u8 = 8;
}

impl Instruction {
    /// The opcode byte of this instruction.
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Halt => Opcode::HALT,
            Instruction::Mvcd { .. } => Opcode::MVCD,
            Instruction::Mvca { .. } => Opcode::MVCA,
            Instruction::Mvcx { .. } => Opcode::MVCX,
            Instruction::Mvcy { .. } => Opcode::MVCY,
            Instruction::Jmpz { .. } => Opcode::JMPZ,
            Instruction::Jmpzr { .. } => Opcode::JMPZR,
            Instruction::Adda { .. } => Opcode::ADDA,
            Instruction::Suba { .. } => Opcode::SUBA,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Halt => "HALT",
            Instruction::Mvcd { .. } => "MVCD",
            Instruction::Mvca { .. } => "MVCA",
            Instruction::Mvcx { .. } => "MVCX",
            Instruction::Mvcy { .. } => "MVCY",
            Instruction::Jmpz { .. } => "JMPZ",
            Instruction::Jmpzr { .. } => "JMPZR",
            Instruction::Adda { .. } => "ADDA",
            Instruction::Suba { .. } => "SUBA",
        }
    }

    /// Operand bytes in encoding order.
    pub fn operands(&self) -> Vec<u8> {
        match *self {
            Instruction::Halt => vec![],
            Instruction::Mvcd { constant, addr } => vec![constant, addr],
            Instruction::Mvca { constant }
            | Instruction::Mvcx { constant }
            | Instruction::Mvcy { constant } => vec![constant],
            Instruction::Jmpz { value, addr } => vec![value, addr],
            Instruction::Jmpzr { reg, addr } => vec![reg.selector(), addr],
            Instruction::Adda { value } | Instruction::Suba { value } => vec![value],
        }
    }

    /// Encoded length in bytes, opcode included.
    pub fn width(&self) -> usize {
        1 + operand_count(self.opcode()).unwrap_or(0)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())?;
        match self {
            Instruction::Jmpzr { reg, addr } => write!(f, " {} {:02x}", reg, addr),
            _ => {
                for operand in self.operands() {
                    write!(f, " {:02x}", operand)?;
                }
                Ok(())
            }
        }
    }
}

/// Number of operand bytes that follow `opcode`, or `None` if the opcode
/// is not part of the instruction set.
pub fn operand_count(opcode: u8) -> Option<usize> {
    match opcode {
        Opcode::HALT => Some(0),
        Opcode::MVCA | Opcode::MVCX | Opcode::MVCY | Opcode::ADDA | Opcode::SUBA => Some(1),
        Opcode::MVCD | Opcode::JMPZ | Opcode::JMPZR => Some(2),
        _ => None,
    }
}

/// Decode the instruction starting at `pc` in program memory.
///
/// Unknown opcodes and out-of-set register selectors are decode faults.
/// Operands that would lie past the end of memory are reported as the
/// underlying memory fault.
pub fn decode(mem: &Memory, pc: usize) -> Result<Instruction, DecodeError> {
    let opcode = mem.read(pc)?;
    let operand = |n: usize| mem.read(pc + n);

    let instruction = match opcode {
        Opcode::HALT => Instruction::Halt,
        Opcode::MVCD => Instruction::Mvcd {
            constant: operand(1)?,
            addr: operand(2)?,
        },
        Opcode::MVCA => Instruction::Mvca { constant: operand(1)? },
        Opcode::MVCX => Instruction::Mvcx { constant: operand(1)? },
        Opcode::MVCY => Instruction::Mvcy { constant: operand(1)? },
        Opcode::JMPZ => Instruction::Jmpz {
            value: operand(1)?,
            addr: operand(2)?,
        },
        Opcode::JMPZR => {
            let selector = operand(1)?;
            let reg = Register::from_selector(selector)
                .ok_or(DecodeError::InvalidRegister { selector, pc })?;
            Instruction::Jmpzr { reg, addr: operand(2)? }
        }
        Opcode::ADDA => Instruction::Adda { value: operand(1)? },
        Opcode::SUBA => Instruction::Suba { value: operand(1)? },
        _ => return Err(DecodeError::UnknownOpcode { opcode, pc }),
    };

    Ok(instruction)
}

/// Encode an instruction to its byte sequence.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(instr.width());
    bytes.push(instr.opcode());
    bytes.extend(instr.operands());
    bytes
}

/// Encode a sequence of instructions into one program image.
pub fn assemble_image(instructions: &[Instruction]) -> Vec<u8> {
    instructions.iter().flat_map(encode).collect()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at {pc:#04x}")]
    UnknownOpcode { opcode: u8, pc: usize },

    #[error("invalid register selector {selector} at {pc:#04x}")]
    InvalidRegister { selector: u8, pc: usize },

    #[error("operand fetch failed: {0}")]
    Memory(#[from] MemoryError),
}
