//! # TCE Emulator
//!
//! A tiny 8-bit computer with separate program and data memory.
//!
//! The machine fetches an opcode at the program counter, reads its fixed
//! operand bytes, executes it and moves on, until it meets a HALT opcode
//! or runs off the end of program memory. Every executed instruction
//! produces a [`TraceRecord`] that callers can render however they like.

pub mod config;
pub mod cpu;
pub mod disasm;
pub mod programs;
pub mod status;
pub mod trace;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use config::{MachineConfig, ConfigError};
pub use cpu::{Machine, MachineState, CpuError, Memory, MemoryError, Registers, Register, Instruction};
pub use programs::{Program, ProgramError, builtin, parse_image};
pub use trace::{TraceRecord, TraceSink, TextTrace, JsonTrace, Throttled};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
