//! TUI debugger for the emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and machine state view
//! - Hex memory view of either bank
//! - Step/run/breakpoint controls
//! - Disassembly and recent trace views

mod app;
mod ui;

pub use app::{Bank, DebuggerApp, run_debugger};
