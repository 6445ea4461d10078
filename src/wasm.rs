//! WebAssembly bindings for the emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core machine.

use wasm_bindgen::prelude::*;
use crate::{CpuError, Machine, MachineConfig};
use crate::disasm::listing;
use crate::programs::{builtin, parse_image};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a machine with default 256-byte banks.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            machine: Machine::new(),
            program: Vec::new(),
        }
    }

    /// Create a machine with custom bank sizes.
    #[wasm_bindgen]
    pub fn with_sizes(program_size: usize, data_size: usize) -> Result<WasmMachine, JsError> {
        let machine = Machine::with_config(MachineConfig { program_size, data_size })
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self { machine, program: Vec::new() })
    }

    /// Load a raw program image. Returns its length.
    #[wasm_bindgen]
    pub fn load_image(&mut self, image: &[u8]) -> Result<usize, JsError> {
        self.machine.reset();
        self.machine.load_program(image)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.program = image.to_vec();
        Ok(image.len())
    }

    /// Load a program written as hex bytes, e.g. `"02 10 00"`.
    #[wasm_bindgen]
    pub fn load_hex(&mut self, text: &str) -> Result<usize, JsError> {
        let image = parse_image(text).map_err(|e| JsError::new(&e.to_string()))?;
        self.load_image(&image)
    }

    /// Load one of the built-in programs by name.
    #[wasm_bindgen]
    pub fn load_builtin(&mut self, name: &str) -> Result<usize, JsError> {
        let program = builtin(name).map_err(|e| JsError::new(&e.to_string()))?;
        self.load_image(program.image)
    }

    /// Step one instruction. Returns the trace line.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let record = self.machine.step()
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(record.to_string())
    }

    /// Step one instruction. Returns the trace record as JSON.
    #[wasm_bindgen]
    pub fn step_json(&mut self) -> Result<String, JsError> {
        let record = self.machine.step()
            .map_err(|e| JsError::new(&e.to_string()))?;
        serde_json::to_string(&record).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Run until halt, fault or max cycles. Returns total cycles.
    ///
    /// A fault is thrown as an error rather than reported as a cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.run_cycles(max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Reset the machine with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.machine.reset();
        let _ = self.machine.load_program(&self.program);
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    #[wasm_bindgen]
    pub fn is_faulted(&self) -> bool {
        self.machine.is_faulted()
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.machine.regs.pc
    }

    #[wasm_bindgen]
    pub fn a(&self) -> u8 {
        self.machine.regs.a
    }

    #[wasm_bindgen]
    pub fn x(&self) -> u8 {
        self.machine.regs.x
    }

    #[wasm_bindgen]
    pub fn y(&self) -> u8 {
        self.machine.regs.y
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.machine.state)
    }

    /// Copy of program memory.
    #[wasm_bindgen]
    pub fn program_memory(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.machine.program.as_slice())
    }

    /// Copy of data memory.
    #[wasm_bindgen]
    pub fn data_memory(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.machine.data.as_slice())
    }

    /// Disassembly listing of program memory.
    #[wasm_bindgen]
    pub fn disassembly(&self) -> String {
        listing(&self.machine.program)
    }

    /// Get registers and state as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> String {
        serde_json::json!({
            "pc": self.machine.regs.pc,
            "a": self.machine.regs.a,
            "x": self.machine.regs.x,
            "y": self.machine.regs.y,
            "state": self.machine.state,
            "cycles": self.machine.cycles,
        })
        .to_string()
    }
}

impl WasmMachine {
    fn run_cycles(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        self.machine.run_limited(max_cycles, crate::trace::NullTrace)?;
        Ok(self.machine.cycles)
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Disassemble a raw program image.
#[wasm_bindgen]
pub fn wasm_disassemble(image: &[u8]) -> Result<String, JsError> {
    let mut machine = Machine::new();
    machine.load_program(image)
        .map_err(|e| JsError::new(&e.to_string()))?;
    Ok(listing(&machine.program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_reports_fault() {
        let mut machine = WasmMachine::new();
        assert!(machine.load_image(&[0x09]).is_ok());

        assert!(matches!(machine.run_cycles(10), Err(CpuError::Decode(_))));
        assert!(machine.is_faulted());
    }

    #[test]
    fn test_run_counts_clean_halt() {
        let mut machine = WasmMachine::new();
        assert!(machine.load_image(&[2, 5, 0]).is_ok());

        assert_eq!(machine.run_cycles(10).unwrap(), 2);
        assert!(machine.is_halted());
        assert_eq!(machine.a(), 5);
    }
}
