//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::config::{ConfigError, MachineConfig};
use crate::cpu::decode::{self, DecodeError, Instruction};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::Registers;
use crate::trace::{NullTrace, TraceRecord, TraceSink};
use log::{debug, info, warn};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Fetching and executing instructions.
    Running,
    /// Reached a HALT opcode or the end of program memory.
    Halted,
    /// Stopped by a memory or decode fault.
    Faulted,
}

/// The machine: register file plus separate program and data memory.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    pub regs: Registers,
    /// Instruction stream.
    pub program: Memory,
    /// Scratch memory written by `MVCD`.
    pub data: Memory,
    pub state: MachineState,
    /// Trace records produced so far, the final HALT included.
    pub cycles: u64,
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine with two 256-byte banks.
    pub fn new() -> Self {
        Self::build(MachineConfig::default())
    }

    /// Create a machine with custom bank sizes.
    pub fn with_config(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a default machine and load `image` into program memory.
    pub fn with_program(image: &[u8]) -> Result<Self, MemoryError> {
        let mut machine = Self::new();
        machine.load_program(image)?;
        Ok(machine)
    }

    fn build(config: MachineConfig) -> Self {
        Self {
            regs: Registers::new(),
            program: Memory::new(config.program_size),
            data: Memory::new(config.data_size),
            state: MachineState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset registers, data memory and state. Program memory is kept.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.data.clear();
        self.state = MachineState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program image at address 0 of program memory.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        self.program.load(image)?;
        debug!("loaded {} byte program image", image.len());
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the trace record of the instruction. Reaching the end of
    /// program memory or a HALT opcode yields a HALT record and leaves the
    /// machine [`MachineState::Halted`]; any fault leaves it
    /// [`MachineState::Faulted`].
    pub fn step(&mut self) -> Result<TraceRecord, CpuError> {
        if self.state != MachineState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.regs.pc;
        match self.fetch_and_execute(pc) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                debug!("{:02x}: {}", pc, instr);
                if self.state == MachineState::Halted {
                    info!("halted at {:#04x} after {} cycles", pc, self.cycles);
                }
                Ok(TraceRecord::new(self.regs.pc, &instr))
            }
            Err(e) => {
                self.state = MachineState::Faulted;
                warn!("fault at {:#04x}: {}", pc, e);
                Err(e)
            }
        }
    }

    fn fetch_and_execute(&mut self, pc: usize) -> Result<Instruction, CpuError> {
        // The last cell of program memory is never fetched.
        let instr = if pc + 1 >= self.program.size() {
            Instruction::Halt
        } else {
            decode::decode(&self.program, pc)?
        };

        self.execute(instr)?;
        Ok(instr)
    }

    /// Run until halt or fault.
    ///
    /// Returns the number of trace records produced.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        self.run_with(NullTrace)
    }

    /// Run until halt or fault, forwarding every record to `sink`.
    pub fn run_with<S: TraceSink>(&mut self, mut sink: S) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == MachineState::Running {
            let record = self.step()?;
            sink.record(&record)
                .map_err(|e| CpuError::Trace(e.to_string()))?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<S: TraceSink>(&mut self, max_cycles: u64, mut sink: S) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == MachineState::Running && self.cycles < limit {
            let record = self.step()?;
            sink.record(&record)
                .map_err(|e| CpuError::Trace(e.to_string()))?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    ///
    /// Every handler moves the PC exactly once: past its operands, or to
    /// the jump target. HALT leaves it on the HALT opcode.
    fn execute(&mut self, instr: Instruction) -> Result<(), CpuError> {
        let width = instr.width();

        match instr {
            Instruction::Halt => {
                self.state = MachineState::Halted;
            }

            // ==================== Data Transfer ====================

            Instruction::Mvcd { constant, addr } => {
                self.data.write(addr as usize, constant)?;
                self.regs.advance_pc(width);
            }

            Instruction::Mvca { constant } => {
                self.regs.a = constant;
                self.regs.advance_pc(width);
            }

            Instruction::Mvcx { constant } => {
                self.regs.x = constant;
                self.regs.advance_pc(width);
            }

            Instruction::Mvcy { constant } => {
                self.regs.y = constant;
                self.regs.advance_pc(width);
            }

            // ==================== Control Flow ====================

            Instruction::Jmpz { value, addr } => {
                if value == 0 {
                    self.regs.jump(addr);
                } else {
                    self.regs.advance_pc(width);
                }
            }

            Instruction::Jmpzr { reg, addr } => {
                if self.regs.get(reg) == 0 {
                    self.regs.jump(addr);
                } else {
                    self.regs.advance_pc(width);
                }
            }

            // ==================== Arithmetic ====================

            Instruction::Adda { value } => {
                self.regs.a = self.regs.a.wrapping_add(value);
                self.regs.advance_pc(width);
            }

            Instruction::Suba { value } => {
                self.regs.a = self.regs.a.wrapping_sub(value);
                self.regs.advance_pc(width);
            }
        }

        Ok(())
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// Check if the machine is running.
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    pub fn is_faulted(&self) -> bool {
        self.state == MachineState::Faulted
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("machine not running: {0:?}")]
    NotRunning(MachineState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("trace output failed: {0}")]
    Trace(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::assemble_image;
    use crate::cpu::registers::Register;

    fn run_image(image: &[u8]) -> (Machine, Vec<TraceRecord>) {
        let mut machine = Machine::with_program(image).unwrap();
        let mut trace: Vec<TraceRecord> = Vec::new();
        machine.run_limited(1_000, &mut trace).unwrap();
        (machine, trace)
    }

    #[test]
    fn test_halt_only() {
        let (machine, trace) = run_image(&[0]);

        assert_eq!(trace.len(), 1);
        assert!(trace[0].is_halt());
        assert_eq!(trace[0].pc_after, 0);
        assert!(machine.is_halted());
        assert_eq!(machine.regs, Registers::default());
    }

    #[test]
    fn test_mvca() {
        let (machine, trace) = run_image(&[2, 0x10, 0]);

        assert_eq!(machine.regs.a, 0x10);
        assert_eq!(machine.regs.pc, 2);
        assert_eq!(machine.state, MachineState::Halted);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].pc_after, 2);
        assert_eq!(trace[0].mnemonic, "MVCA");
        assert_eq!(trace[0].operands, vec![0x10]);
    }

    #[test]
    fn test_mvcx_mvcy() {
        let (machine, _) = run_image(&[3, 0x11, 4, 0x22, 0]);
        assert_eq!(machine.regs.x, 0x11);
        assert_eq!(machine.regs.y, 0x22);
        assert_eq!(machine.regs.a, 0);
        assert_eq!(machine.regs.pc, 4);
    }

    #[test]
    fn test_mvcd() {
        let (machine, trace) = run_image(&[1, 0x2a, 0x80, 0]);
        assert_eq!(machine.data.read(0x80), Ok(0x2a));
        assert_eq!(machine.data.allocation().used, 1);
        assert_eq!(trace[0].pc_after, 3);
        // Program memory is untouched by data writes.
        assert_eq!(machine.program.read(0x80), Ok(0));
    }

    #[test]
    fn test_suba() {
        let (machine, _) = run_image(&[2, 0x05, 8, 0x01, 0]);
        assert_eq!(machine.regs.a, 0x04);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let (machine, _) = run_image(&[8, 0x01, 0]);
        assert_eq!(machine.regs.a, 0xff);

        let (machine, _) = run_image(&[2, 0xf0, 7, 0x20, 0]);
        assert_eq!(machine.regs.a, 0x10);
    }

    #[test]
    fn test_jmpz() {
        // Zero value jumps over the MVCA.
        let (machine, trace) = run_image(&[5, 0, 5, 2, 0x33, 0]);
        assert_eq!(machine.regs.a, 0);
        assert_eq!(trace[0].pc_after, 5);

        // Non-zero value falls through.
        let (machine, trace) = run_image(&[5, 1, 5, 2, 0x33, 0]);
        assert_eq!(machine.regs.a, 0x33);
        assert_eq!(trace[0].pc_after, 3);
    }

    #[test]
    fn test_jmpzr_selects_register() {
        // X is zero, A is not: only the X test jumps.
        let program = assemble_image(&[
            Instruction::Mvca { constant: 1 },
            Instruction::Jmpzr { reg: Register::A, addr: 0x20 },
            Instruction::Jmpzr { reg: Register::X, addr: 0x30 },
        ]);
        let (machine, trace) = run_image(&program);

        assert_eq!(trace[1].pc_after, 5);
        assert_eq!(trace[2].pc_after, 0x30);
        assert_eq!(machine.regs.pc, 0x30);
        assert!(machine.is_halted());
    }

    #[test]
    fn test_jmpzr_literal_loop_terminates() {
        // MVCA 2; SUBA 1; JMPZR A,0. A is 1 when tested, so execution
        // falls through to the zero cell at 7 and halts.
        let mut machine = Machine::with_program(&[2, 0x02, 8, 0x01, 6, 0, 0, 0]).unwrap();
        let executed = machine.run_limited(16, NullTrace).unwrap();

        assert!(machine.is_halted());
        assert_eq!(executed, 4);
        assert_eq!(machine.regs.a, 1);
        assert_eq!(machine.regs.pc, 7);
    }

    #[test]
    fn test_countdown_loop_reaches_zero() {
        // MVCA 2; loop: SUBA 1; JMPZR A,done; JMPZ 0,loop; done: HALT
        let program = [2, 2, 8, 1, 6, 0, 10, 5, 0, 2, 0];
        let mut machine = Machine::with_program(&program).unwrap();
        let mut trace: Vec<TraceRecord> = Vec::new();
        machine.run_limited(32, &mut trace).unwrap();

        assert!(machine.is_halted());
        assert_eq!(machine.regs.a, 0);
        assert_eq!(trace.iter().filter(|r| r.mnemonic == "SUBA").count(), 2);
        assert_eq!(trace.len(), 7);
    }

    #[test]
    fn test_infinite_loop_is_bounded_by_caller() {
        // JMPZR A,0 with A = 0 jumps to itself forever.
        let mut machine = Machine::with_program(&[6, 0, 0]).unwrap();
        let executed = machine.run_limited(100, NullTrace).unwrap();

        assert_eq!(executed, 100);
        assert!(machine.is_running());
        assert_eq!(machine.regs.pc, 0);
    }

    #[test]
    fn test_implicit_halt_after_program() {
        let (machine, trace) = run_image(&[2, 7, 3, 8]);

        assert!(machine.is_halted());
        assert_eq!(machine.regs.pc, 4);
        assert!(trace.last().unwrap().is_halt());
        assert!(machine.program.as_slice()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_halts_at_end_of_program_memory() {
        let config = MachineConfig { program_size: 3, data_size: 16 };
        let mut machine = Machine::with_config(config).unwrap();
        machine.load_program(&[7, 1, 7]).unwrap();

        let mut trace: Vec<TraceRecord> = Vec::new();
        machine.run_with(&mut trace).unwrap();

        // The ADDA sitting in the last cell is never executed.
        assert_eq!(machine.regs.a, 1);
        assert_eq!(machine.regs.pc, 2);
        assert_eq!(trace.len(), 2);
        assert!(trace[1].is_halt());
    }

    #[test]
    fn test_jump_past_program_memory_halts() {
        let config = MachineConfig { program_size: 8, data_size: 8 };
        let mut machine = Machine::with_config(config).unwrap();
        machine.load_program(&[5, 0, 200]).unwrap();

        assert_eq!(machine.run().unwrap(), 2);
        assert!(machine.is_halted());
        assert_eq!(machine.regs.pc, 200);
    }

    #[test]
    fn test_unknown_opcode_faults() {
        let mut machine = Machine::with_program(&[2, 1, 0x09, 0]).unwrap();
        let err = machine.run().unwrap_err();

        assert_eq!(
            err,
            CpuError::Decode(DecodeError::UnknownOpcode { opcode: 9, pc: 2 })
        );
        assert!(machine.is_faulted());
        assert_eq!(machine.regs.a, 1);
    }

    #[test]
    fn test_invalid_register_faults() {
        let mut machine = Machine::with_program(&[6, 3, 0]).unwrap();
        assert!(matches!(
            machine.run(),
            Err(CpuError::Decode(DecodeError::InvalidRegister { selector: 3, .. }))
        ));
        assert!(machine.is_faulted());
    }

    #[test]
    fn test_data_write_out_of_range_faults() {
        let config = MachineConfig { program_size: 256, data_size: 16 };
        let mut machine = Machine::with_config(config).unwrap();
        machine.load_program(&[1, 5, 0x20, 0]).unwrap();

        assert_eq!(
            machine.step(),
            Err(CpuError::Memory(MemoryError::AddressOutOfRange { addr: 0x20, size: 16 }))
        );
        assert_eq!(machine.state, MachineState::Faulted);
        assert_eq!(machine.regs.pc, 0);
    }

    #[test]
    fn test_operand_past_program_memory_faults() {
        let config = MachineConfig { program_size: 4, data_size: 16 };
        let mut machine = Machine::with_config(config).unwrap();
        machine.load_program(&[2, 1, 1, 9]).unwrap();

        assert!(matches!(
            machine.run(),
            Err(CpuError::Decode(DecodeError::Memory(MemoryError::AddressOutOfRange { addr: 4, .. })))
        ));
    }

    #[test]
    fn test_step_after_halt() {
        let mut machine = Machine::with_program(&[0]).unwrap();
        machine.step().unwrap();

        assert_eq!(machine.step(), Err(CpuError::NotRunning(MachineState::Halted)));
        assert_eq!(machine.cycles, 1);
        assert_eq!(machine.last_instruction(), Some(Instruction::Halt));
    }

    #[test]
    fn test_reset_keeps_program() {
        let mut machine = Machine::with_program(&[2, 9, 1, 1, 0, 0]).unwrap();
        machine.run().unwrap();
        assert_eq!(machine.data.read(0), Ok(1));

        machine.reset();
        assert!(machine.is_running());
        assert_eq!(machine.data.read(0), Ok(0));
        assert_eq!(machine.regs, Registers::default());

        machine.run().unwrap();
        assert_eq!(machine.regs.a, 9);
    }

    #[test]
    fn test_bad_config_rejected() {
        let config = MachineConfig { program_size: 0, data_size: 256 };
        assert!(Machine::with_config(config).is_err());
    }
}
