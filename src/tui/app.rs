//! Debugger application state and logic.

use crate::disasm::{disassemble, disassemble_at, DisasmLine};
use crate::{Machine, MachineConfig, TraceRecord};
use std::collections::{HashSet, VecDeque};

/// How many trace records the debugger keeps.
const TRACE_HISTORY: usize = 64;

/// Which memory bank the memory panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Program,
    Data,
}

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Original program image for resets.
    pub program: Vec<u8>,
    /// Breakpoints (by program address).
    pub breakpoints: HashSet<usize>,
    /// Most recent trace records, oldest first.
    pub trace: VecDeque<TraceRecord>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Step over a breakpoint at the PC where a run was started.
    resume: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
    /// Bank shown in the memory panel.
    pub bank: Bank,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>, config: MachineConfig) -> Result<Self, String> {
        let mut machine = Machine::with_config(config).map_err(|e| e.to_string())?;
        machine.load_program(&program).map_err(|e| e.to_string())?;

        Ok(Self {
            machine,
            program,
            breakpoints: HashSet::new(),
            trace: VecDeque::with_capacity(TRACE_HISTORY),
            running: false,
            resume: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
            bank: Bank::Program,
        })
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.machine.is_running() {
            self.status = format!("Machine stopped: {:?}", self.machine.state);
            self.running = false;
            return;
        }

        let pc = self.machine.regs.pc;
        match self.machine.step() {
            Ok(record) => {
                self.status = format!("PC={:02x}: {}", pc, record);
                if self.trace.len() == TRACE_HISTORY {
                    self.trace.pop_front();
                }
                self.trace.push_back(record);
            }
            Err(e) => {
                self.status = format!("Fault: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or fault.
    pub fn run(&mut self) {
        self.running = true;
        self.resume = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.machine.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} cycles", self.machine.state, self.machine.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.machine.regs.pc;
        if self.breakpoints.contains(&pc) && !self.resume {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02x}", pc);
            return;
        }

        self.resume = false;
        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02x}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02x}", pc);
        }
    }

    /// Swap the memory panel between program and data memory.
    pub fn toggle_bank(&mut self) {
        self.bank = match self.bank {
            Bank::Program => Bank::Data,
            Bank::Data => Bank::Program,
        };
        self.mem_scroll = 0;
    }

    /// Scroll the memory panel down by one row.
    pub fn scroll_down(&mut self) {
        let rows = match self.bank {
            Bank::Program => self.machine.program.dump().len(),
            Bank::Data => self.machine.data.dump().len(),
        };
        if self.mem_scroll + 1 < rows {
            self.mem_scroll += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    /// Reset machine to initial state with the program reloaded.
    pub fn reset(&mut self) {
        self.machine.reset();
        if let Err(e) = self.machine.load_program(&self.program) {
            self.status = format!("Reload failed: {}", e);
        } else {
            self.status = "Reset. Ready.".into();
        }
        self.trace.clear();
        self.running = false;
    }

    /// Get disassembly around the current PC.
    ///
    /// Returns at most `lines` entries together with whether each one
    /// starts at the PC. A PC that lands inside another instruction's
    /// operands gets its own line, decoded from there.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(DisasmLine, bool)> {
        let pc = self.machine.regs.pc;
        let mut all = disassemble(&self.machine.program);
        if pc < self.machine.program.size() && !all.iter().any(|line| line.addr == pc) {
            let at = all.partition_point(|line| line.addr < pc);
            all.insert(at, disassemble_at(&self.machine.program, pc));
        }

        let current = all
            .iter()
            .rposition(|line| line.addr <= pc)
            .unwrap_or(0);
        let start = current.saturating_sub(lines / 2);

        all.into_iter()
            .skip(start)
            .take(lines)
            .map(|line| {
                let is_current = line.addr == pc;
                (line, is_current)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(program, config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('m') => app.toggle_bank(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(image: &[u8]) -> DebuggerApp {
        DebuggerApp::new(image.to_vec(), MachineConfig::default()).unwrap()
    }

    #[test]
    fn test_step_records_trace() {
        let mut app = app(&[2, 5, 0]);
        app.step();
        app.step();

        assert_eq!(app.trace.len(), 2);
        assert!(app.trace[1].is_halt());
        assert!(app.machine.is_halted());

        app.step();
        assert!(app.status.contains("Halted"));
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app(&[2, 5, 3, 6, 4, 7, 0]);
        app.breakpoints.insert(4);
        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.machine.regs.pc, 4);
        assert_eq!(app.machine.regs.x, 6);
        assert_eq!(app.machine.regs.y, 0);

        // Resuming steps over the breakpoint.
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(app.machine.is_halted());
        assert_eq!(app.machine.regs.y, 7);
    }

    #[test]
    fn test_reset_restores_program() {
        let mut app = app(&[2, 5, 0]);
        app.run();
        for _ in 0..4 {
            app.tick();
        }
        assert!(app.machine.is_halted());

        app.reset();
        assert!(app.machine.is_running());
        assert_eq!(app.machine.regs.a, 0);
        assert!(app.trace.is_empty());
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let mut app = app(&[2, 16, 8, 1, 6, 0, 2]);
        app.step();

        let lines = app.get_disassembly(8);
        let current: Vec<usize> = lines.iter().filter(|(_, c)| *c).map(|(l, _)| l.addr).collect();
        assert_eq!(current, vec![2]);
    }

    #[test]
    fn test_disassembly_follows_jump_into_operands() {
        // JMPZ 00 02 jumps onto its own last operand: MVCA 09.
        let mut app = app(&[5, 0, 2, 9, 0]);
        app.step();
        assert_eq!(app.machine.regs.pc, 2);

        let lines = app.get_disassembly(8);
        let current: Vec<(usize, &str)> = lines
            .iter()
            .filter(|(_, c)| *c)
            .map(|(l, _)| (l.addr, l.text.as_str()))
            .collect();
        assert_eq!(current, vec![(2, "MVCA 09")]);

        let addrs: Vec<usize> = lines.iter().map(|(l, _)| l.addr).collect();
        assert_eq!(addrs, vec![0, 2, 3, 4]);

        app.step();
        assert_eq!(app.trace.back().map(|r| r.mnemonic.as_str()), Some("MVCA"));
        assert_eq!(app.machine.regs.a, 9);
    }

    #[test]
    fn test_bank_toggle_and_scroll() {
        let mut app = app(&[0]);
        app.scroll_down();
        assert_eq!(app.mem_scroll, 1);

        app.toggle_bank();
        assert_eq!(app.bank, Bank::Data);
        assert_eq!(app.mem_scroll, 0);

        app.scroll_up();
        assert_eq!(app.mem_scroll, 0);
    }
}
