//! Register and memory status reports.

use crate::cpu::{Allocation, Machine, Memory, MemoryRow, Registers};
use serde::{Serialize, Deserialize};

/// Structured view of one memory bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub allocation: Allocation,
    /// Non-zero cells as a percentage of capacity.
    pub percent: f64,
    pub rows: Vec<MemoryRow>,
}

impl MemoryReport {
    pub fn of(mem: &Memory) -> Self {
        let allocation = mem.allocation();
        Self {
            allocation,
            percent: allocation.percent(),
            rows: mem.dump(),
        }
    }
}

/// Render the register file.
pub fn cpu_status(regs: &Registers) -> String {
    format!(
        "CPU:\nPC = {:02x}\nA  = {:02x}\nX  = {:02x}\nY  = {:02x}\n",
        regs.pc, regs.a, regs.x, regs.y
    )
}

/// Render one memory bank under `title`.
///
/// The "allocated" figure counts non-zero cells, so stored zeros are
/// reported as free.
pub fn memory_status(title: &str, mem: &Memory) -> String {
    let report = MemoryReport::of(mem);
    let mut out = String::new();

    out.push_str(&format!(
        "{}:\nALLOCATED: {} Byte ({:.2}%)\n\n",
        title, report.allocation.used, report.percent
    ));
    for row in &report.rows {
        out.push_str(&format!("{}\n", row));
    }
    out
}

/// Render registers followed by both memory banks.
pub fn machine_status(machine: &Machine) -> String {
    format!(
        "{}\n{}\n{}",
        cpu_status(&machine.regs),
        memory_status("PROGRAM MEMORY", &machine.program),
        memory_status("DATA MEMORY", &machine.data),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_status() {
        let regs = Registers { pc: 0x0a, a: 0xff, x: 1, y: 0 };
        assert_eq!(
            cpu_status(&regs),
            "CPU:\nPC = 0a\nA  = ff\nX  = 01\nY  = 00\n"
        );
    }

    #[test]
    fn test_memory_status() {
        let mut mem = Memory::new(32);
        mem.load(&[2, 16, 8, 1, 6, 0, 2]).unwrap();

        let text = memory_status("PROGRAM MEMORY", &mem);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PROGRAM MEMORY:");
        assert_eq!(lines[1], "ALLOCATED: 6 Byte (18.75%)");
        assert_eq!(lines[3], "00: 02 10 08 01 06 00 02 00 00 00 00 00 00 00 00 00");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_memory_report() {
        let mut mem = Memory::default();
        mem.write(0x42, 7).unwrap();

        let report = MemoryReport::of(&mem);
        assert_eq!(report.allocation.used, 1);
        assert_eq!(report.rows.len(), 16);
        assert_eq!(report.rows[4].bytes[2], 7);
        assert!((report.percent - 100.0 / 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_machine_status_sections() {
        let machine = Machine::with_program(&[0]).unwrap();
        let text = machine_status(&machine);
        assert!(text.starts_with("CPU:"));
        assert!(text.contains("PROGRAM MEMORY:\nALLOCATED: 0 Byte (0.00%)"));
        assert!(text.contains("DATA MEMORY:"));
    }
}
