//! Disassembler for program memory.
//!
//! Walks a memory bank from address 0, decoding one instruction at a time.
//! Bytes that do not decode are shown as `???` and skipped one at a time.

use crate::cpu::{decode, Memory};

/// One line of a disassembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmLine {
    pub addr: usize,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl std::fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{:02x}", b)).collect();
        write!(f, "{:02x}: {:<9} {}", self.addr, hex.join(" "), self.text)
    }
}

/// Disassemble the instruction at `addr`.
pub fn disassemble_instruction(mem: &Memory, addr: usize) -> String {
    match decode(mem, addr) {
        Ok(instr) => instr.to_string(),
        Err(_) => match mem.read(addr) {
            Ok(byte) => format!("??? {:02x}", byte),
            Err(_) => "???".to_string(),
        },
    }
}

/// Disassemble one line starting at `addr`.
///
/// Undecodable bytes make a one-byte line. An address past the end of the
/// bank gives a line with no bytes.
pub fn disassemble_at(mem: &Memory, addr: usize) -> DisasmLine {
    let width = decode(mem, addr).map_or(1, |instr| instr.width());
    let bytes = mem.as_slice();
    let start = addr.min(bytes.len());
    let stop = (addr + width).min(bytes.len());
    DisasmLine {
        addr,
        bytes: bytes[start..stop].to_vec(),
        text: disassemble_instruction(mem, addr),
    }
}

/// Disassemble a bank up to its last non-zero byte.
///
/// The zero tail is summarised by a single HALT line.
pub fn disassemble(mem: &Memory) -> Vec<DisasmLine> {
    let bytes = mem.as_slice();
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);

    let mut lines = Vec::new();
    let mut addr = 0;
    while addr < end {
        let line = disassemble_at(mem, addr);
        addr += line.bytes.len().max(1);
        lines.push(line);
    }

    if addr < bytes.len() {
        lines.push(DisasmLine {
            addr,
            bytes: vec![0],
            text: "HALT".to_string(),
        });
    }

    lines
}

/// Render a full listing as text.
pub fn listing(mem: &Memory) -> String {
    let mut output = String::new();
    for line in disassemble(mem) {
        output.push_str(&line.to_string());
        output.push('\n');
    }
    output
}
