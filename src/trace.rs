//! Execution trace records and sinks.
//!
//! The machine produces one [`TraceRecord`] per executed instruction
//! (including the final HALT) and hands it to a [`TraceSink`]. Rendering
//! is entirely the sink's business, so execution can be tested without
//! looking at any text.

use crate::cpu::Instruction;
use serde::{Serialize, Deserialize};
use std::io::{self, Write};
use std::time::Duration;

/// Column header of the text trace.
pub const TEXT_HEADER: &str = "PC BINARY   DEZ CMD  ARGS";

/// One executed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Program counter after the instruction finished.
    pub pc_after: usize,
    pub opcode: u8,
    /// The opcode as eight binary digits.
    pub opcode_binary: String,
    pub mnemonic: String,
    pub operands: Vec<u8>,
}

impl TraceRecord {
    pub fn new(pc_after: usize, instr: &Instruction) -> Self {
        let opcode = instr.opcode();
        Self {
            pc_after,
            opcode,
            opcode_binary: format!("{:08b}", opcode),
            mnemonic: instr.mnemonic().to_string(),
            operands: instr.operands(),
        }
    }

    pub fn is_halt(&self) -> bool {
        self.opcode == crate::cpu::Opcode::HALT
    }
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x} {} {:03} {}",
            self.pc_after, self.opcode_binary, self.opcode, self.mnemonic
        )?;
        for operand in &self.operands {
            write!(f, " {:02x}", operand)?;
        }
        Ok(())
    }
}

/// Consumer of trace records.
pub trait TraceSink {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()>;
}

impl TraceSink for Vec<TraceRecord> {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()> {
        (**self).record(record)
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn record(&mut self, _record: &TraceRecord) -> io::Result<()> {
        Ok(())
    }
}

/// Renders records as the classic fixed-column table.
///
/// The header line is written before the first record.
pub struct TextTrace<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> TextTrace<W> {
    pub fn new(out: W) -> Self {
        Self { out, header_written: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for TextTrace<W> {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.out, "{}", TEXT_HEADER)?;
            self.header_written = true;
        }
        writeln!(self.out, "{}", record)
    }
}

/// Writes one JSON object per record, newline separated.
pub struct JsonTrace<W: Write> {
    out: W,
}

impl<W: Write> JsonTrace<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for JsonTrace<W> {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)
    }
}

/// Forwards records to another sink and pauses after each one.
///
/// The pause only exists to make a trace readable while it scrolls by.
pub struct Throttled<S> {
    inner: S,
    delay: Duration,
}

impl<S: TraceSink> Throttled<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TraceSink> TraceSink for Throttled<S> {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()> {
        self.inner.record(record)?;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(())
    }
}
