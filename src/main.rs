//! TCE Emulator - CLI Entry Point
//!
//! Commands:
//! - `tce-emu run [program]` - Run a program to halt, printing the trace
//! - `tce-emu debug [program]` - Interactive debugger
//! - `tce-emu disasm [program]` - Disassemble a program image
//! - `tce-emu programs` - List the built-in programs
//! - `tce-emu test` - Built-in self-test
//!
//! Programs are built-in images selected by name, or literal hex bytes
//! passed with `--image "02 10 00"`.

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use tce::{Machine, MachineConfig};

#[derive(Parser)]
#[command(name = "tce-emu")]
#[command(version = "0.1.0")]
#[command(about = "A tiny 8-bit computer emulator with separate program and data memory")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        #[command(flatten)]
        program: ProgramArgs,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Pause between trace lines, in milliseconds
        #[arg(short, long, default_value = "0")]
        delay_ms: u64,
        /// Emit the trace as JSON lines
        #[arg(long)]
        json: bool,
        /// Suppress the trace and status output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Interactive debugger
    Debug {
        #[command(flatten)]
        program: ProgramArgs,
    },
    /// Disassemble a program image
    Disasm {
        #[command(flatten)]
        program: ProgramArgs,
    },
    /// List the built-in programs
    Programs,
    /// Run the built-in self-test
    Test,
}

/// Program selection and machine sizing shared by several commands.
#[derive(Args)]
struct ProgramArgs {
    /// Name of a built-in program (see `programs`)
    #[arg(default_value = "demo")]
    name: String,
    /// Literal program image as hex bytes, e.g. "02 10 00"
    #[arg(short, long)]
    image: Option<String>,
    /// Program memory size in bytes
    #[arg(long, default_value = "256")]
    program_size: usize,
    /// Data memory size in bytes
    #[arg(long, default_value = "256")]
    data_size: usize,
}

impl ProgramArgs {
    fn config(&self) -> MachineConfig {
        MachineConfig {
            program_size: self.program_size,
            data_size: self.data_size,
        }
    }

    fn image(&self) -> Result<Vec<u8>, tce::ProgramError> {
        match &self.image {
            Some(text) => tce::parse_image(text),
            None => Ok(tce::builtin(&self.name)?.image.to_vec()),
        }
    }

    /// Build a machine with the selected program loaded, or exit.
    fn machine(&self) -> Machine {
        let image = self.image().unwrap_or_else(|e| fail("Failed to select program", e));
        let mut machine = Machine::with_config(self.config())
            .unwrap_or_else(|e| fail("Invalid configuration", e));
        if let Err(e) = machine.load_program(&image) {
            fail("Failed to load program", e);
        }
        machine
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_cycles, delay_ms, json, quiet }) => {
            run_program(&program, max_cycles, Duration::from_millis(delay_ms), json, quiet);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Disasm { program }) => {
            let machine = program.machine();
            print!("{}", tce::disasm::listing(&machine.program));
        }
        Some(Commands::Programs) => {
            list_programs();
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("TCE Emulator v0.1.0");
            println!("A tiny 8-bit computer emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            list_programs();
        }
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}: {}", context, err);
    std::process::exit(1);
}

fn run_program(args: &ProgramArgs, max_cycles: Option<u64>, delay: Duration, json: bool, quiet: bool) {
    use tce::status::{cpu_status, machine_status};
    use tce::trace::{JsonTrace, NullTrace, TextTrace, Throttled, TraceSink};

    let mut machine = args.machine();
    let show_status = !quiet && !json;

    if show_status {
        print!("{}", machine_status(&machine));
        println!();
    }

    let mut sink: Box<dyn TraceSink> = if quiet {
        Box::new(NullTrace)
    } else if json {
        Box::new(JsonTrace::new(std::io::stdout().lock()))
    } else {
        Box::new(TextTrace::new(std::io::stdout().lock()))
    };
    let mut sink = Throttled::new(sink.as_mut(), delay);

    let result = match max_cycles {
        Some(max) => machine.run_limited(max, &mut sink),
        None => machine.run_with(&mut sink),
    };
    drop(sink);

    let cycles = match result {
        Ok(cycles) => cycles,
        Err(e) => fail(&format!("Fault at PC={:02x}", machine.regs.pc), e),
    };

    if show_status {
        println!();
        println!("━━━ Result ━━━");
        println!("Cycles: {}", cycles);
        println!("State: {:?}", machine.state);
        print!("{}", cpu_status(&machine.regs));
        println!();
        print!("{}", tce::status::memory_status("DATA MEMORY", &machine.data));
    }

    if machine.is_running() {
        eprintln!();
        eprintln!("⚠️  Reached max cycles limit ({}).", cycles);
    }
}

#[cfg(feature = "tui")]
fn debug_program(args: &ProgramArgs) {
    let image = args.image().unwrap_or_else(|e| fail("Failed to select program", e));

    println!("🚀 Launching debugger...");
    if let Err(e) = tce::run_debugger(image, args.config()) {
        fail("Debugger error", e);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_args: &ProgramArgs) {
    fail("Debugger unavailable", "built without the `tui` feature");
}

fn list_programs() {
    println!("Built-in programs:");
    for program in tce::programs::BUILTIN {
        println!("  {:<10} {}", program.name, program.description);
    }
}

fn run_self_test() {
    use tce::cpu::{assemble_image, CpuError, DecodeError, Instruction, Register};

    println!("━━━ TCE Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗");
            failed += 1;
        }
    };

    let run = |image: &[u8]| -> Result<Machine, CpuError> {
        let mut machine = Machine::with_program(image)?;
        machine.run_limited(10_000, tce::trace::NullTrace)?;
        Ok(machine)
    };

    // Test 1: HALT only
    let ok = matches!(run(&[0]), Ok(m) if m.is_halted() && m.cycles == 1);
    check("HALT at address 0", ok);

    // Test 2: MVCA
    let ok = matches!(run(&[2, 0x10, 0]), Ok(m) if m.regs.a == 0x10 && m.regs.pc == 2);
    check("MVCA stores constant", ok);

    // Test 3: SUBA
    let ok = matches!(run(&[2, 5, 8, 1, 0]), Ok(m) if m.regs.a == 4);
    check("SUBA stores result", ok);

    // Test 4: wrap-around
    let ok = matches!(run(&[8, 1, 7, 3, 0]), Ok(m) if m.regs.a == 2);
    check("8-bit wrap-around", ok);

    // Test 5: countdown loop
    let program = assemble_image(&[
        Instruction::Mvcx { constant: 3 },
        Instruction::Mvca { constant: 3 },
        Instruction::Suba { value: 1 },
        Instruction::Jmpzr { reg: Register::A, addr: 12 },
        Instruction::Jmpz { value: 0, addr: 4 },
        Instruction::Halt,
    ]);
    let ok = matches!(run(&program), Ok(m) if m.regs.a == 0 && m.regs.x == 3);
    check("JMPZR countdown loop", ok);

    // Test 6: faults
    let ok = matches!(
        run(&[0x0c]),
        Err(CpuError::Decode(DecodeError::UnknownOpcode { opcode: 0x0c, pc: 0 }))
    );
    check("Unknown opcode faults", ok);

    drop(check);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
