//! stlsim - CLI Entry Point
//!
//! Commands:
//! - `stlsim run <program>` - Run a JSON program for a number of cycles
//! - `stlsim list <program>` - Print an STL listing
//! - `stlsim test` - Run the built-in self-test

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stlsim")]
#[command(version = "0.1.0")]
#[command(about = "Instruction execution core for AWL/STL PLC programs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program for a number of cycles
    Run {
        /// Path to the JSON program file
        program: String,
        /// CPU configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Number of cycles to run
        #[arg(short = 'n', long, default_value = "1")]
        cycles: u64,
        /// Print every instruction with the resulting status word
        #[arg(short, long)]
        trace: bool,
        /// Print a CPU dump after the run
        #[arg(short, long)]
        dump: bool,
        /// Write the final registers and memory to a JSON file
        #[arg(long)]
        save_state: Option<String>,
    },
    /// Print an STL listing of a program
    List {
        /// Path to the JSON program file
        program: String,
        /// Use international mnemonics
        #[arg(short, long)]
        english: bool,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, config, cycles, trace, dump, save_state }) => {
            run_program(&program, config.as_deref(), cycles, trace, dump, save_state.as_deref());
        }
        Some(Commands::List { program, english }) => {
            list_program(&program, english);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("stlsim v0.1.0");
            println!("An AWL/STL instruction execution core");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn load_or_exit(path: &str) -> stlsim::ProgramFile {
    match stlsim::load_program(path) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, config: Option<&str>, cycles: u64, trace: bool, dump: bool, save_state: Option<&str>) {
    use stlsim::{CpuConfig, Plc};

    println!("🔧 Running: {}", path);

    let config = match config {
        Some(file) => match CpuConfig::load(file) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => CpuConfig::default(),
    };
    let mnemonics = config.mnemonics;

    let program = load_or_exit(path);
    println!("📂 Loaded {} instructions", program.len());

    let mut plc = match Plc::new(config) {
        Ok(plc) => plc,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if let Some(state) = program.initial_state {
        *plc.state_mut() = state;
    }
    plc.load(program.instructions);

    println!();
    println!("━━━ Execution ━━━");

    let mut failed = false;
    for cycle in 0..cycles {
        let result = if trace { trace_cycle(&mut plc, cycle, mnemonics) } else { plc.run_cycle().map(|_| ()) };
        if let Err(e) = result {
            eprintln!("❌ Cycle {}: {}", cycle, e);
            failed = true;
            break;
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles:       {}", plc.cycles());
    println!("Instructions: {}", plc.instructions());
    println!("Mode:         {}", plc.mode());
    println!("STW:          {}", plc.state().status);

    if dump {
        println!();
        println!("{}", plc.dump());
    }

    if let Some(file) = save_state {
        let written = serde_json::to_string_pretty(&plc.snapshot())
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(file, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("✓ Saved state to {}", file),
            Err(e) => {
                eprintln!("❌ Failed to save state: {}", e);
                std::process::exit(1);
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

/// Run one cycle, printing each instruction as it completes.
fn trace_cycle(plc: &mut stlsim::Plc, cycle: u64, mnemonics: stlsim::Mnemonics) -> Result<(), stlsim::PlcError> {
    plc.run_cycle_with(|index, insn, state| {
        println!("{:>4}/{:04}: {:<24} STW={}", cycle, index, insn.display(mnemonics).to_string(), state.status);
    })
    .map(|_| ())
}

fn list_program(path: &str, english: bool) {
    use stlsim::Mnemonics;

    let program = load_or_exit(path);
    let mnemonics = if english { Mnemonics::English } else { Mnemonics::German };
    print!("{}", stlsim::listing(&program.name, &program.instructions, mnemonics));
}

fn run_self_test() {
    use stlsim::cpu::Region;
    use stlsim::{Address, Area, CpuConfig, Instruction, Opcode, Operand, Plc, Pointer, Width};

    println!("━━━ stlsim Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut config = CpuConfig::default();
    config.data_blocks.insert(1, 16);

    // Test 1: pointer arithmetic keeps the area byte
    print!("Pointer offset wraps inside its area... ");
    let p = Pointer::new(0x84FF_FFFF).add_offset(1);
    if p.raw() == 0x8400_0000 {
        println!("✓");
        passed += 1;
    } else {
        println!("✗ (got {:08X}, expected 84000000)", p.raw());
        failed += 1;
    }

    // Test 2: bit logic
    print!("Bit logic U/O/= ... ");
    let program = [
        Instruction::with(Opcode::U, Operand::mem(Area::Inputs, 0, 0, Width::Bit)),
        Instruction::with(Opcode::O, Operand::mem(Area::Inputs, 0, 1, Width::Bit)),
        Instruction::with(Opcode::Assign, Operand::mem(Area::Outputs, 0, 0, Width::Bit)),
    ];
    let outcome = run_snippet(&config, &program, |plc| {
        plc.memory_mut().write(Region::Inputs, Address::new(0, 1), Width::Bit, 1).map_err(|e| e.to_string())
    })
    .and_then(|plc| plc.memory().read(Region::Outputs, Address::new(0, 0), Width::Bit).map_err(|e| e.to_string()));
    report(outcome, 1, &mut passed, &mut failed);

    // Test 3: integer arithmetic
    print!("Integer add L/L/+I/T ... ");
    let program = [
        Instruction::with(Opcode::L, Operand::int(1200)),
        Instruction::with(Opcode::L, Operand::int(34)),
        Instruction::bare(Opcode::AddI),
        Instruction::with(Opcode::T, Operand::DbMem { db: 1, addr: Address::byte_address(2), width: Width::Word }),
    ];
    let outcome = run_snippet(&config, &program, |_| Ok(()))
        .and_then(|plc| plc.memory().read(Region::Db(1), Address::byte_address(2), Width::Word).map_err(|e| e.to_string()));
    report(outcome, 1234, &mut passed, &mut failed);

    // Test 4: LOOP
    print!("LOOP counts down ... ");
    let program = [
        Instruction::with(Opcode::L, Operand::int(5)),
        Instruction::with(Opcode::Loop, Operand::Label { target: 1 }),
    ];
    let outcome = run_snippet(&config, &program, |_| Ok(())).map(|plc| plc.state().accu(stlsim::cpu::Accu::A1));
    report(outcome, 0, &mut passed, &mut failed);

    // Test 5: faults stop the CPU
    print!("CALL stops the CPU ... ");
    let outcome = run_snippet(&config, &[Instruction::bare(Opcode::Call)], |_| Ok(()));
    match outcome {
        Err(e) if e.contains("CALL") => {
            println!("✓");
            passed += 1;
        }
        other => {
            println!("✗ (got {:?})", other.map(|plc| plc.mode()));
            failed += 1;
        }
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }

    fn run_snippet(
        config: &CpuConfig,
        program: &[Result<Instruction, stlsim::cpu::InsnError>],
        prepare: impl FnOnce(&mut Plc) -> Result<(), String>,
    ) -> Result<Plc, String> {
        let program = program.iter().cloned().collect::<Result<Vec<_>, _>>().map_err(|e| e.to_string())?;
        let mut plc = Plc::new(config.clone()).map_err(|e| e.to_string())?;
        prepare(&mut plc)?;
        plc.load(program);
        plc.run_cycle().map_err(|e| e.to_string())?;
        Ok(plc)
    }

    fn report(outcome: Result<u32, String>, expected: u32, passed: &mut u32, failed: &mut u32) {
        match outcome {
            Ok(value) if value == expected => {
                println!("✓");
                *passed += 1;
            }
            Ok(value) => {
                println!("✗ (got {}, expected {})", value, expected);
                *failed += 1;
            }
            Err(e) => {
                println!("✗ ({})", e);
                *failed += 1;
            }
        }
    }
}
