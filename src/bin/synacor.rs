use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use synacor_core::{
    disassemble, disassemble_range, load_snapshot, save_snapshot, CharInput, InputMode, Memory,
    Outcome, PollingStdin, QueuedInput, ReaderInput, Register, RunConfig, ScriptedInput,
    TraceWriter, Vm, WriterOutput,
};

#[derive(Parser, Debug)]
#[command(name = "synacor")]
#[command(about = "Run a Synacor VM program image", long_about = None)]
struct Args {
    /// Program image (little-endian 16-bit words). Defaults to challenge.bin.
    program: Option<PathBuf>,

    /// JSON run config; flags below override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many instructions.
    #[arg(long)]
    steps: Option<u64>,

    /// Restore registers/stack/pc (and memory, if captured) before running.
    #[arg(long, value_name = "PATH")]
    load_snapshot: Option<PathBuf>,

    /// Save a snapshot when the run ends.
    #[arg(long, value_name = "PATH")]
    save_snapshot: Option<PathBuf>,

    /// Include the memory image in the saved snapshot.
    #[arg(long, action = ArgAction::SetTrue)]
    snapshot_memory: bool,

    /// Feed this file to `in` before reading the console.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Write a JSON-lines instruction trace.
    #[arg(long, value_name = "PATH")]
    trace_file: Option<PathBuf>,

    #[arg(long, value_enum)]
    input_mode: Option<InputMode>,

    /// Set a register before running, e.g. `--set-register r7=1`.
    #[arg(long = "set-register", value_name = "REG=VALUE", value_parser = parse_register_assignment)]
    set_registers: Vec<(Register, u16)>,

    /// Print the disassembly of the image and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    disasm: bool,
}

fn parse_register_assignment(raw: &str) -> Result<(Register, u16), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected REG=VALUE, got '{raw}'"))?;
    let reg: Register = name.parse().map_err(|e| format!("{e}"))?;
    let value: u16 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value '{value}': {e}"))?;
    if value > synacor_core::VALUE_MASK {
        return Err(format!("value {value} does not fit in 15 bits"));
    }
    Ok((reg, value))
}

fn build_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RunConfig::default(),
    };
    config.apply_env().context("reading SYNACOR_* environment")?;
    if let Some(program) = &args.program {
        config.program = program.clone();
    }
    if args.steps.is_some() {
        config.max_steps = args.steps;
    }
    if args.load_snapshot.is_some() {
        config.load_snapshot = args.load_snapshot.clone();
    }
    if args.save_snapshot.is_some() {
        config.save_snapshot = args.save_snapshot.clone();
    }
    if args.snapshot_memory {
        config.snapshot_memory = true;
    }
    if args.script.is_some() {
        config.script = args.script.clone();
    }
    if args.trace_file.is_some() {
        config.trace_file = args.trace_file.clone();
    }
    if let Some(mode) = args.input_mode {
        config.input_mode = mode;
    }
    Ok(config)
}

fn build_input(config: &RunConfig) -> Result<Box<dyn CharInput>> {
    let console: Box<dyn CharInput> = match config.input_mode {
        InputMode::Blocking => Box::new(ReaderInput::new(BufReader::new(io::stdin()))),
        InputMode::Poll => Box::new(PollingStdin::spawn()),
    };
    let Some(script_path) = &config.script else {
        return Ok(console);
    };
    let script = std::fs::read(script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let mut queued = QueuedInput::new();
    queued.push_bytes(&script);
    Ok(Box::new(ScriptedInput::new(queued, console)))
}

fn run(args: Args) -> Result<Outcome> {
    let config = build_config(&args)?;
    let memory = Memory::load_image_file(&config.program)
        .with_context(|| format!("loading program {}", config.program.display()))?;

    if args.disasm {
        for instr in disassemble_range(&memory, 0, memory.len()) {
            println!("{instr}");
        }
        return Ok(Outcome::Paused);
    }

    let mut vm = Vm::with_memory(memory);
    if let Some(path) = &config.load_snapshot {
        let snapshot = load_snapshot(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?;
        vm.restore(&snapshot)
            .with_context(|| format!("restoring snapshot {}", path.display()))?;
    }
    for (reg, value) in &args.set_registers {
        vm.set_register(*reg, *value);
    }

    let mut input = build_input(&config)?;
    let stdout = io::stdout();
    let mut output = WriterOutput::new(stdout.lock());

    let outcome = match &config.trace_file {
        Some(path) => {
            let mut trace = TraceWriter::create(path)
                .with_context(|| format!("creating trace {}", path.display()))?;
            let outcome = vm.run_observed(config.max_steps, &mut *input, &mut output, &mut trace);
            let records = trace.records();
            trace
                .finish()
                .with_context(|| format!("writing trace {}", path.display()))?;
            if synacor_core::debug_enabled() {
                eprintln!("[synacor-debug] {records} trace records");
            }
            outcome
        }
        None => match config.max_steps {
            Some(steps) => vm.run_for(steps, &mut *input, &mut output),
            None => vm.run(&mut *input, &mut output),
        },
    };

    output.flush().context("flushing output")?;
    if let Some(err) = output.take_error() {
        bail!("writing output: {err}");
    }

    if let Some(path) = &config.save_snapshot {
        let snapshot = if config.snapshot_memory {
            vm.save_with_memory()
        } else {
            vm.save()
        };
        save_snapshot(path, &snapshot)
            .with_context(|| format!("saving snapshot {}", path.display()))?;
    }

    match &outcome {
        Outcome::Halted => eprintln!("halt"),
        Outcome::Paused => eprintln!(
            "paused at pc {} after {} instructions",
            vm.pc(),
            vm.instruction_count()
        ),
        Outcome::Faulted(fault) => {
            let location = disassemble(vm.memory(), fault.pc)
                .map(|instr| instr.to_string())
                .unwrap_or_else(|| format!("{:5}: <outside memory>", fault.pc));
            eprintln!("fault: {fault}");
            eprintln!("  at {location}");
            eprintln!("  registers {:?}", vm.registers().values());
            eprintln!("  stack {:?}", vm.stack().as_slice());
        }
    }
    Ok(outcome)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(Outcome::Faulted(_)) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
