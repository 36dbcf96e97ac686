use clap::Parser;
use rcforth::runtime::{
    config::InterpreterConfig,
    error,
    interpreter::{
        CodeManagement, InterpretStatus, Interpreter, Peripherals,
        forth_interpreter::ForthInterpreter,
    },
};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Instant,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};

const ENV_FILTER: &str = "RCFORTH_TRACE";

/// Run the Forth console, or a single script, against a simulated board.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory standing in for the board's SD card.
    #[arg(long, env = "RCFORTH_SD_ROOT", default_value = ".")]
    sd_root: PathBuf,

    /// Name of the init file listing the scripts to run at start up.
    #[arg(long, env = "RCFORTH_INIT", default_value = "init")]
    init: String,

    /// Skip the init file.
    #[arg(long)]
    no_init: bool,

    #[arg(long, default_value_t = InterpreterConfig::default().data_stack_size)]
    data_stack: usize,

    #[arg(long, default_value_t = InterpreterConfig::default().control_stack_size)]
    control_stack: usize,

    #[arg(long, default_value_t = InterpreterConfig::default().max_words)]
    max_words: usize,

    /// A script to run instead of starting the console.
    script: Option<String>,
}

/// Log to stderr, filtered by the `RCFORTH_TRACE` variable and showing warnings by default.
fn setup_tracing() {
    let filter = EnvFilter::try_from_env(ENV_FILTER).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn flush_output(interpreter: &mut ForthInterpreter) -> error::Result<()> {
    let mut stdout = io::stdout();

    write!(stdout, "{}", interpreter.take_output())?;
    stdout.flush()?;

    Ok(())
}

/// Read lines from the console until `EXIT` or the end of input.
fn run_console(interpreter: &mut ForthInterpreter) -> error::Result<()> {
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let status = interpreter.process_line(&line);

        flush_output(interpreter)?;

        if interpreter.exit_requested() {
            break;
        }

        if status != InterpretStatus::ContinueCompiling {
            println!(" OK");
        }

        if interpreter.service_ticker(Instant::now()) {
            flush_output(interpreter)?;
        }
    }

    Ok(())
}

fn main() -> error::Result<()> {
    setup_tracing();

    let args = Args::parse();
    let config = InterpreterConfig {
        data_stack_size: args.data_stack,
        control_stack_size: args.control_stack,
        max_words: args.max_words,
        sd_root: args.sd_root,
        ..InterpreterConfig::default()
    };

    let mut interpreter = ForthInterpreter::new(config);

    if !args.no_init {
        let count = interpreter.run_init_script(&args.init)?;

        info!(count, "init scripts run");
        flush_output(&mut interpreter)?;
    }

    if interpreter.exit_requested() {
        return Ok(());
    }

    match args.script {
        Some(script) => {
            let result = interpreter.process_source_file(&script);

            flush_output(&mut interpreter)?;
            result
        }

        None => run_console(&mut interpreter),
    }
}
