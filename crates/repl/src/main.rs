//! `twxrun` (C12): drives the runtime against a real `.twx` script file from the terminal,
//! without a live game connection. Stdin lines are fed to the VM as incoming game text, or as
//! an answer to a pending `getInput`, whichever the VM's wait state calls for.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use twx_core::StaticGameState;
use twx_runtime::{MemoryStore, OutputSink, PersistenceStore, TransportSink, Vm, VmConfig, WaitState};

#[derive(Parser)]
#[command(name = "twxrun")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a TWX automation script against stdin/stdout", long_about = None)]
struct Cli {
    /// Script file to load and run
    script: PathBuf,

    /// Path to an optional VmConfig TOML file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep persisted variables in memory only, instead of the on-disk sled store
    #[arg(long)]
    memory_store: bool,

    /// Directory for the on-disk persistence store (ignored with --memory-store)
    #[arg(long, default_value = "twx-store")]
    store_path: PathBuf,
}

/// Prints output directly to stdout/stderr as it's produced, rather than buffering it.
struct StdoutSink;

impl OutputSink for StdoutSink {
    fn output(&mut self, text: &str) {
        println!("{text}");
    }
}

impl TransportSink for StdoutSink {
    fn send(&mut self, bytes: &str) {
        eprintln!("[send] {bytes}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("twx_runtime=info")))
        .init();

    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.script) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error reading {}: {e}", cli.script.display());
            process::exit(1);
        }
    };

    let program = match twx_compiler::compile(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error compiling {}: {e}", cli.script.display());
            process::exit(1);
        }
    };

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("error reading {}: {e}", path.display());
                process::exit(1);
            });
            VmConfig::from_toml(&text).unwrap_or_else(|e| {
                eprintln!("error parsing {}: {e}", path.display());
                process::exit(1);
            })
        }
        None => VmConfig::default(),
    };

    let persistence: Box<dyn PersistenceStore> = if cli.memory_store {
        Box::new(MemoryStore::new())
    } else {
        match twx_runtime::SledStore::open(&cli.store_path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                eprintln!("error opening persistence store at {}: {e}", cli.store_path.display());
                process::exit(1);
            }
        }
    };

    let mut vm = Vm::new(
        program,
        Box::new(StaticGameState::new(0)),
        persistence,
        Box::new(StdoutSink),
        Box::new(StdoutSink),
        config,
    );

    if let Err(e) = vm.execute() {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let mut editor = DefaultEditor::new().unwrap_or_else(|e| {
        eprintln!("error starting line editor: {e}");
        process::exit(1);
    });

    loop {
        if vm.wait_state().is_halted() {
            break;
        }
        let prompt = match vm.wait_state() {
            WaitState::WaitingForInput { prompt, .. } => format!("{prompt}: "),
            _ => "twx> ".to_string(),
        };

        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("error reading input: {e}");
                process::exit(1);
            }
        };
        editor.add_history_entry(line.as_str()).ok();

        let result = if matches!(vm.wait_state(), WaitState::WaitingForInput { .. }) {
            vm.resume_with_input(&line).and_then(|_| vm.execute())
        } else {
            vm.process_incoming_text(&format!("{line}\n")).and_then(|_| vm.execute())
        };

        if let Err(e) = result {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
