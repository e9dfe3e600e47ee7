//! Command line driver for the superword SLP pass.
//!
//! Reads a module from a file or stdin, runs the pass, prints the transformed
//! IR and the chain report.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use superword::ir::Module;
use superword::{CodegenMode, PassConfig, PassError, SlpPass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

/// 2-lane superword-level parallelism vectorizer
#[derive(Parser, Debug)]
#[command(name = "superword-opt", version)]
struct Cli {
    /// IR file to transform (stdin when omitted)
    input: Option<PathBuf>,

    /// Write the transformed IR here (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Collect chains and statistics without changing the IR
    #[arg(long)]
    analyze_only: bool,

    /// Only run on the named function (repeatable)
    #[arg(long = "function", value_name = "NAME")]
    functions: Vec<String>,

    /// Do not print the IR
    #[arg(long)]
    no_print_ir: bool,

    /// Print the chain report
    #[arg(long, value_enum, default_value = "on")]
    stats: Toggle,

    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> PassConfig {
        let mut config = PassConfig::default();
        if self.analyze_only {
            config = config.with_mode(CodegenMode::AnalyzeOnly);
        }
        if !self.functions.is_empty() {
            config = config.with_functions(self.functions.iter().cloned());
        }
        config
    }
}

fn run(cli: &Cli) -> Result<(), PassError> {
    let text = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let mut module = Module::parse(&text)?;
    let pass = SlpPass::new(cli.config())?;
    let stats = pass.run_on_module(&mut module)?;

    if !cli.no_print_ir {
        match &cli.output {
            Some(path) => fs::write(path, module.to_string())?,
            None => print!("{}", module),
        }
    }

    if cli.stats == Toggle::On {
        // Keep stdout clean for the IR when both go to the terminal.
        if cli.output.is_none() && !cli.no_print_ir {
            eprint!("{}", stats);
        } else {
            print!("{}", stats);
        }
    }
    io::stdout().flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
