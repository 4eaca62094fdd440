//! `gr1-synth` binary crate: the command-line front end for the GR(1)
//! synthesis engine. The specification lexer/parser proper is an external
//! concern; this binary drives the small textual reader in
//! [`gr1_synth::spec`] good enough to exercise the engine end to end.

use std::io::{self, Read, Write};
use std::process;

use clap::Clap;
use fs_err as fs;

use gr1_synth::options::{CliOptions, SynthesisOptions};
use gr1_synth::spec::{parse_specification, Specification};
use gr1_synth::{synthesize_with, Status};

/// Initializes the logging framework at the given trace level.
fn initialize_logging(level: gr1_synth::options::TraceLevel) -> io::Result<()> {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

fn read_input(input_file: &Option<String>) -> io::Result<String> {
    match input_file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Echoes the parsed problem: variable lists with their indices, and the
/// init/trans/goal formulas, per spec.md §6's `-p` option. Does not
/// synthesize.
fn print_problem(spec: &Specification) {
    println!("ENV VARS ({}):", spec.env_vars.len());
    for (i, name) in spec.env_vars.iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    println!("SYS VARS ({}):", spec.sys_vars.len());
    for (i, name) in spec.sys_vars.iter().enumerate() {
        println!("  {}: {}", spec.env_vars.len() + i, name);
    }
    println!("ENV INIT: {:?}", spec.env_init);
    println!("SYS INIT: {:?}", spec.sys_init);
    println!("ENV TRANS: {:?}", spec.env_trans);
    println!("SYS TRANS: {:?}", spec.sys_trans);
    println!("ENV GOALS: {:?}", spec.env_goals);
    println!("SYS GOALS: {:?}", spec.sys_goals);
}

/// Runs the CLI; returns the process exit code per spec.md §6
/// (`0` success, `1` usage error, `2` I/O or synthesis failure).
fn run() -> i32 {
    let options = CliOptions::parse();
    // Logging may already be initialized by a test harness; not fatal.
    let _ = initialize_logging(options.trace_level);

    let input = match read_input(&options.input_file) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            return 2;
        }
    };

    let spec = match parse_specification(input.as_bytes()) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error parsing specification: {}", e);
            return 1;
        }
    };

    if options.print_only {
        print_problem(&spec);
        return 0;
    }

    let synthesis_options = SynthesisOptions::from(&options);
    let result = match synthesize_with(&spec, &synthesis_options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error during synthesis: {}", e);
            return 2;
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if writeln!(handle, "{}", result.status()).is_err() {
        return 2;
    }
    if result.status() == Status::Realizable {
        if let Some(automaton) = result.automaton() {
            if automaton.dump(&mut handle).is_err() {
                return 2;
            }
        }
    }

    0
}

fn main() {
    process::exit(run());
}
