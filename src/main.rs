//! Command line entry point: run a script file, or hold an interactive
//! session when no script is given.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use simple_logger::SimpleLogger;

use ratl::ast::{Value, print_opt};
use ratl::evaluator::{Session, Step};
use ratl::reader::read_all;
use ratl::stdlib::get_primitives;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Script file to run instead of the interactive session
    script: Option<PathBuf>,

    /// Log every expression as it is evaluated
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .without_timestamps()
        .init()?;

    let mut session = Session::new();
    match &cli.script {
        Some(path) => run_script(path, &mut session),
        None => run_repl(&mut session),
    }
}

/// Evaluate a whole script in order. Results stay silent unless the
/// script prints them; a termination request stops the run early.
fn run_script(path: &Path, session: &mut Session) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    for expr in read_all(&source)? {
        log::debug!("eval {}", print_opt(expr.as_ref()));
        match session.step(expr) {
            Step::Value(_) => {}
            Step::Exit(_) => break,
        }
    }
    Ok(())
}

fn run_repl(session: &mut Session) -> Result<()> {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Type :help for commands, (exit) to leave.");
    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("ratl> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;
                if let Some(command) = line.strip_prefix(':') {
                    if run_command(command, session) {
                        break;
                    }
                    continue;
                }
                if eval_line(line, session) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Read and evaluate one interactive line, echoing each result. Returns
/// true when the session asked to end.
fn eval_line(line: &str, session: &mut Session) -> bool {
    let expressions = match read_all(line) {
        Ok(expressions) => expressions,
        Err(err) => {
            log::error!("{err}");
            return false;
        }
    };
    for expr in expressions {
        log::debug!("eval {}", print_opt(expr.as_ref()));
        match session.step(expr) {
            Step::Value(value) => println!("{}", print_opt(value.as_ref())),
            Step::Exit(value) => {
                println!("{}", print_opt(value.as_ref()));
                return true;
            }
        }
    }
    false
}

/// `:name` commands. Returns true when the session should end.
fn run_command(command: &str, session: &Session) -> bool {
    match command.trim() {
        "help" | "h" => print_help(),
        "env" | "e" => print_env(session),
        "quit" | "q" => return true,
        other => println!("unknown command :{other}, try :help"),
    }
    false
}

fn print_help() {
    println!("Commands:");
    println!("  :help   show this help");
    println!("  :env    show the current bindings");
    println!("  :quit   leave the session");
    println!();
    println!("Keywords:");
    println!("  (if c then... else other...)   branch on a truthy condition");
    println!("  (exit)                         request the end of the session");
    println!("  (lit e...)                     the expression itself, unevaluated");
    println!("  (let name e)                   bind a name in the current frame");
    println!();
    println!("Primitives:");
    for def in get_primitives() {
        println!("  {:<8} {}", def.name, def.help);
    }
}

fn print_env(session: &Session) {
    let mut primitives = 0;
    for (name, value) in session.global().get_all_bindings() {
        if matches!(value, Some(Value::Primitive(_))) {
            primitives += 1;
        } else {
            println!("  {name} = {}", print_opt(value.as_ref()));
        }
    }
    println!("  ({primitives} primitives, :help lists them)");
}
