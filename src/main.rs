use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fluentgen::preload::TupleSets;
use fluentgen::{generate, parse_rule, Block, Program, Schema, Translator};

#[derive(Debug, StructOpt)]
#[structopt(name = "fluentgen", about = "Generate Fluent C++ code from a Bloom program")]
struct Opt {
    /// Log more (-v for debug, -vv for trace)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Translate a YAML program into a C++ header
    Build {
        #[structopt(parse(from_os_str))]
        program: PathBuf,

        /// Output file, stdout when omitted
        #[structopt(short, long, parse(from_os_str))]
        out: Option<PathBuf>,
    },

    /// Translate rules typed one per line against a program's collections
    Repl {
        #[structopt(parse(from_os_str))]
        program: Option<PathBuf>,
    },
}

fn setup_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "fluentgen=warn",
            1 => "fluentgen=debug",
            _ => "fluentgen=trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_program(path: &Path) -> Result<Program> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Program::from_yaml(&code).with_context(|| format!("Failed to load {}", path.display()))
}

fn build(path: &Path, out: Option<&Path>) -> Result<()> {
    let program = load_program(path)?;
    let header = generate(&program)
        .with_context(|| format!("Failed to generate program `{}`", program.name))?;

    match out {
        Some(out) => {
            std::fs::write(out, header)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            info!(out = %out.display(), "wrote header");
        }
        None => print!("{}", header),
    }

    Ok(())
}

fn handle_input(schema: &Schema, tuples: &TupleSets, code: &str) -> Result<String> {
    // Each line stands alone, named after the collection it writes.
    let rule = parse_rule("input", code)?;
    let mut translator = Translator::new(schema, tuples, Block::SteadyState);
    let translation = translator.translate(&rule.lhs, &rule)?;
    Ok(translation.statement())
}

fn repl(path: Option<&Path>) -> Result<()> {
    let (schema, tuples) = match path {
        Some(path) => {
            let program = load_program(path)?;
            let schema = program.build_schema()?;
            let tuples = program.build_tuples(&schema)?;
            (schema, tuples)
        }
        None => (Schema::default(), TupleSets::default()),
    };

    let mut editor = Editor::<()>::new();
    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str());

                match handle_input(&schema, &tuples, &line) {
                    Ok(statement) => {
                        println!("{}", statement);
                    }
                    Err(e) => {
                        println!("Error: {:#}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    setup_tracing(opt.verbose);

    match opt.command {
        Command::Build { program, out } => build(&program, out.as_deref()),
        Command::Repl { program } => repl(program.as_deref()),
    }
}
