use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use treelox::interpreter::{stock_interpreter, Interpreter, Value};
use treelox::prepare;
use treelox::reporter::WriteErrorReporter;

// sysexits.h codes
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script to run, starts an interactive prompt when omitted
    #[arg(name = "SCRIPT")]
    script: Option<PathBuf>,
}

enum Status {
    Completed,
    StaticError,
    RuntimeError,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();
    match cli.script {
        Some(path) => run_file(&path),
        None => {
            run_prompt()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set, stdout belongs to the script
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &Path) -> Result<ExitCode> {
    let script = match fs::read_to_string(path)
        .with_context(|| format!("Unable to read script file {}", path.display()))
    {
        Ok(script) => script,
        Err(error) => {
            eprintln!("{:#}", error);
            return Ok(ExitCode::from(EX_IOERR));
        }
    };
    let code = match run(&mut stock_interpreter(), &script, false)? {
        Status::Completed => ExitCode::SUCCESS,
        Status::StaticError => ExitCode::from(EX_DATAERR),
        Status::RuntimeError => ExitCode::from(EX_SOFTWARE),
    };
    Ok(code)
}

fn run_prompt() -> Result<()> {
    let mut reader = io::stdin().lock();
    let mut line = String::new();
    // Globals persist between lines
    let mut interpreter = stock_interpreter();
    loop {
        {
            let mut stdout = io::stdout().lock();
            stdout.write_all(b"> ")?;
            stdout.flush()?;
        }
        let n = reader
            .read_line(&mut line)
            .context("Unable to read from stdin")?;
        if n == 0 {
            break;
        }
        // Errors were already reported, the session carries on
        run(&mut interpreter, &line, true)?;
        // Don't keep appending code until the next time
        line.clear();
    }
    Ok(())
}

fn run(interpreter: &mut Interpreter, code: &str, in_repl: bool) -> Result<Status> {
    let mut stderr = io::stderr().lock();
    let mut reporter = WriteErrorReporter::new(&mut stderr);

    let program = match prepare(&mut reporter, code) {
        Ok(program) => program,
        Err(_) => return Ok(Status::StaticError),
    };

    let result = if in_repl && program.0.len() == 1 {
        match interpreter.interpret_one(&program.0[0]) {
            Ok(Some(Value::Nil)) | Ok(None) => Ok(()),
            Ok(Some(value)) => {
                writeln!(io::stdout(), "{}", value).context("Unable to write to stdout")?;
                Ok(())
            }
            Err(error) => Err(error),
        }
    } else {
        interpreter.interpret(&program)
    };

    match result {
        Ok(()) => Ok(Status::Completed),
        Err(error) => {
            writeln!(stderr, "{}", error).context("Unable to write to stderr")?;
            Ok(Status::RuntimeError)
        }
    }
}
