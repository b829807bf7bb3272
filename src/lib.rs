//! A tree-walking interpreter for Lox.
//!
//! Source text goes through [`scanner`], [`parser`] and the [`resolver`] before the
//! [`interpreter`] executes it. Static diagnostics from the first three phases are sent to an
//! [`reporter::ErrorReporter`]; runtime failures come back as [`interpreter::RuntimeError`].
pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod reporter;
pub mod resolver;
pub mod scanner;

use thiserror::Error;

use ast::Program;
use reporter::ErrorReporter;
use scanner::Scanner;

/// A program was rejected before it could run. The details went to the reporter.
#[derive(Error, Debug)]
pub enum StaticError {
    #[error(transparent)]
    Parse(#[from] parser::Error),
    #[error(transparent)]
    Resolve(#[from] resolver::Error),
}

/// Parse and resolve source text into a program ready for the interpreter
pub fn prepare<Reporter>(reporter: &mut Reporter, source: &str) -> Result<Program, StaticError>
where
    Reporter: ErrorReporter,
{
    let mut program = parser::parse(reporter, Scanner::new(source))?;
    resolver::resolve(reporter, &mut program)?;
    Ok(program)
}
