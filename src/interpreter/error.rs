use std::io;

use thiserror::Error;

use crate::scanner::Pos;

/// What went wrong while evaluating, without the location it happened at.
///
/// Environment and object model operations return this and the evaluator attaches the position
/// of the node it was evaluating, see [`ErrorAt::at`].
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("{0}")]
    TypeError(String),
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Uninitialized variable '{0}'.")]
    UninitializedVariable(String),
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Only instances have {0}.")]
    NotAnInstance(&'static str),
    #[error("Expect {expected} arguments but got {actual}.")]
    ArityMismatch { expected: usize, actual: usize },
    // A resolved binding that is missing at runtime means the resolver and evaluator disagree
    #[error("internal error: {0}")]
    Internal(String),
    #[error("{0}")]
    Native(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ErrorKind {
    pub fn type_error(message: &str) -> ErrorKind {
        ErrorKind::TypeError(message.to_string())
    }
}

#[derive(Error, Debug)]
#[error("{kind}\n[line {}]", .pos.line)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub pos: Pos,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, pos: Pos) -> RuntimeError {
        RuntimeError { kind, pos }
    }
}

/// Attach a source position to a positionless failure
pub trait ErrorAt<T> {
    fn at(self, pos: Pos) -> Result<T, RuntimeError>;
}

impl<T, E> ErrorAt<T> for Result<T, E>
where
    E: Into<ErrorKind>,
{
    fn at(self, pos: Pos) -> Result<T, RuntimeError> {
        self.map_err(|err| RuntimeError::new(err.into(), pos))
    }
}
