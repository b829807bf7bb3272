mod builtin;
mod callable;
mod class;
mod environment;
mod error;
mod runtime;
mod value;

pub use builtin::populate_builtin;
pub use callable::{Callable, Func, LoxFunc, NativeFn, NativeFunc};
pub use class::{Class, Instance, INIT_METHOD_NAME};
pub use environment::Environment;
pub use error::{ErrorKind, RuntimeError};
pub use runtime::{Flow, Interpreter};
pub use value::Value;

/// An interpreter printing to stdout with the stock natives registered
pub fn stock_interpreter() -> Interpreter {
    let mut interpreter = Interpreter::new();
    populate_builtin(&mut interpreter);
    interpreter
}
