use std::time::SystemTime;

use super::error::ErrorKind;
use super::runtime::Interpreter;
use super::value::Value;

fn clock(_interpreter: &mut Interpreter, _args: Vec<Value>) -> Result<Value, ErrorKind> {
    let duration = SystemTime::UNIX_EPOCH
        .elapsed()
        .map_err(|err| ErrorKind::Native(err.to_string()))?;
    Ok(Value::Number(duration.as_secs_f64()))
}

pub fn populate_builtin(interpreter: &mut Interpreter) {
    interpreter.define_native("clock", 0, clock);
}
