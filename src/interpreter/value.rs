use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::ast::BinaryOp;

use super::callable::{Callable, Func};
use super::class::Instance;
use super::error::ErrorKind;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Callable),
    Instance(Instance),
}

impl Value {
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Nil => false,
            _ => true,
        }
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s))
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "Value::String('{}')", s),
            Value::Number(n) => write!(f, "Value::Number({})", n),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::Nil => f.write_str("Value::Nil"),
            Value::Callable(callable) => write!(f, "Value::Callable({})", callable.name()),
            Value::Instance(instance) => {
                write!(f, "Value::Instance({})", instance.class().name())
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            // f64 Display already drops a trailing .0
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => f.write_str("nil"),
            Value::Callable(Callable::Native(native)) => write!(f, "<native fn {}>", native.name),
            Value::Callable(Callable::Function(function)) => write!(f, "<fn {}>", function.name()),
            Value::Callable(Callable::Class(class)) => f.write_str(class.name()),
            Value::Instance(instance) => write!(f, "{} instance", instance.class().name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Nil, Self::Nil) => true,
            (Self::Callable(left), Self::Callable(right)) => left.ptr_eq(right),
            (Self::Instance(left), Self::Instance(right)) => left.ptr_eq(right),
            _ => false,
        }
    }
}

/// Apply a strict binary operator to two evaluated operands.
/// The comma operator is not handled here since its left operand is only evaluated for effect.
pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ErrorKind> {
    match op {
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Add => add(left, right),
        BinaryOp::Subtract => numbers(left, right).map(|(l, r)| Value::Number(l - r)),
        BinaryOp::Multiply => numbers(left, right).map(|(l, r)| Value::Number(l * r)),
        BinaryOp::Divide => {
            let (l, r) = numbers(left, right)?;
            if r == 0f64 {
                Err(ErrorKind::DivisionByZero)
            } else {
                Ok(Value::Number(l / r))
            }
        }
        BinaryOp::LessThan => numbers(left, right).map(|(l, r)| Value::Bool(l < r)),
        BinaryOp::LessThanEqual => numbers(left, right).map(|(l, r)| Value::Bool(l <= r)),
        BinaryOp::GreaterThan => numbers(left, right).map(|(l, r)| Value::Bool(l > r)),
        BinaryOp::GreaterThanEqual => numbers(left, right).map(|(l, r)| Value::Bool(l >= r)),
        BinaryOp::Comma => Ok(right),
    }
}

pub fn negate(value: Value) -> Result<Value, ErrorKind> {
    match value {
        Value::Number(n) => Ok(Value::Number(-n)),
        _ => Err(ErrorKind::type_error("Operand must be a number.")),
    }
}

fn add(left: Value, right: Value) -> Result<Value, ErrorKind> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
        (Value::String(l), Value::String(r)) => {
            let mut joined = String::with_capacity(l.len() + r.len());
            joined.push_str(&l);
            joined.push_str(&r);
            Ok(Value::string(&joined))
        }
        // Mixing a number with a string concatenates their display forms
        (l @ Value::Number(_), r @ Value::String(_)) | (l @ Value::String(_), r @ Value::Number(_)) => {
            Ok(Value::string(&format!("{}{}", l, r)))
        }
        _ => Err(ErrorKind::type_error(
            "Operands must be two numbers or two strings.",
        )),
    }
}

fn numbers(left: Value, right: Value) -> Result<(f64, f64), ErrorKind> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((l, r)),
        _ => Err(ErrorKind::type_error("Operands must be numbers.")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.to_bool());
        assert!(!Value::Bool(false).to_bool());
        assert!(Value::Bool(true).to_bool());
        assert!(Value::Number(0.0).to_bool());
        assert!(Value::string("").to_bool());
    }

    #[test]
    fn display() {
        assert_eq!("3", Value::Number(3.0).to_string());
        assert_eq!("2.5", Value::Number(2.5).to_string());
        assert_eq!("-0.125", Value::Number(-0.125).to_string());
        assert_eq!("hi", Value::string("hi").to_string());
        assert_eq!("nil", Value::Nil.to_string());
        assert_eq!("false", Value::Bool(false).to_string());
    }

    #[test]
    fn equality_never_crosses_kinds() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(0.0), Value::string("0"));
        assert_eq!(Value::string("a"), Value::string("a"));
    }

    #[test]
    fn addition() {
        assert_eq!(
            Value::Number(3.0),
            binary(BinaryOp::Add, Value::Number(1.0), Value::Number(2.0)).unwrap()
        );
        assert_eq!(
            Value::string("ab"),
            binary(BinaryOp::Add, Value::string("a"), Value::string("b")).unwrap()
        );
        assert_eq!(
            Value::string("1b"),
            binary(BinaryOp::Add, Value::Number(1.0), Value::string("b")).unwrap()
        );
        assert_eq!(
            Value::string("a2.5"),
            binary(BinaryOp::Add, Value::string("a"), Value::Number(2.5)).unwrap()
        );
        assert!(matches!(
            binary(BinaryOp::Add, Value::Nil, Value::Number(1.0)),
            Err(ErrorKind::TypeError(message)) if message == "Operands must be two numbers or two strings."
        ));
    }

    #[test]
    fn division_checks_types_before_zero() {
        assert!(matches!(
            binary(BinaryOp::Divide, Value::Number(1.0), Value::Number(0.0)),
            Err(ErrorKind::DivisionByZero)
        ));
        assert!(matches!(
            binary(BinaryOp::Divide, Value::string("a"), Value::Number(0.0)),
            Err(ErrorKind::TypeError(_))
        ));
    }

    #[test]
    fn comparisons_need_numbers() {
        assert_eq!(
            Value::Bool(true),
            binary(BinaryOp::LessThan, Value::Number(1.0), Value::Number(2.0)).unwrap()
        );
        assert!(matches!(
            binary(BinaryOp::Subtract, Value::string("a"), Value::Number(1.0)),
            Err(ErrorKind::TypeError(message)) if message == "Operands must be numbers."
        ));
        assert!(matches!(
            negate(Value::string("a")),
            Err(ErrorKind::TypeError(message)) if message == "Operand must be a number."
        ));
    }
}
