use std::rc::Rc;

use tracing::trace;

use super::class::{Class, Instance};
use super::environment::Environment;
use super::error::{ErrorAt, ErrorKind, RuntimeError};
use super::runtime::{Flow, Interpreter};
use super::value::Value;
use crate::ast::FunDecl;
use crate::scanner::Pos;

pub const THIS_BINDING: &str = "this";
pub const SUPER_BINDING: &str = "super";

pub trait Func {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    /// `pos` is the call site, used to locate failures that have no position of their own
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        pos: Pos,
    ) -> Result<Value, RuntimeError>;
}

pub type NativeFn = fn(&mut Interpreter, Vec<Value>) -> Result<Value, ErrorKind>;

pub struct NativeFunc {
    pub name: &'static str,
    pub arity: usize,
    pub call: NativeFn,
}

impl Func for NativeFunc {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        pos: Pos,
    ) -> Result<Value, RuntimeError> {
        (self.call)(interpreter, args).at(pos)
    }
}

/// A user function together with the scope it closes over.
/// Methods are stored unbound on their class and get a fresh `this` scope on every access.
pub struct LoxFunc {
    pub decl: Rc<FunDecl>,
    pub closure: Rc<Environment>,
    pub is_init: bool,
}

impl LoxFunc {
    pub fn new(decl: Rc<FunDecl>, closure: Rc<Environment>, is_init: bool) -> LoxFunc {
        LoxFunc {
            decl,
            closure,
            is_init,
        }
    }

    pub fn bind(&self, instance: Instance) -> LoxFunc {
        let closure = Environment::new_enclosed(self.closure.clone());
        closure.define(THIS_BINDING, Some(Value::Instance(instance)));
        LoxFunc {
            decl: self.decl.clone(),
            closure,
            is_init: self.is_init,
        }
    }
}

impl Func for LoxFunc {
    fn name(&self) -> &str {
        &self.decl.name
    }

    fn arity(&self) -> usize {
        self.decl.parameters.len()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = %self.decl.name))]
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        _pos: Pos,
    ) -> Result<Value, RuntimeError> {
        let scope = Environment::new_enclosed(self.closure.clone());
        for (parameter, value) in self.decl.parameters.iter().zip(args) {
            scope.define(parameter, Some(value));
        }
        let flow = interpreter.execute_block(&self.decl.body, scope)?;
        trace!(returned = matches!(flow, Flow::Return(_)), "call finished");
        if self.is_init {
            // Initializers always produce the instance, whatever they returned
            return self.closure.get_at(0, THIS_BINDING).at(self.decl.pos);
        }
        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunc>),
    Function(Rc<LoxFunc>),
    Class(Class),
}

impl Callable {
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(left), Callable::Native(right)) => Rc::ptr_eq(left, right),
            (Callable::Function(left), Callable::Function(right)) => Rc::ptr_eq(left, right),
            (Callable::Class(left), Callable::Class(right)) => left.ptr_eq(right),
            _ => false,
        }
    }

    fn as_func(&self) -> &dyn Func {
        match self {
            Callable::Native(native) => native.as_ref(),
            Callable::Function(function) => function.as_ref(),
            Callable::Class(class) => class,
        }
    }
}

impl Func for Callable {
    fn name(&self) -> &str {
        self.as_func().name()
    }

    fn arity(&self) -> usize {
        self.as_func().arity()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        pos: Pos,
    ) -> Result<Value, RuntimeError> {
        self.as_func().call(interpreter, args, pos)
    }
}
