use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::{debug, trace};

use super::callable::{Callable, Func, LoxFunc, NativeFn, NativeFunc, SUPER_BINDING, THIS_BINDING};
use super::class::{Class, INIT_METHOD_NAME};
use super::environment::Environment;
use super::error::{ErrorAt, ErrorKind, RuntimeError};
use super::value::{self, Value};
use crate::ast::*;
use crate::scanner::Pos;

/// How a statement finished. Returns unwind through blocks and loops up to the nearest call.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<Environment>,
    // The innermost scope, swapped out while a block or call body runs
    environment: Rc<Environment>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    /// An interpreter with no natives that prints to stdout
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        let globals = Environment::new_global();
        Interpreter {
            environment: globals.clone(),
            globals,
            output,
        }
    }

    pub fn define_native(&mut self, name: &'static str, arity: usize, call: NativeFn) {
        let native = NativeFunc { name, arity, call };
        self.globals.define(
            name,
            Some(Value::Callable(Callable::Native(Rc::new(native)))),
        );
    }

    /// Run a resolved program to completion, stopping at the first runtime error
    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        debug!(statements = program.0.len(), "interpreting program");
        for stmt in program.0.iter() {
            if let Flow::Return(_) = self.execute(stmt)? {
                break;
            }
        }
        self.output.flush().at(Pos::default())?;
        debug!("program finished");
        Ok(())
    }

    /// Run a single statement, handing back the value when it is an expression statement
    pub fn interpret_one(&mut self, stmt: &Stmt) -> Result<Option<Value>, RuntimeError> {
        let value = match &stmt.inner {
            StmtInner::Expr(expr) => Some(self.evaluate(expr)?),
            _ => {
                self.execute(stmt)?;
                None
            }
        };
        self.output.flush().at(stmt.pos)?;
        Ok(value)
    }

    /// Execute statements with `scope` as the current environment, restoring the previous one
    /// however the statements finish
    pub(crate) fn execute_block(
        &mut self,
        stmts: &[Stmt],
        scope: Rc<Environment>,
    ) -> Result<Flow, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, scope);
        let result = self.execute_all(stmts);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match &stmt.inner {
            StmtInner::Expr(expr) => {
                self.evaluate(expr)?;
            }
            StmtInner::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value).at(stmt.pos)?;
            }
            StmtInner::VarDecl { name, init } => {
                // Without an initializer the slot stays uninitialized rather than nil
                let value = match init {
                    Some(init) => Some(self.evaluate(init)?),
                    None => None,
                };
                self.environment.define(name, value);
            }
            StmtInner::FunDecl(decl) => {
                let function = LoxFunc::new(decl.clone(), self.environment.clone(), false);
                self.environment.define(
                    &decl.name,
                    Some(Value::Callable(Callable::Function(Rc::new(function)))),
                );
            }
            StmtInner::ClassDecl {
                name,
                superclass,
                methods,
            } => self.declare_class(stmt.pos, name, superclass.as_ref(), methods)?,
            StmtInner::Block(stmts) => {
                let scope = Environment::new_enclosed(self.environment.clone());
                return self.execute_block(stmts, scope);
            }
            StmtInner::If {
                expr,
                then,
                or_else,
            } => {
                if self.evaluate(expr)?.to_bool() {
                    return self.execute(then);
                } else if let Some(or_else) = or_else {
                    return self.execute(or_else);
                }
            }
            StmtInner::Loop { expr, body } => {
                while self.evaluate(expr)?.to_bool() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            StmtInner::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        pos: Pos,
        name: &str,
        superclass: Option<&Expr>,
        methods: &[Rc<FunDecl>],
    ) -> Result<(), RuntimeError> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    return Err(RuntimeError::new(
                        ErrorKind::type_error("Superclass must be a class."),
                        expr.pos,
                    ))
                }
            },
            None => None,
        };

        // Bound first so methods can refer to their own class
        self.environment.define(name, Some(Value::Nil));

        // Methods of a subclass close over a transient scope holding `super`
        if let Some(superclass) = &superclass {
            let scope = Environment::new_enclosed(self.environment.clone());
            scope.define(
                SUPER_BINDING,
                Some(Value::Callable(Callable::Class(superclass.clone()))),
            );
            self.environment = scope;
        }

        let methods: HashMap<String, Rc<LoxFunc>> = methods
            .iter()
            .map(|decl| {
                let is_init = decl.name == INIT_METHOD_NAME;
                let method = LoxFunc::new(decl.clone(), self.environment.clone(), is_init);
                (decl.name.clone(), Rc::new(method))
            })
            .collect();

        if superclass.is_some() {
            let enclosing = self.environment.enclosing().cloned().ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::Internal("'super' scope has no enclosing scope".to_string()),
                    pos,
                )
            })?;
            self.environment = enclosing;
        }

        debug!(
            class = name,
            superclass = superclass.as_ref().map(|class| class.name()),
            methods = methods.len(),
            "declared class"
        );
        let class = Class::new(name, superclass, methods);
        self.environment
            .assign(name, Value::Callable(Callable::Class(class)))
            .at(pos)
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.inner {
            ExprInner::Literal(literal) => Ok(match literal {
                Literal::Number(number) => Value::Number(number.into_inner()),
                Literal::String(string) => Value::string(string),
                Literal::Boolean(b) => Value::Bool(*b),
                Literal::Nil => Value::Nil,
            }),
            ExprInner::Group(inner) => self.evaluate(inner),
            ExprInner::Variable {
                name,
                scope_distance,
            } => self.look_up(name, *scope_distance).at(expr.pos),
            ExprInner::This { scope_distance } => {
                self.look_up(THIS_BINDING, *scope_distance).at(expr.pos)
            }
            ExprInner::Assignment {
                target,
                scope_distance,
                expr: rhs,
            } => {
                let value = self.evaluate(rhs)?;
                let assigned = match scope_distance {
                    Some(distance) => self.environment.assign_at(*distance, target, value.clone()),
                    None => self.globals.assign(target, value.clone()),
                };
                assigned.at(expr.pos)?;
                Ok(value)
            }
            ExprInner::Unary { op, expr: operand } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.to_bool())),
                    UnaryOp::Negative => value::negate(value).at(expr.pos),
                }
            }
            ExprInner::Binary {
                left,
                op: BinaryOp::Comma,
                right,
            } => {
                self.evaluate(left)?;
                self.evaluate(right)
            }
            ExprInner::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                value::binary(*op, left, right).at(expr.pos)
            }
            ExprInner::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                match (op, left.to_bool()) {
                    (LogicalOp::Or, true) | (LogicalOp::And, false) => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            ExprInner::Ternary {
                test,
                if_true,
                if_false,
            } => {
                if self.evaluate(test)?.to_bool() {
                    self.evaluate(if_true)
                } else {
                    self.evaluate(if_false)
                }
            }
            ExprInner::Call { callee, arguments } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }
                self.call(callee, args, expr.pos)
            }
            ExprInner::Get { object, property } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(property).at(expr.pos),
                _ => Err(RuntimeError::new(
                    ErrorKind::NotAnInstance("properties"),
                    expr.pos,
                )),
            },
            ExprInner::Set {
                object,
                property,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(
                        ErrorKind::NotAnInstance("fields"),
                        expr.pos,
                    ));
                };
                let value = self.evaluate(value)?;
                instance.set(property, value.clone());
                Ok(value)
            }
            ExprInner::Super {
                method,
                scope_distance,
            } => self.super_method(method, *scope_distance).at(expr.pos),
        }
    }

    fn call(&mut self, callee: Value, args: Vec<Value>, pos: Pos) -> Result<Value, RuntimeError> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::new(ErrorKind::NotCallable, pos));
        };
        if args.len() != callable.arity() {
            return Err(RuntimeError::new(
                ErrorKind::ArityMismatch {
                    expected: callable.arity(),
                    actual: args.len(),
                },
                pos,
            ));
        }
        trace!(callee = callable.name(), args = args.len(), "call");
        callable.call(self, args, pos)
    }

    fn look_up(&self, name: &str, scope_distance: Option<u32>) -> Result<Value, ErrorKind> {
        match scope_distance {
            Some(distance) => self.environment.get_at(distance, name),
            None => self.globals.get(name),
        }
    }

    // `super` lives one scope further out than the `this` of the method it is used in
    fn super_method(&self, method: &str, scope_distance: Option<u32>) -> Result<Value, ErrorKind> {
        let distance = scope_distance
            .ok_or_else(|| ErrorKind::Internal("unresolved 'super'".to_string()))?;
        let Value::Callable(Callable::Class(superclass)) =
            self.environment.get_at(distance, SUPER_BINDING)?
        else {
            return Err(ErrorKind::Internal("'super' is not a class".to_string()));
        };
        let this_distance = distance
            .checked_sub(1)
            .ok_or_else(|| ErrorKind::Internal("'super' resolved without 'this'".to_string()))?;
        let Value::Instance(instance) = self.environment.get_at(this_distance, THIS_BINDING)?
        else {
            return Err(ErrorKind::Internal("'this' is not an instance".to_string()));
        };
        let method = superclass
            .find_method(method)
            .ok_or_else(|| ErrorKind::UndefinedProperty(method.to_string()))?;
        Ok(Value::Callable(Callable::Function(Rc::new(
            method.bind(instance),
        ))))
    }
}
