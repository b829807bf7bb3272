//! Static scope resolution.
//!
//! Walks a parsed [`Program`] once before it runs and fills in every `scope_distance` slot, so
//! the interpreter can jump straight to the environment a name was declared in instead of
//! searching dynamically. Names that are never found in a local scope are left as `None` and
//! looked up in the globals at runtime.
//!
//! The scopes pushed here must mirror the environments the interpreter creates:
//! a block gets one scope, a function call gets one scope for its parameters and body,
//! a class with a superclass gets a scope holding `super` and every bound method gets a
//! scope holding `this`.
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::ast::*;
use crate::reporter::{ErrorReporter, StateTrackingReporter};
use crate::scanner::Pos;

#[derive(Error, Debug)]
#[error("resolution error")]
pub struct Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub fn resolve<Reporter>(reporter: &mut Reporter, program: &mut Program) -> Result<(), Error>
where
    Reporter: ErrorReporter,
{
    let mut reporter = StateTrackingReporter::new(reporter);
    let mut resolver = Resolver {
        reporter: &mut reporter,
        scopes: Vec::new(),
        function: FunctionType::None,
        class: ClassType::None,
    };
    for stmt in program.0.iter_mut() {
        resolver.stmt(stmt);
    }
    if reporter.errored {
        Err(Error {})
    } else {
        Ok(())
    }
}

struct Resolver<'r, Reporter> {
    reporter: &'r mut Reporter,
    // false while a variable's initializer is being resolved, true once it is usable
    scopes: Vec<HashMap<String, bool>>,
    function: FunctionType,
    class: ClassType,
}

impl<'r, Reporter> Resolver<'r, Reporter>
where
    Reporter: ErrorReporter,
{
    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.inner {
            StmtInner::VarDecl { name, init } => {
                self.declare(name);
                if let Some(init) = init {
                    self.expr(init);
                }
                self.define(name);
            }
            StmtInner::FunDecl(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.function(decl, FunctionType::Function);
            }
            StmtInner::ClassDecl {
                name,
                superclass,
                methods,
            } => self.class(stmt.pos, name, superclass.as_mut(), methods),
            StmtInner::Expr(expr) | StmtInner::Print(expr) => self.expr(expr),
            StmtInner::Block(stmts) => {
                self.begin_scope();
                for stmt in stmts.iter_mut() {
                    self.stmt(stmt);
                }
                self.end_scope();
            }
            StmtInner::If {
                expr,
                then,
                or_else,
            } => {
                self.expr(expr);
                self.stmt(then);
                if let Some(or_else) = or_else {
                    self.stmt(or_else);
                }
            }
            StmtInner::Loop { expr, body } => {
                self.expr(expr);
                self.stmt(body);
            }
            StmtInner::Return(value) => {
                if self.function == FunctionType::None {
                    self.reporter
                        .report(stmt.pos, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    self.expr(value);
                }
            }
        }
    }

    fn class(
        &mut self,
        pos: Pos,
        name: &str,
        superclass: Option<&mut Expr>,
        methods: &mut [Rc<FunDecl>],
    ) {
        let enclosing_class = self.class;
        self.class = ClassType::Class;
        self.declare(name);
        self.define(name);

        let has_superclass = superclass.is_some();
        if let Some(superclass) = superclass {
            if let ExprInner::Variable { name: parent, .. } = &superclass.inner {
                if parent == name {
                    self.reporter
                        .report(superclass.pos, "A class can't inherit from itself.");
                }
            }
            self.class = ClassType::Subclass;
            self.expr(superclass);
            self.begin_scope();
            self.define("super");
        }

        self.begin_scope();
        self.define("this");
        for method in methods.iter_mut() {
            let kind = if method.name == crate::interpreter::INIT_METHOD_NAME {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.function(method, kind);
        }
        self.end_scope();

        if has_superclass {
            self.end_scope();
        }
        trace!(class = name, line = pos.line, "resolved class");
        self.class = enclosing_class;
    }

    fn function(&mut self, decl: &mut Rc<FunDecl>, kind: FunctionType) {
        let enclosing_function = self.function;
        self.function = kind;
        // Freshly parsed declarations are uniquely owned so this never clones
        let decl = Rc::make_mut(decl);
        self.begin_scope();
        for parameter in decl.parameters.iter() {
            self.declare(parameter);
            self.define(parameter);
        }
        for stmt in decl.body.iter_mut() {
            self.stmt(stmt);
        }
        self.end_scope();
        self.function = enclosing_function;
    }

    fn expr(&mut self, expr: &mut Expr) {
        let pos = expr.pos;
        match &mut expr.inner {
            ExprInner::Ternary {
                test,
                if_true,
                if_false,
            } => {
                self.expr(test);
                self.expr(if_true);
                self.expr(if_false);
            }
            ExprInner::Binary { left, right, .. } | ExprInner::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprInner::Unary { expr, .. } | ExprInner::Group(expr) => self.expr(expr),
            ExprInner::Literal(_) => {}
            ExprInner::Variable {
                name,
                scope_distance,
            } => {
                let initializing = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(name.as_str()).copied());
                if initializing == Some(false) {
                    self.reporter
                        .report(pos, "Can't read local variable in its own initializer.");
                }
                *scope_distance = self.resolve_local(name);
            }
            ExprInner::Assignment {
                target,
                scope_distance,
                expr,
            } => {
                self.expr(expr);
                *scope_distance = self.resolve_local(target);
            }
            ExprInner::This { scope_distance } => {
                if self.class == ClassType::None {
                    self.reporter
                        .report(pos, "Can't use 'this' outside of a class.");
                    return;
                }
                *scope_distance = self.resolve_local("this");
            }
            ExprInner::Super { scope_distance, .. } => {
                match self.class {
                    ClassType::None => self
                        .reporter
                        .report(pos, "Can't use 'super' outside of a class."),
                    ClassType::Class => self
                        .reporter
                        .report(pos, "Can't use 'super' in a class with no superclass."),
                    ClassType::Subclass => {}
                }
                *scope_distance = self.resolve_local("super");
            }
            ExprInner::Call { callee, arguments } => {
                self.expr(callee);
                for argument in arguments.iter_mut() {
                    self.expr(argument);
                }
            }
            ExprInner::Get { object, .. } => self.expr(object),
            ExprInner::Set { object, value, .. } => {
                self.expr(value);
                self.expr(object);
            }
        }
    }

    fn resolve_local(&self, name: &str) -> Option<u32> {
        self.scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(name))
            .map(|distance| distance as u32)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    // Redeclaring a name in the same scope is allowed, it simply rebinds
    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), false);
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;
    use crate::reporter::CollectingReporter;
    use crate::scanner::Scanner;

    fn resolve_source(code: &str) -> (Program, Vec<String>) {
        let mut reporter = CollectingReporter::default();
        let mut program = parse(&mut reporter, Scanner::new(code)).unwrap();
        let _ = resolve(&mut reporter, &mut program);
        let messages = reporter
            .diagnostics
            .into_iter()
            .map(|(_, message)| message)
            .collect();
        (program, messages)
    }

    fn resolve_errors(code: &str) -> Vec<String> {
        resolve_source(code).1
    }

    fn print_distance(stmt: &Stmt) -> Option<u32> {
        match &stmt.inner {
            StmtInner::Print(Expr {
                inner: ExprInner::Variable { scope_distance, .. },
                ..
            }) => *scope_distance,
            other => panic!("expected print of a variable, got {:?}", other),
        }
    }

    #[test]
    fn globals_stay_unresolved() {
        let (program, errors) = resolve_source("var a = 1; print a;");
        assert!(errors.is_empty());
        assert_eq!(None, print_distance(&program.0[1]));
    }

    #[test]
    fn locals_record_their_depth() {
        let (program, errors) = resolve_source("{ var a = 1; { print a; } }");
        assert!(errors.is_empty());
        let StmtInner::Block(outer) = &program.0[0].inner else {
            panic!("expected block")
        };
        let StmtInner::Block(inner) = &outer[1].inner else {
            panic!("expected block")
        };
        assert_eq!(Some(1), print_distance(&inner[0]));
    }

    #[test]
    fn function_parameters_share_the_body_scope() {
        let (program, errors) = resolve_source("fun f(a) { print a; }");
        assert!(errors.is_empty());
        let StmtInner::FunDecl(decl) = &program.0[0].inner else {
            panic!("expected function")
        };
        assert_eq!(Some(0), print_distance(&decl.body[0]));
    }

    #[test]
    fn super_sits_two_scopes_above_method_body() {
        let (program, errors) =
            resolve_source("class A {} class B < A { go() { return super.go; } }");
        assert!(errors.is_empty());
        let StmtInner::ClassDecl { methods, .. } = &program.0[1].inner else {
            panic!("expected class")
        };
        match &methods[0].body[0].inner {
            StmtInner::Return(Some(Expr {
                inner: ExprInner::Super { scope_distance, .. },
                ..
            })) => assert_eq!(Some(2), *scope_distance),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn own_initializer_is_rejected() {
        assert_eq!(
            vec!["Can't read local variable in its own initializer."],
            resolve_errors("{ var a = a; }")
        );
        // Globals may refer to themselves, the lookup happens at runtime
        assert!(resolve_errors("var a = a;").is_empty());
    }

    #[test]
    fn misplaced_keywords_are_rejected() {
        assert_eq!(
            vec!["Can't return from top-level code."],
            resolve_errors("return 1;")
        );
        assert_eq!(
            vec!["Can't use 'this' outside of a class."],
            resolve_errors("print this;")
        );
        assert_eq!(
            vec!["Can't use 'super' outside of a class."],
            resolve_errors("print super.x;")
        );
        assert_eq!(
            vec!["Can't use 'super' in a class with no superclass."],
            resolve_errors("class A { go() { super.go(); } }")
        );
        assert_eq!(
            vec!["A class can't inherit from itself."],
            resolve_errors("class A < A {}")
        );
    }

    #[test]
    fn permissive_cases() {
        assert!(resolve_errors("{ var a = 1; var a = 2; }").is_empty());
        assert!(resolve_errors("class A { init() { return 1; } }").is_empty());
    }
}
