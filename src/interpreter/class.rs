use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::trace;

use super::{
    callable::{Callable, Func, LoxFunc},
    error::{ErrorKind, RuntimeError},
    runtime::Interpreter,
    value::Value,
};
use crate::scanner::Pos;

pub const INIT_METHOD_NAME: &str = "init";

#[derive(Clone)]
pub struct Class {
    inner: Rc<ClassInner>,
}

struct ClassInner {
    name: String,
    superclass: Option<Class>,
    methods: HashMap<String, Rc<LoxFunc>>,
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Class>,
        methods: HashMap<String, Rc<LoxFunc>>,
    ) -> Class {
        Class {
            inner: Rc::new(ClassInner {
                name: name.to_string(),
                superclass,
                methods,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn superclass(&self) -> Option<&Class> {
        self.inner.superclass.as_ref()
    }

    /// Search this class and then its ancestors for an unbound method
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunc>> {
        let mut class = Some(self);
        while let Some(current) = class {
            if let Some(method) = current.inner.methods.get(name) {
                return Some(method.clone());
            }
            class = current.superclass();
        }
        None
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Func for Class {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn arity(&self) -> usize {
        self.find_method(INIT_METHOD_NAME)
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    // Calling a class constructs an instance, running the nearest init with the call's arguments
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        pos: Pos,
    ) -> Result<Value, RuntimeError> {
        let instance = Instance::new(self.clone());
        trace!(class = self.name(), "constructing instance");
        if let Some(init) = self.find_method(INIT_METHOD_NAME) {
            init.bind(instance.clone()).call(interpreter, args, pos)?;
        }
        Ok(Value::Instance(instance))
    }
}

#[derive(Clone)]
pub struct Instance {
    fields: Rc<RefCell<HashMap<String, Value>>>,
    class: Class,
}

impl Instance {
    pub fn new(class: Class) -> Instance {
        Instance {
            fields: Rc::new(RefCell::new(HashMap::new())),
            class,
        }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    /// Fields shadow methods, methods come back freshly bound to this instance
    pub fn get(&self, name: &str) -> Result<Value, ErrorKind> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Ok(value.clone());
        }
        match self.class.find_method(name) {
            Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                method.bind(self.clone()),
            )))),
            None => Err(ErrorKind::UndefinedProperty(name.to_string())),
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }
}
