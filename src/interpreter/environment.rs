use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::error::ErrorKind;
use super::value::Value;

/// One scope in the lexical chain.
///
/// Scopes are shared: every closure created while a scope is active holds a reference to it, so
/// they live on the heap behind an `Rc` and bindings are mutated through a `RefCell`.
/// A slot holding `None` has been declared but never initialized, which is distinct from a slot
/// explicitly holding `nil`.
#[derive(Debug, Default)]
pub struct Environment {
    values: RefCell<HashMap<String, Option<Value>>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new_global() -> Rc<Environment> {
        Rc::new(Environment::default())
    }

    pub fn new_enclosed(enclosing: Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    pub fn enclosing(&self) -> Option<&Rc<Environment>> {
        self.enclosing.as_ref()
    }

    /// Bind in this scope only, overwriting any previous binding of the same name
    pub fn define(&self, name: &str, value: Option<Value>) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    /// Dynamic lookup walking outwards, used for globals
    pub fn get(&self, name: &str) -> Result<Value, ErrorKind> {
        match self.values.borrow().get(name) {
            Some(Some(value)) => return Ok(value.clone()),
            Some(None) => return Err(ErrorKind::UninitializedVariable(name.to_string())),
            None => {}
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.get(name),
            None => Err(ErrorKind::UndefinedVariable(name.to_string())),
        }
    }

    pub fn get_at(&self, distance: u32, name: &str) -> Result<Value, ErrorKind> {
        let scope = self.ancestor(distance, name)?;
        let values = scope.values.borrow();
        match values.get(name) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(ErrorKind::UninitializedVariable(name.to_string())),
            None => Err(unresolved(distance, name)),
        }
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), ErrorKind> {
        if let Some(slot) = self.values.borrow_mut().get_mut(name) {
            *slot = Some(value);
            return Ok(());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => Err(ErrorKind::UndefinedVariable(name.to_string())),
        }
    }

    pub fn assign_at(&self, distance: u32, name: &str, value: Value) -> Result<(), ErrorKind> {
        let scope = self.ancestor(distance, name)?;
        let mut values = scope.values.borrow_mut();
        match values.get_mut(name) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(unresolved(distance, name)),
        }
    }

    fn ancestor(&self, distance: u32, name: &str) -> Result<&Environment, ErrorKind> {
        let mut scope = self;
        for _ in 0..distance {
            scope = scope
                .enclosing
                .as_deref()
                .ok_or_else(|| unresolved(distance, name))?;
        }
        Ok(scope)
    }
}

fn unresolved(distance: u32, name: &str) -> ErrorKind {
    ErrorKind::Internal(format!(
        "no binding for '{}' {} scopes up",
        name, distance
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_walks_outwards() {
        let global = Environment::new_global();
        global.define("a", Some(Value::Number(1.0)));
        let local = Environment::new_enclosed(global.clone());
        assert_eq!(Value::Number(1.0), local.get("a").unwrap());
        assert!(matches!(
            local.get("b"),
            Err(ErrorKind::UndefinedVariable(name)) if name == "b"
        ));
    }

    #[test]
    fn uninitialized_is_not_nil() {
        let global = Environment::new_global();
        global.define("unset", None);
        global.define("empty", Some(Value::Nil));
        assert!(matches!(
            global.get("unset"),
            Err(ErrorKind::UninitializedVariable(_))
        ));
        assert_eq!(Value::Nil, global.get("empty").unwrap());
        global.assign("unset", Value::Bool(true)).unwrap();
        assert_eq!(Value::Bool(true), global.get("unset").unwrap());
    }

    #[test]
    fn redefinition_overwrites() {
        let global = Environment::new_global();
        global.define("a", Some(Value::Number(1.0)));
        global.define("a", Some(Value::Number(2.0)));
        assert_eq!(Value::Number(2.0), global.get("a").unwrap());
    }

    #[test]
    fn distance_lookups_skip_shadowing() {
        let global = Environment::new_global();
        global.define("a", Some(Value::Number(1.0)));
        let middle = Environment::new_enclosed(global.clone());
        middle.define("a", Some(Value::Number(2.0)));
        let inner = Environment::new_enclosed(middle.clone());

        assert_eq!(Value::Number(2.0), inner.get_at(1, "a").unwrap());
        assert_eq!(Value::Number(1.0), inner.get_at(2, "a").unwrap());

        inner.assign_at(2, "a", Value::Number(3.0)).unwrap();
        assert_eq!(Value::Number(3.0), global.get("a").unwrap());
        assert_eq!(Value::Number(2.0), middle.get("a").unwrap());
    }

    #[test]
    fn bad_distance_is_internal() {
        let global = Environment::new_global();
        let inner = Environment::new_enclosed(global);
        assert!(matches!(inner.get_at(5, "a"), Err(ErrorKind::Internal(_))));
        assert!(matches!(
            inner.assign_at(0, "a", Value::Nil),
            Err(ErrorKind::Internal(_))
        ));
    }

    #[test]
    fn assignment_never_creates_bindings() {
        let global = Environment::new_global();
        assert!(matches!(
            global.assign("a", Value::Nil),
            Err(ErrorKind::UndefinedVariable(_))
        ));
    }

    #[test]
    fn closures_share_the_scope() {
        let global = Environment::new_global();
        let captured = Environment::new_enclosed(global);
        captured.define("count", Some(Value::Number(0.0)));
        let first = captured.clone();
        let second = captured.clone();
        first.assign("count", Value::Number(1.0)).unwrap();
        assert_eq!(Value::Number(1.0), second.get("count").unwrap());
        assert!(second.enclosing().is_some());
    }
}
