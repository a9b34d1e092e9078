use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One lexical scope frame. Frames link to their enclosing frame and are
/// shared through `Rc` because closures keep whole chains alive.
#[derive(Debug, Default)]
pub(crate) struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, Value>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct UndefinedVariable;

impl Environment {
    pub(crate) fn new() -> Self {
        Environment::default()
    }

    pub(crate) fn with(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            enclosing: Some(enclosing),
            values: HashMap::new(),
        }
    }

    pub(crate) fn define(&mut self, key: &str, value: Value) {
        self.values.insert(String::from(key), value);
    }

    pub(crate) fn get(&self, key: &str) -> Option<Value> {
        if let Some(val) = self.values.get(key) {
            Some(val.clone())
        } else {
            self.enclosing
                .as_ref()
                .and_then(|parent| parent.borrow().get(key))
        }
    }

    pub(crate) fn get_at(&self, dist: usize, key: &str) -> Option<Value> {
        if dist == 0 {
            self.values.get(key).cloned()
        } else {
            self.enclosing
                .as_ref()
                .and_then(|parent| parent.borrow().get_at(dist - 1, key))
        }
    }

    pub(crate) fn assign(&mut self, key: &str, value: Value) -> Result<(), UndefinedVariable> {
        if let Some(val) = self.values.get_mut(key) {
            *val = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(key, value)
        } else {
            Err(UndefinedVariable)
        }
    }

    pub(crate) fn assign_at(
        &mut self,
        dist: usize,
        key: &str,
        value: Value,
    ) -> Result<(), UndefinedVariable> {
        if dist == 0 {
            if let Some(val) = self.values.get_mut(key) {
                *val = value;
                Ok(())
            } else {
                Err(UndefinedVariable)
            }
        } else if let Some(parent) = &self.enclosing {
            parent.borrow_mut().assign_at(dist - 1, key, value)
        } else {
            Err(UndefinedVariable)
        }
    }
}
