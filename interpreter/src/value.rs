use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use lox_core::Literal;

use crate::callable::{Callable, CallableKind, Instance};

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Nil,
    Bool(bool),
    Num(f64),
    Str(Rc<String>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Callable(Rc<dyn Callable>),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    /// Only `nil` and `false` are falsy; `0`, `""`, and empty containers
    /// are all truthy.
    pub(crate) fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Callable(c) => match c.kind() {
                CallableKind::Class => "class",
                _ => "function",
            },
            Value::Instance(_) => "instance",
        }
    }

    /// Whether the value may be used as a dict key. Mutable containers are
    /// rejected; instances and callables hash by identity.
    pub(crate) fn hashable(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Dict(_))
    }
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Str(val) => Value::Str(Rc::new(val)),
            Literal::Num(val) => Value::Num(val),
            Literal::Bool(val) => Value::Bool(val),
            Literal::Nil => Value::Nil,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Num(lhs), Value::Num(rhs)) => lhs == rhs,
            (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
            // Containers, callables, and instances compare by identity
            (Value::List(lhs), Value::List(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Dict(lhs), Value::Dict(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Callable(lhs), Value::Callable(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Instance(lhs), Value::Instance(rhs)) => Rc::ptr_eq(lhs, rhs),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Nil => state.write_u8(0),
            Value::Bool(val) => {
                state.write_u8(1);
                val.hash(state);
            }
            Value::Num(val) => {
                state.write_u8(2);
                val.to_bits().hash(state);
            }
            Value::Str(val) => {
                state.write_u8(3);
                val.hash(state);
            }
            Value::List(ptr) => {
                state.write_u8(4);
                Rc::as_ptr(ptr).hash(state);
            }
            Value::Dict(ptr) => {
                state.write_u8(5);
                Rc::as_ptr(ptr).hash(state);
            }
            Value::Callable(ptr) => {
                state.write_u8(6);
                Rc::as_ptr(ptr).hash(state);
            }
            Value::Instance(ptr) => {
                state.write_u8(7);
                Rc::as_ptr(ptr).hash(state);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::new(String::from(value)))
    }
}

macro_rules! impl_from_num_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Num(n as f64)
                }
            }
        )*
    }
}

impl_from_num_for_value!(u8 i8 u16 i16 u32 i32 u64 i64 u128 i128 usize isize f32 f64);

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(val) => write!(f, "{}", val),
            Value::Num(val) => write!(f, "{}", val),
            Value::Str(val) => write!(f, "{}", val),
            Value::List(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Dict(dict) => {
                write!(f, "{{")?;
                for (i, (key, value)) in dict.borrow().entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Callable(val) => write!(f, "{}", val),
            Value::Instance(instance) => write!(f, "{}", instance.borrow()),
        }
    }
}

/// A mapping that remembers insertion order. Lookups go through a key→slot
/// index; iteration walks the entry vector.
#[derive(Debug, Default)]
pub(crate) struct Dict {
    entries: Vec<(Value, Value)>,
    index: HashMap<Value, usize>,
}

impl Dict {
    pub(crate) fn new() -> Self {
        Dict::default()
    }

    pub(crate) fn get(&self, key: &Value) -> Option<Value> {
        self.index
            .get(key)
            .map(|slot| self.entries[*slot].1.clone())
    }

    pub(crate) fn insert(&mut self, key: Value, value: Value) {
        match self.index.get(&key) {
            Some(slot) => self.entries[*slot].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub(crate) fn has(&self, key: &Value) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub(crate) fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub(crate) fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::value::{Dict, Value};

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from(true).is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::List(Rc::new(RefCell::new(Vec::new()))).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(17).to_string(), "17");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from("hi").to_string(), "hi");

        let list = Value::List(Rc::new(RefCell::new(vec![
            Value::from(1),
            Value::from("two"),
            Value::Nil,
        ])));
        assert_eq!(list.to_string(), "[1, two, nil]");

        let mut dict = Dict::new();
        dict.insert(Value::from("a"), Value::from(1));
        dict.insert(Value::from("b"), Value::from(2));
        assert_eq!(
            Value::Dict(Rc::new(RefCell::new(dict))).to_string(),
            "{a: 1, b: 2}"
        );
    }

    #[test]
    fn test_equality_by_value_and_identity() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from("a"), Value::from("a"));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::Nil, Value::from(false));

        let a = Value::List(Rc::new(RefCell::new(vec![Value::from(1)])));
        let b = Value::List(Rc::new(RefCell::new(vec![Value::from(1)])));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_dict_preserves_insertion_order() {
        let mut dict = Dict::new();
        dict.insert(Value::from("z"), Value::from(1));
        dict.insert(Value::from("a"), Value::from(2));
        dict.insert(Value::from(3), Value::from("three"));
        // updating a key keeps its slot
        dict.insert(Value::from("z"), Value::from(10));

        assert_eq!(
            dict.keys(),
            vec![Value::from("z"), Value::from("a"), Value::from(3)]
        );
        assert_eq!(dict.get(&Value::from("z")), Some(Value::from(10)));
        assert_eq!(dict.len(), 3);
        assert!(dict.has(&Value::from(3)));
        assert!(!dict.has(&Value::from("missing")));
    }
}
