use std::cell::RefCell;
use std::rc::Rc;

use lox_core::Token;

use crate::callable::{Callable, CallableKind};
use crate::interpreter::{Interpreter, Unwind};
use crate::value::{Dict, Value};

/// A method on a host container type (list, dict, string). Looked up by
/// name through `find_method` and handed out as a bound callable.
pub(crate) struct HostMethod {
    name: &'static str,
    arity: Option<usize>,
    func: fn(&Value, &[Value]) -> Result<Value, String>,
}

/// A host method paired with its receiver, callable like any other value.
pub(crate) struct BoundNative {
    receiver: Value,
    method: &'static HostMethod,
}

impl Callable for BoundNative {
    fn kind(&self) -> CallableKind {
        CallableKind::Native
    }

    fn name(&self) -> &str {
        self.method.name
    }

    fn arity(&self) -> Option<usize> {
        self.method.arity
    }

    fn call(
        self: Rc<Self>,
        _: &mut Interpreter,
        paren: &Token,
        args: &[Value],
    ) -> Result<Value, Unwind> {
        (self.method.func)(&self.receiver, args).map_err(|msg| Unwind::runtime(paren, msg))
    }
}

pub(crate) fn find_method(receiver: &Value, name: &str) -> Option<Value> {
    let table: &'static [HostMethod] = match receiver {
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Str(_) => STRING_METHODS,
        _ => return None,
    };

    table.iter().find(|method| method.name == name).map(|method| {
        Value::Callable(Rc::new(BoundNative {
            receiver: receiver.clone(),
            method,
        }))
    })
}

/// Container indexes must be non-negative whole numbers; the single number
/// type makes this a runtime check.
pub(crate) fn as_index(value: &Value) -> Result<usize, String> {
    match value {
        Value::Num(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
        Value::Num(_) => Err(String::from("Index must be a non-negative integer.")),
        other => Err(format!("Index must be a number, got {}.", other.type_name())),
    }
}

pub(crate) fn check_key(key: &Value) -> Result<(), String> {
    if key.hashable() {
        Ok(())
    } else {
        Err(format!("Unhashable key of type '{}'.", key.type_name()))
    }
}

static LIST_METHODS: &[HostMethod] = &[
    HostMethod { name: "len", arity: Some(0), func: list_len },
    HostMethod { name: "get", arity: Some(1), func: list_get },
    HostMethod { name: "set", arity: Some(2), func: list_set },
    HostMethod { name: "append", arity: Some(1), func: list_append },
    HostMethod { name: "pop", arity: Some(0), func: list_pop },
    HostMethod { name: "copy", arity: Some(0), func: list_copy },
    HostMethod { name: "insert", arity: Some(2), func: list_insert },
    HostMethod { name: "remove", arity: Some(1), func: list_remove },
    HostMethod { name: "contains", arity: Some(1), func: list_contains },
    HostMethod { name: "index", arity: Some(1), func: list_index },
    HostMethod { name: "clear", arity: Some(0), func: list_clear },
    HostMethod { name: "reverse", arity: Some(0), func: list_reverse },
    HostMethod { name: "join", arity: Some(1), func: list_join },
    HostMethod { name: "slice", arity: Some(2), func: list_slice },
];

static DICT_METHODS: &[HostMethod] = &[
    HostMethod { name: "len", arity: Some(0), func: dict_len },
    HostMethod { name: "get", arity: Some(1), func: dict_get },
    HostMethod { name: "set", arity: Some(2), func: dict_set },
    HostMethod { name: "has", arity: Some(1), func: dict_has },
    HostMethod { name: "keys", arity: Some(0), func: dict_keys },
    HostMethod { name: "values", arity: Some(0), func: dict_values },
];

static STRING_METHODS: &[HostMethod] = &[
    HostMethod { name: "len", arity: Some(0), func: string_len },
    HostMethod { name: "upper", arity: Some(0), func: string_upper },
    HostMethod { name: "lower", arity: Some(0), func: string_lower },
    HostMethod { name: "split", arity: Some(1), func: string_split },
    HostMethod { name: "contains", arity: Some(1), func: string_contains },
    HostMethod { name: "replace", arity: Some(2), func: string_replace },
];

fn expect_list(receiver: &Value) -> &Rc<RefCell<Vec<Value>>> {
    match receiver {
        Value::List(elements) => elements,
        _ => unreachable!("list method bound to non-list receiver"),
    }
}

fn expect_dict(receiver: &Value) -> &Rc<RefCell<Dict>> {
    match receiver {
        Value::Dict(dict) => dict,
        _ => unreachable!("dict method bound to non-dict receiver"),
    }
}

fn expect_string(receiver: &Value) -> &str {
    match receiver {
        Value::Str(s) => s.as_str(),
        _ => unreachable!("string method bound to non-string receiver"),
    }
}

fn list_len(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    Ok(Value::from(expect_list(receiver).borrow().len()))
}

fn list_get(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let elements = expect_list(receiver).borrow();
    let idx = as_index(&args[0])?;
    elements
        .get(idx)
        .cloned()
        .ok_or_else(|| String::from("List index out of range."))
}

fn list_set(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let mut elements = expect_list(receiver).borrow_mut();
    let idx = as_index(&args[0])?;
    if idx < elements.len() {
        elements[idx] = args[1].clone();
        Ok(args[1].clone())
    } else {
        Err(String::from("List index out of range."))
    }
}

fn list_append(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    expect_list(receiver).borrow_mut().push(args[0].clone());
    Ok(Value::Nil)
}

fn list_pop(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    expect_list(receiver)
        .borrow_mut()
        .pop()
        .ok_or_else(|| String::from("Pop from empty list."))
}

fn list_copy(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    let copied = expect_list(receiver).borrow().clone();
    Ok(Value::List(Rc::new(RefCell::new(copied))))
}

fn list_insert(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let mut elements = expect_list(receiver).borrow_mut();
    let idx = as_index(&args[0])?;
    if idx <= elements.len() {
        elements.insert(idx, args[1].clone());
        Ok(Value::Nil)
    } else {
        Err(String::from("List index out of range."))
    }
}

fn list_remove(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let mut elements = expect_list(receiver).borrow_mut();
    match elements.iter().position(|element| element == &args[0]) {
        Some(idx) => {
            elements.remove(idx);
            Ok(Value::Nil)
        }
        None => Err(String::from("Value not found.")),
    }
}

fn list_contains(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(
        expect_list(receiver).borrow().contains(&args[0]),
    ))
}

fn list_index(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    expect_list(receiver)
        .borrow()
        .iter()
        .position(|element| element == &args[0])
        .map(Value::from)
        .ok_or_else(|| String::from("Value not found."))
}

fn list_clear(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    expect_list(receiver).borrow_mut().clear();
    Ok(Value::Nil)
}

fn list_reverse(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    expect_list(receiver).borrow_mut().reverse();
    Ok(Value::Nil)
}

fn list_join(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let Value::Str(sep) = &args[0] else {
        return Err(String::from("Separator must be a string."));
    };

    let joined = expect_list(receiver)
        .borrow()
        .iter()
        .map(|element| element.to_string())
        .collect::<Vec<_>>()
        .join(sep.as_str());
    Ok(Value::from(joined))
}

fn list_slice(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let elements = expect_list(receiver).borrow();
    let start = as_index(&args[0])?.min(elements.len());
    let end = as_index(&args[1])?.min(elements.len());
    let sliced: Vec<Value> = elements[start..end.max(start)].to_vec();
    Ok(Value::List(Rc::new(RefCell::new(sliced))))
}

fn dict_len(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    Ok(Value::from(expect_dict(receiver).borrow().len()))
}

fn dict_get(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    check_key(&args[0])?;
    Ok(expect_dict(receiver)
        .borrow()
        .get(&args[0])
        .unwrap_or(Value::Nil))
}

fn dict_set(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    check_key(&args[0])?;
    expect_dict(receiver)
        .borrow_mut()
        .insert(args[0].clone(), args[1].clone());
    Ok(args[1].clone())
}

fn dict_has(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    check_key(&args[0])?;
    Ok(Value::from(expect_dict(receiver).borrow().has(&args[0])))
}

fn dict_keys(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    let keys = expect_dict(receiver).borrow().keys();
    Ok(Value::List(Rc::new(RefCell::new(keys))))
}

fn dict_values(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    let values = expect_dict(receiver).borrow().values();
    Ok(Value::List(Rc::new(RefCell::new(values))))
}

fn string_len(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    Ok(Value::from(expect_string(receiver).chars().count()))
}

fn string_upper(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    Ok(Value::from(expect_string(receiver).to_uppercase()))
}

fn string_lower(receiver: &Value, _: &[Value]) -> Result<Value, String> {
    Ok(Value::from(expect_string(receiver).to_lowercase()))
}

fn string_split(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let Value::Str(sep) = &args[0] else {
        return Err(String::from("Separator must be a string."));
    };
    if sep.is_empty() {
        return Err(String::from("Separator must not be empty."));
    }

    let parts: Vec<Value> = expect_string(receiver)
        .split(sep.as_str())
        .map(Value::from)
        .collect();
    Ok(Value::List(Rc::new(RefCell::new(parts))))
}

fn string_contains(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let Value::Str(needle) = &args[0] else {
        return Err(String::from("Argument must be a string."));
    };
    Ok(Value::from(
        expect_string(receiver).contains(needle.as_str()),
    ))
}

fn string_replace(receiver: &Value, args: &[Value]) -> Result<Value, String> {
    let (Value::Str(from), Value::Str(to)) = (&args[0], &args[1]) else {
        return Err(String::from("Arguments must be strings."));
    };
    Ok(Value::from(
        expect_string(receiver).replace(from.as_str(), to.as_str()),
    ))
}
