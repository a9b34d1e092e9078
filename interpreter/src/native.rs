use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::callable::{Callable, Native};
use crate::env::Environment;
use crate::value::{Dict, Value};

/// Installs the host built-ins into the globals environment. Every entry is
/// a plain function; `input` is the only variadic one (0 or 1 arguments).
pub(crate) fn install(globals: &mut Environment) {
    let natives = [
        Native::new("clock", Some(0), clock),
        Native::new("len", Some(1), len),
        Native::new("int", Some(1), int),
        Native::new("float", Some(1), float),
        Native::new("str", Some(1), str_),
        Native::new("type", Some(1), type_),
        Native::new("input", None, input),
        Native::new("min", Some(2), min),
        Native::new("max", Some(2), max),
        Native::new("abs", Some(1), abs),
        Native::new("floor", Some(1), floor),
        Native::new("ceil", Some(1), ceil),
        Native::new("round", Some(1), round),
        Native::new("ord", Some(1), ord),
        Native::new("array", Some(0), array),
        Native::new("hash", Some(0), hash),
        Native::new("read", Some(1), read),
        Native::new("read_lines", Some(1), read_lines),
        Native::new("write", Some(2), write),
    ];

    for native in natives {
        let native: Rc<dyn Callable> = Rc::new(native);
        globals.define(native.name(), Value::Callable(Rc::clone(&native)));
    }
}

fn number(value: &Value, what: &str) -> Result<f64, String> {
    match value {
        Value::Num(n) => Ok(*n),
        other => Err(format!(
            "Argument to {} must be a number, got {}.",
            what,
            other.type_name()
        )),
    }
}

fn clock(_: &[Value]) -> Result<Value, String> {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| String::from("System clock is before the epoch."))?;
    Ok(Value::from(since_epoch.as_secs_f64()))
}

fn len(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Str(s) => Ok(Value::from(s.chars().count())),
        Value::List(elements) => Ok(Value::from(elements.borrow().len())),
        Value::Dict(dict) => Ok(Value::from(dict.borrow().len())),
        other => Err(format!(
            "Argument to len() must be a string, list, or dict, got {}.",
            other.type_name()
        )),
    }
}

fn int(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Num(n) => Ok(Value::from(n.trunc())),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(|n| Value::from(n.trunc()))
            .map_err(|_| format!("Cannot convert '{}' to a number.", s)),
        other => Err(format!("Cannot convert {} to a number.", other.type_name())),
    }
}

fn float(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Num(n) => Ok(Value::from(*n)),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| format!("Cannot convert '{}' to a number.", s)),
        other => Err(format!("Cannot convert {} to a number.", other.type_name())),
    }
}

fn str_(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(args[0].to_string()))
}

fn type_(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(args[0].type_name()))
}

fn input(args: &[Value]) -> Result<Value, String> {
    if args.len() > 1 {
        return Err(String::from("input() takes at most one argument."));
    }

    if let Some(prompt) = args.first() {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
    }

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|_| String::from("Failed to read input."))?;
    Ok(Value::from(line.trim_end_matches(['\n', '\r']).to_string()))
}

fn min(args: &[Value]) -> Result<Value, String> {
    let a = number(&args[0], "min()")?;
    let b = number(&args[1], "min()")?;
    Ok(Value::from(a.min(b)))
}

fn max(args: &[Value]) -> Result<Value, String> {
    let a = number(&args[0], "max()")?;
    let b = number(&args[1], "max()")?;
    Ok(Value::from(a.max(b)))
}

fn abs(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(number(&args[0], "abs()")?.abs()))
}

fn floor(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(number(&args[0], "floor()")?.floor()))
}

fn ceil(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(number(&args[0], "ceil()")?.ceil()))
}

fn round(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(number(&args[0], "round()")?.round()))
}

fn ord(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Str(s) if s.chars().count() == 1 => {
            Ok(Value::from(s.chars().next().map(u32::from).unwrap_or(0)))
        }
        _ => Err(String::from(
            "Argument to ord() must be a single-character string.",
        )),
    }
}

fn array(_: &[Value]) -> Result<Value, String> {
    Ok(Value::List(Rc::new(RefCell::new(Vec::new()))))
}

fn hash(_: &[Value]) -> Result<Value, String> {
    Ok(Value::Dict(Rc::new(RefCell::new(Dict::new()))))
}

fn path_arg<'a>(args: &'a [Value], what: &str) -> Result<&'a str, String> {
    match &args[0] {
        Value::Str(s) => Ok(s.as_str()),
        other => Err(format!(
            "Argument to {} must be a string, got {}.",
            what,
            other.type_name()
        )),
    }
}

fn read(args: &[Value]) -> Result<Value, String> {
    let path = path_arg(args, "read()")?;
    fs::read_to_string(path)
        .map(Value::from)
        .map_err(|_| format!("Cannot read file '{}'.", path))
}

fn read_lines(args: &[Value]) -> Result<Value, String> {
    let path = path_arg(args, "read_lines()")?;
    let contents = fs::read_to_string(path).map_err(|_| format!("Cannot read file '{}'.", path))?;
    let lines: Vec<Value> = contents.lines().map(Value::from).collect();
    Ok(Value::List(Rc::new(RefCell::new(lines))))
}

fn write(args: &[Value]) -> Result<Value, String> {
    let path = path_arg(args, "write()")?;
    let Value::Str(text) = &args[1] else {
        return Err(String::from("Second argument to write() must be a string."));
    };
    fs::write(path, text.as_bytes()).map_err(|_| format!("Cannot write file '{}'.", path))?;
    Ok(Value::Nil)
}
