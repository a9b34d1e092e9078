use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use lox_core::Token;

use crate::ast::Stmt;
use crate::env::Environment;
use crate::interpreter::{Interpreter, Unwind};
use crate::value::Value;

#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum CallableKind {
    Function,
    Native,
    Class,
}

/// The capability of being invoked with an argument vector. Implemented by
/// user functions, bound methods, classes (construction), and natives.
pub(crate) trait Callable {
    fn kind(&self) -> CallableKind {
        CallableKind::Function
    }

    fn name(&self) -> &str;

    /// `None` means the callable accepts any number of arguments; the
    /// interpreter enforces fixed arities before calling.
    fn arity(&self) -> Option<usize>;

    /// `paren` is the closing parenthesis of the call site, used to position
    /// errors raised by natives.
    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        paren: &Token,
        args: &[Value],
    ) -> Result<Value, Unwind>;

    fn as_class(self: Rc<Self>) -> Option<Rc<Class>> {
        None
    }
}

impl Debug for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{:?} {}>", self.kind(), self.name())
    }
}

impl Display for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            CallableKind::Function => write!(f, "<fn {}>", self.name()),
            CallableKind::Native => write!(f, "<native fn {}>", self.name()),
            CallableKind::Class => write!(f, "<class {}>", self.name()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Function {
    name: String,
    params: Vec<Token>,
    body: Rc<Vec<Stmt>>,
    closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub(crate) fn new(
        closure: Rc<RefCell<Environment>>,
        name: &str,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> Self {
        Function {
            closure,
            name: String::from(name),
            params: Vec::from(params),
            body: Rc::clone(body),
        }
    }
}

// Shared by plain functions and bound methods; the closure differs.
fn execute_function(
    function: &Function,
    closure: Rc<RefCell<Environment>>,
    interpreter: &mut Interpreter,
    args: &[Value],
) -> Result<Value, Unwind> {
    let mut env = Environment::with(closure);
    for (param, arg) in function.params.iter().zip(args) {
        env.define(&param.lexeme, arg.clone());
    }

    match interpreter.execute_block_with_env(&function.body, Rc::new(RefCell::new(env))) {
        Ok(()) => Ok(Value::Nil),
        Err(Unwind::Return(value)) => Ok(value),
        Err(err) => Err(err),
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<usize> {
        Some(self.params.len())
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        _paren: &Token,
        args: &[Value],
    ) -> Result<Value, Unwind> {
        let closure = Rc::clone(&self.closure);
        execute_function(&self, closure, interpreter, args)
    }
}

/// A function bound to a receiver. Binding wraps the function's closure in
/// one extra scope holding `this`, so the body resolves the receiver at a
/// fixed distance. The function itself is shared through an `Rc` instead of
/// being re-created per lookup.
#[derive(Debug)]
pub(crate) struct Method {
    closure: Rc<RefCell<Environment>>,
    function: Rc<Function>,
    is_init: bool,
}

impl Method {
    pub(crate) fn bind(
        function: Rc<Function>,
        instance: Rc<RefCell<Instance>>,
        is_init: bool,
    ) -> Self {
        let closure = Rc::new(RefCell::new(Environment::with(Rc::clone(
            &function.closure,
        ))));
        closure
            .borrow_mut()
            .define("this", Value::Instance(instance));

        Method {
            closure,
            function,
            is_init,
        }
    }

    fn this(&self) -> Value {
        // `bind` always defines it
        self.closure
            .borrow()
            .get_at(0, "this")
            .unwrap_or(Value::Nil)
    }
}

impl Callable for Method {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn arity(&self) -> Option<usize> {
        self.function.arity()
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        _paren: &Token,
        args: &[Value],
    ) -> Result<Value, Unwind> {
        let res = execute_function(
            &self.function,
            Rc::clone(&self.closure),
            interpreter,
            args,
        );

        // An initializer always answers with its instance, even after a
        // bare `return;`.
        match res {
            Ok(_) if self.is_init => Ok(self.this()),
            _ => res,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub(crate) fn new(
        name: &str,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Rc<Self> {
        Rc::new(Class {
            name: String::from(name),
            superclass,
            methods,
        })
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(fun) = self.methods.get(name) {
            Some(Rc::clone(fun))
        } else if let Some(superclass) = &self.superclass {
            superclass.find_method(name)
        } else {
            None
        }
    }
}

impl Callable for Class {
    fn kind(&self) -> CallableKind {
        CallableKind::Class
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<usize> {
        match self.find_method("init") {
            Some(init) => init.arity(),
            None => Some(0),
        }
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        paren: &Token,
        args: &[Value],
    ) -> Result<Value, Unwind> {
        let instance = Instance::new(Rc::clone(&self));
        if let Some(init) = self.find_method("init") {
            Rc::new(Method::bind(init, Rc::clone(&instance), true)).call(
                interpreter,
                paren,
                args,
            )?;
        }

        Ok(Value::Instance(instance))
    }

    fn as_class(self: Rc<Self>) -> Option<Rc<Class>> {
        Some(self)
    }
}

#[derive(Debug)]
pub(crate) struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub(crate) fn new(class: Rc<Class>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        }))
    }

    /// Fields shadow methods; a method lookup walks the class chain and
    /// binds the receiver.
    pub(crate) fn get(instance: &Rc<RefCell<Self>>, name: &str) -> Option<Value> {
        if let Some(field) = instance.borrow().fields.get(name) {
            Some(field.clone())
        } else {
            instance.borrow().class.find_method(name).map(|function| {
                Value::Callable(Rc::new(Method::bind(
                    function,
                    Rc::clone(instance),
                    name == "init",
                )))
            })
        }
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) -> Value {
        self.fields.insert(String::from(name), value.clone());
        value
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}

/// Bridges host functions into the interpreter. Natives report errors as
/// plain strings; the call site stamps them with a source position.
pub(crate) type NativeFn = fn(&[Value]) -> Result<Value, String>;

pub(crate) struct Native {
    name: &'static str,
    arity: Option<usize>,
    func: NativeFn,
}

impl Native {
    pub(crate) fn new(name: &'static str, arity: Option<usize>, func: NativeFn) -> Self {
        Native { name, arity, func }
    }
}

impl Debug for Native {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for Native {
    fn kind(&self) -> CallableKind {
        CallableKind::Native
    }

    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }

    fn call(
        self: Rc<Self>,
        _: &mut Interpreter,
        paren: &Token,
        args: &[Value],
    ) -> Result<Value, Unwind> {
        (self.func)(args).map_err(|msg| Unwind::runtime(paren, msg))
    }
}
