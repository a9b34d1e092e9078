use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use lox_core::{Error, Literal, Scanner, Token, Type};

use crate::ast::{ExceptClause, Expr, ExprId, ExprVisitor, Stmt, StmtVisitor};
use crate::callable::{Callable, Class, Function, Instance, Method};
use crate::env::Environment;
use crate::host;
use crate::native;
use crate::parser::Parser;
use crate::resolver::{ResolvedStmts, Resolver};
use crate::value::{Dict, Value};

/// Non-local control transfer, riding the evaluator's error channel. Only
/// `Err` and uncaught `Throw` ever reach the public API; the other signals
/// are consumed by loops and call frames.
pub(crate) enum Unwind {
    Err(Error),
    Return(Value),
    Break,
    Continue,
    Throw(Value, Token),
}

impl From<Error> for Unwind {
    fn from(err: Error) -> Self {
        Unwind::Err(err)
    }
}

impl Unwind {
    pub(crate) fn runtime(token: &Token, msg: impl Into<String>) -> Self {
        Unwind::Err(Error::runtime(token, msg))
    }
}

type ExprOutcome = Result<Value, Unwind>;
type StmtOutcome = Result<(), Unwind>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    stdout: Rc<RefCell<dyn Write>>,

    // Import bookkeeping: modules currently executing (cycle detection) and
    // modules already executed (repeat imports are no-ops).
    loading: Vec<PathBuf>,
    loaded: HashSet<PathBuf>,
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        native::install(&mut globals.borrow_mut());

        Interpreter {
            env: globals.clone(),
            globals,
            locals: HashMap::new(),
            stdout,
            loading: Vec::new(),
            loaded: HashSet::new(),
        }
    }

    /// Executes a resolved program. On success returns the printed form of
    /// the last top-level expression statement's value, if it produced one;
    /// the REPL echoes it.
    pub fn interpret(&mut self, resolved: &ResolvedStmts) -> Result<Option<String>, Error> {
        let mut last = None;
        for stmt in &resolved.0 {
            let res = match stmt {
                Stmt::Expression { expression } => self.visit_expr(expression).map(|value| {
                    last = match value {
                        Value::Nil => None,
                        value => Some(value.to_string()),
                    };
                }),
                _ => {
                    last = None;
                    self.visit_stmt(stmt)
                }
            };

            if let Err(unwind) = res {
                return Err(Interpreter::unwind_to_error(unwind));
            }
        }
        Ok(last)
    }

    fn unwind_to_error(unwind: Unwind) -> Error {
        match unwind {
            Unwind::Err(err) => err,
            Unwind::Throw(value, keyword) => {
                Error::runtime(&keyword, format!("Uncaught exception: {}.", value))
            }
            // The resolver rejects these outside their constructs.
            Unwind::Return(_) | Unwind::Break | Unwind::Continue => Error::RuntimeError {
                line: 0,
                col: 0,
                msg: String::from("Control-flow signal escaped its construct."),
            },
        }
    }

    pub(crate) fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub(crate) fn execute_block_with_env(
        &mut self,
        stmts: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> StmtOutcome {
        let previous = std::mem::replace(&mut self.env, env);
        for stmt in stmts {
            if let err @ Err(_) = self.visit_stmt(stmt) {
                self.env = previous;
                return err;
            }
        }
        self.env = previous;
        Ok(())
    }

    fn execute_block(&mut self, stmts: &[Stmt]) -> StmtOutcome {
        let env = Rc::new(RefCell::new(Environment::with(self.env.clone())));
        self.execute_block_with_env(stmts, env)
    }

    fn lookup_variable(&self, token: &Token, id: ExprId) -> Option<Value> {
        match self.locals.get(&id) {
            Some(dist) => self.env.borrow().get_at(*dist, &token.lexeme),
            None => self.globals.borrow().get(&token.lexeme),
        }
    }

    fn numeric_operands(operator: &Token, left: Value, right: Value) -> Result<(f64, f64), Unwind> {
        match (left, right) {
            (Value::Num(left), Value::Num(right)) => Ok((left, right)),
            _ => Err(Unwind::runtime(operator, "Operands must be numbers.")),
        }
    }

    fn module_error(keyword: &Token, path: &str, errs: &[Error]) -> Unwind {
        Unwind::runtime(keyword, format!("Error in module '{}': {}", path, errs[0]))
    }
}

impl ExprVisitor for Interpreter {
    type Item = Value;
    type Error = Unwind;

    fn visit_assign(&mut self, name: &Token, id: ExprId, value: &Expr) -> ExprOutcome {
        let value = self.visit_expr(value)?;

        let assigned = match self.locals.get(&id) {
            Some(dist) => self
                .env
                .borrow_mut()
                .assign_at(*dist, &name.lexeme, value.clone()),
            None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
        };

        match assigned {
            Ok(()) => Ok(value),
            Err(_) => Err(Unwind::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            )),
        }
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ExprOutcome {
        let left = self.visit_expr(left)?;
        let right = self.visit_expr(right)?;

        match operator.ty {
            Type::Plus => match (left, right) {
                (Value::Num(left), Value::Num(right)) => Ok(Value::Num(left + right)),
                (Value::Str(left), Value::Str(right)) => {
                    Ok(Value::from(format!("{}{}", left, right)))
                }
                _ => Err(Unwind::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            Type::Minus => {
                let (left, right) = Interpreter::numeric_operands(operator, left, right)?;
                Ok(Value::Num(left - right))
            }
            Type::Star => {
                let (left, right) = Interpreter::numeric_operands(operator, left, right)?;
                Ok(Value::Num(left * right))
            }
            Type::Slash => {
                let (left, right) = Interpreter::numeric_operands(operator, left, right)?;
                if right == 0.0 {
                    Err(Unwind::runtime(operator, "Division by zero."))
                } else {
                    Ok(Value::Num(left / right))
                }
            }
            Type::BackSlash => {
                let (left, right) = Interpreter::numeric_operands(operator, left, right)?;
                if right == 0.0 {
                    Err(Unwind::runtime(operator, "Division by zero."))
                } else {
                    Ok(Value::Num((left / right).floor()))
                }
            }
            Type::Percent => {
                let (left, right) = Interpreter::numeric_operands(operator, left, right)?;
                if right == 0.0 {
                    Err(Unwind::runtime(operator, "Division by zero."))
                } else {
                    // Sign follows the divisor, like the floored quotient
                    Ok(Value::Num(left - right * (left / right).floor()))
                }
            }
            Type::Caret => {
                let (left, right) = Interpreter::numeric_operands(operator, left, right)?;
                Ok(Value::Num(left.powf(right)))
            }
            Type::Greater => match (left, right) {
                (Value::Num(left), Value::Num(right)) => Ok(Value::Bool(left > right)),
                (Value::Str(left), Value::Str(right)) => Ok(Value::Bool(left > right)),
                _ => Err(Unwind::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            Type::GreaterEqual => match (left, right) {
                (Value::Num(left), Value::Num(right)) => Ok(Value::Bool(left >= right)),
                (Value::Str(left), Value::Str(right)) => Ok(Value::Bool(left >= right)),
                _ => Err(Unwind::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            Type::Less => match (left, right) {
                (Value::Num(left), Value::Num(right)) => Ok(Value::Bool(left < right)),
                (Value::Str(left), Value::Str(right)) => Ok(Value::Bool(left < right)),
                _ => Err(Unwind::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            Type::LessEqual => match (left, right) {
                (Value::Num(left), Value::Num(right)) => Ok(Value::Bool(left <= right)),
                (Value::Str(left), Value::Str(right)) => Ok(Value::Bool(left <= right)),
                _ => Err(Unwind::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            Type::EqualEqual => Ok(Value::Bool(left == right)),
            Type::BangEqual => Ok(Value::Bool(left != right)),
            _ => Err(Unwind::runtime(operator, "Invalid operator.")),
        }
    }

    fn visit_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> ExprOutcome {
        let callee = self.visit_expr(callee)?;
        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(self.visit_expr(arg)?);
        }

        match callee {
            Value::Callable(func) => {
                if let Some(arity) = func.arity() {
                    if arity != evaluated.len() {
                        return Err(Unwind::runtime(
                            paren,
                            format!("Expected {} arguments but got {}.", arity, evaluated.len()),
                        ));
                    }
                }
                func.call(self, paren, &evaluated)
            }
            _ => Err(Unwind::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn visit_get(&mut self, object: &Expr, name: &Token) -> ExprOutcome {
        let object = self.visit_expr(object)?;
        match &object {
            Value::Instance(instance) => {
                Instance::get(instance, &name.lexeme).ok_or_else(|| {
                    Unwind::runtime(name, format!("Undefined property '{}'.", name.lexeme))
                })
            }
            Value::List(_) | Value::Dict(_) | Value::Str(_) => {
                host::find_method(&object, &name.lexeme).ok_or_else(|| {
                    Unwind::runtime(name, format!("Undefined property '{}'.", name.lexeme))
                })
            }
            _ => Err(Unwind::runtime(name, "Only instances have properties.")),
        }
    }

    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> ExprOutcome {
        match self.visit_expr(object)? {
            Value::Instance(instance) => {
                let value = self.visit_expr(value)?;
                Ok(instance.borrow_mut().set(&name.lexeme, value))
            }
            _ => Err(Unwind::runtime(name, "Only instances have fields.")),
        }
    }

    fn visit_index(&mut self, object: &Expr, bracket: &Token, key: &Expr) -> ExprOutcome {
        let object = self.visit_expr(object)?;
        let key = self.visit_expr(key)?;

        match object {
            Value::List(elements) => {
                let idx = host::as_index(&key).map_err(|msg| Unwind::runtime(bracket, msg))?;
                elements
                    .borrow()
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| Unwind::runtime(bracket, "List index out of range."))
            }
            Value::Str(s) => {
                let idx = host::as_index(&key).map_err(|msg| Unwind::runtime(bracket, msg))?;
                s.chars()
                    .nth(idx)
                    .map(|c| Value::from(c.to_string()))
                    .ok_or_else(|| Unwind::runtime(bracket, "String index out of range."))
            }
            Value::Dict(dict) => {
                host::check_key(&key).map_err(|msg| Unwind::runtime(bracket, msg))?;
                dict.borrow()
                    .get(&key)
                    .ok_or_else(|| Unwind::runtime(bracket, format!("Undefined key '{}'.", key)))
            }
            other => Err(Unwind::runtime(
                bracket,
                format!("Cannot index into {}.", other.type_name()),
            )),
        }
    }

    fn visit_index_set(
        &mut self,
        object: &Expr,
        bracket: &Token,
        key: &Expr,
        value: &Expr,
    ) -> ExprOutcome {
        let object = self.visit_expr(object)?;
        let key = self.visit_expr(key)?;
        let value = self.visit_expr(value)?;

        match object {
            Value::List(elements) => {
                let idx = host::as_index(&key).map_err(|msg| Unwind::runtime(bracket, msg))?;
                let mut elements = elements.borrow_mut();
                if idx < elements.len() {
                    elements[idx] = value.clone();
                    Ok(value)
                } else {
                    Err(Unwind::runtime(bracket, "List index out of range."))
                }
            }
            Value::Dict(dict) => {
                host::check_key(&key).map_err(|msg| Unwind::runtime(bracket, msg))?;
                dict.borrow_mut().insert(key, value.clone());
                Ok(value)
            }
            Value::Str(_) => Err(Unwind::runtime(bracket, "Cannot assign into a string.")),
            other => Err(Unwind::runtime(
                bracket,
                format!("Cannot index into {}.", other.type_name()),
            )),
        }
    }

    fn visit_grouping(&mut self, expression: &Expr) -> ExprOutcome {
        self.visit_expr(expression)
    }

    fn visit_literal(&mut self, value: &Literal) -> ExprOutcome {
        Ok(Value::from(value.clone()))
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> ExprOutcome {
        let left = self.visit_expr(left)?;

        // Short-circuit: the answer is whichever operand decided it, not a
        // coerced boolean.
        if operator.ty == Type::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.visit_expr(right)
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> ExprOutcome {
        let right = self.visit_expr(right)?;
        match (operator.ty, right) {
            (Type::Minus, Value::Num(val)) => Ok(Value::Num(-val)),
            (Type::Minus, _) => Err(Unwind::runtime(operator, "Operand must be a number.")),
            (Type::Bang, val) => Ok(Value::Bool(!val.is_truthy())),
            _ => Err(Unwind::runtime(operator, "Invalid unary operator.")),
        }
    }

    fn visit_variable(&mut self, name: &Token, id: ExprId) -> ExprOutcome {
        self.lookup_variable(name, id).ok_or_else(|| {
            Unwind::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
        })
    }

    fn visit_this(&mut self, keyword: &Token, id: ExprId) -> ExprOutcome {
        self.lookup_variable(keyword, id)
            .ok_or_else(|| Unwind::runtime(keyword, "Cannot use 'this' here."))
    }

    fn visit_super(&mut self, keyword: &Token, method: &Token, id: ExprId) -> ExprOutcome {
        let distance = match self.locals.get(&id) {
            Some(dist) => *dist,
            None => return Err(Unwind::runtime(keyword, "Cannot use 'super' here.")),
        };

        let superclass = match self.env.borrow().get_at(distance, "super") {
            Some(Value::Callable(callable)) => callable.as_class(),
            _ => None,
        };
        let Some(superclass) = superclass else {
            return Err(Unwind::runtime(keyword, "Cannot use 'super' here."));
        };

        // `this` lives in the scope just inside the one holding `super`.
        let instance = match self.env.borrow().get_at(distance - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(Unwind::runtime(keyword, "Cannot use 'super' here.")),
        };

        match superclass.find_method(&method.lexeme) {
            Some(function) => Ok(Value::Callable(Rc::new(Method::bind(
                function,
                instance,
                method.lexeme == "init",
            )))),
            None => Err(Unwind::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn visit_lambda(
        &mut self,
        _keyword: &Token,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> ExprOutcome {
        let function = Function::new(self.env.clone(), "lambda", params, body);
        Ok(Value::Callable(Rc::new(function)))
    }

    fn visit_list(&mut self, _bracket: &Token, elements: &[Expr]) -> ExprOutcome {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(self.visit_expr(element)?);
        }
        Ok(Value::List(Rc::new(RefCell::new(values))))
    }

    fn visit_dict(&mut self, brace: &Token, entries: &[(Expr, Expr)]) -> ExprOutcome {
        let mut dict = Dict::new();
        for (key, value) in entries {
            let key = self.visit_expr(key)?;
            host::check_key(&key).map_err(|msg| Unwind::runtime(brace, msg))?;
            let value = self.visit_expr(value)?;
            dict.insert(key, value);
        }
        Ok(Value::Dict(Rc::new(RefCell::new(dict))))
    }
}

impl StmtVisitor for Interpreter {
    type Item = ();
    type Error = Unwind;

    fn visit_block(&mut self, statements: &[Stmt]) -> StmtOutcome {
        self.execute_block(statements)
    }

    fn visit_expression(&mut self, expression: &Expr) -> StmtOutcome {
        self.visit_expr(expression)?;
        Ok(())
    }

    fn visit_function(
        &mut self,
        name: &Token,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> StmtOutcome {
        let function = Function::new(self.env.clone(), &name.lexeme, params, body);
        self.env
            .borrow_mut()
            .define(&name.lexeme, Value::Callable(Rc::new(function)));
        Ok(())
    }

    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
    ) -> StmtOutcome {
        let superclass = match superclass {
            Some(expr) => {
                let value = self.visit_expr(expr)?;
                let class = match &value {
                    Value::Callable(callable) => Rc::clone(callable).as_class(),
                    _ => None,
                };
                match class {
                    Some(class) => Some(class),
                    None => {
                        let token = match expr {
                            Expr::Variable { name, .. } => name,
                            _ => name,
                        };
                        return Err(Unwind::runtime(token, "Superclass must be a class."));
                    }
                }
            }
            None => None,
        };

        self.env.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods close over an extra scope holding `super` when inheriting.
        let method_env = match &superclass {
            Some(class) => {
                let env = Rc::new(RefCell::new(Environment::with(self.env.clone())));
                env.borrow_mut().define(
                    "super",
                    Value::Callable(Rc::clone(class) as Rc<dyn Callable>),
                );
                env
            }
            None => self.env.clone(),
        };

        let mut method_map = HashMap::new();
        for method in methods {
            if let Stmt::Function {
                name: method_name,
                params,
                body,
            } = method
            {
                let function = Function::new(
                    method_env.clone(),
                    &method_name.lexeme,
                    params,
                    body,
                );
                method_map.insert(method_name.lexeme.clone(), Rc::new(function));
            }
        }

        let class = Class::new(&name.lexeme, superclass, method_map);
        if self
            .env
            .borrow_mut()
            .assign(&name.lexeme, Value::Callable(class))
            .is_err()
        {
            return Err(Unwind::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ));
        }

        Ok(())
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> StmtOutcome {
        if self.visit_expr(condition)?.is_truthy() {
            self.visit_stmt(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.visit_stmt(else_branch)
        } else {
            Ok(())
        }
    }

    fn visit_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        is_for: bool,
        increment: Option<&Expr>,
    ) -> StmtOutcome {
        loop {
            if !self.visit_expr(condition)?.is_truthy() {
                return Ok(());
            }

            match self.visit_stmt(body) {
                Ok(()) => {}
                Err(Unwind::Break) => return Ok(()),
                Err(Unwind::Continue) => {
                    // A desugared for-loop must still run its increment; the
                    // body block that normally does so was skipped. The
                    // increment was resolved against that block's scope, so
                    // mirror it with a fresh environment.
                    if is_for {
                        if let Some(increment) = increment {
                            let env =
                                Rc::new(RefCell::new(Environment::with(self.env.clone())));
                            let previous = std::mem::replace(&mut self.env, env);
                            let res = self.visit_expr(increment);
                            self.env = previous;
                            res?;
                        }
                    }
                }
                err => return err,
            }
        }
    }

    fn visit_print(&mut self, expression: &Expr) -> StmtOutcome {
        let value = self.visit_expr(expression)?;
        writeln!(self.stdout.borrow_mut(), "{}", value)
            .map_err(|_| Unwind::Err(Error::RuntimeError {
                line: 0,
                col: 0,
                msg: String::from("Failed to write to output."),
            }))?;
        Ok(())
    }

    fn visit_return(&mut self, _keyword: &Token, value: Option<&Expr>) -> StmtOutcome {
        let value = match value {
            Some(value) => self.visit_expr(value)?,
            None => Value::Nil,
        };
        Err(Unwind::Return(value))
    }

    fn visit_break(&mut self, _keyword: &Token) -> StmtOutcome {
        Err(Unwind::Break)
    }

    fn visit_continue(&mut self, _keyword: &Token) -> StmtOutcome {
        Err(Unwind::Continue)
    }

    fn visit_throw(&mut self, keyword: &Token, value: &Expr) -> StmtOutcome {
        let value = self.visit_expr(value)?;
        Err(Unwind::Throw(value, keyword.clone()))
    }

    fn visit_try(
        &mut self,
        try_block: &[Stmt],
        except: Option<&ExceptClause>,
        finally: Option<&[Stmt]>,
    ) -> StmtOutcome {
        let mut outcome = self.execute_block(try_block);

        // Only user exceptions are catchable; runtime errors and the other
        // signals pass through (after `finally`).
        if let Some(clause) = except {
            outcome = match outcome {
                Err(Unwind::Throw(value, _)) => {
                    let mut env = Environment::with(self.env.clone());
                    env.define(&clause.name.lexeme, value);
                    self.execute_block_with_env(&clause.body, Rc::new(RefCell::new(env)))
                }
                other => other,
            };
        }

        if let Some(finally) = finally {
            let finally_outcome = self.execute_block(finally);
            // Whatever finally raises or signals wins over the in-flight
            // outcome.
            if finally_outcome.is_err() {
                return finally_outcome;
            }
        }

        outcome
    }

    fn visit_import(&mut self, keyword: &Token, path: &Token) -> StmtOutcome {
        let path_str = match &path.value {
            Literal::Str(s) => s.clone(),
            _ => return Err(Unwind::runtime(path, "Module path must be a string.")),
        };
        let path_buf = PathBuf::from(&path_str);

        if self.loading.contains(&path_buf) {
            return Err(Unwind::runtime(
                keyword,
                format!("Circular import '{}'.", path_str),
            ));
        }
        if self.loaded.contains(&path_buf) {
            return Ok(());
        }

        let source = fs::read_to_string(&path_buf).map_err(|_| {
            Unwind::runtime(path, format!("Cannot read module '{}'.", path_str))
        })?;

        let tokens = Scanner::new(&source)
            .scan_tokens()
            .map_err(|errs| Interpreter::module_error(keyword, &path_str, &errs))?;
        let parsed = Parser::new(&tokens)
            .parse()
            .map_err(|errs| Interpreter::module_error(keyword, &path_str, &errs))?;

        let resolved = {
            let mut resolver = Resolver::new(self);
            resolver
                .resolve(parsed)
                .map_err(|errs| Interpreter::module_error(keyword, &path_str, &errs))?
        };

        // Modules execute straight into the globals environment.
        self.loading.push(path_buf.clone());
        let previous = std::mem::replace(&mut self.env, self.globals.clone());
        let mut result = Ok(());
        for stmt in &resolved.0 {
            if let err @ Err(_) = self.visit_stmt(stmt) {
                result = err;
                break;
            }
        }
        self.env = previous;
        self.loading.pop();

        if result.is_ok() {
            self.loaded.insert(path_buf);
        }
        result
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> StmtOutcome {
        let value = match init {
            Some(init) => self.visit_expr(init)?,
            None => Value::Nil,
        };
        self.env.borrow_mut().define(&name.lexeme, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::str;

    use lox_core::{Error, Scanner};

    use crate::interpreter::Interpreter;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn test_statements(src: &str, out: Option<&str>, err: Option<&str>) {
        println!("Testing source:\n{}", src);

        let tokens = Scanner::new(src).scan_tokens().unwrap();
        let parsed = Parser::new(&tokens).parse().unwrap();

        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output.clone());
        let mut resolver = Resolver::new(&mut interpreter);
        let resolved = resolver.resolve(parsed).unwrap();
        let result = interpreter.interpret(&resolved);

        match (result, err) {
            (Err(Error::RuntimeError { msg, .. }), Some(err)) => assert_eq!(err, msg),
            (Err(Error::RuntimeError { msg, .. }), None) => {
                panic!("Not expecting any error, found '{}'", msg)
            }
            (Err(other), _) => panic!("Unexpected error kind: {}", other),
            (Ok(_), Some(err)) => panic!("Expecting an error '{}', found none.", err),
            _ => {}
        }

        if let Some(out) = out {
            assert_eq!(str::from_utf8(&output.borrow()).unwrap(), out);
        }
    }

    #[test]
    fn test_expressions() {
        let tests = [
            ("print (1 + 2) * 5 + 2;", "17\n"),
            ("print \"hello \" + \"world\";", "hello world\n"),
            ("print 7 \\ 2;", "3\n"),
            ("print -7 \\ 2;", "-4\n"),
            ("print 7 % 3;", "1\n"),
            ("print -7 % 3;", "2\n"),
            ("print 2 ^ 10;", "1024\n"),
            ("print 10 / 4;", "2.5\n"),
            ("print -10.5;", "-10.5\n"),
            ("print \"abc\" < \"abd\";", "true\n"),
            ("print 1 == \"1\";", "false\n"),
            ("print nil == nil;", "true\n"),
            ("print nil == false;", "false\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_truthiness() {
        let tests = [
            ("print !0;", "false\n"),
            ("print !nil;", "true\n"),
            ("print !false;", "true\n"),
            ("print !\"\";", "false\n"),
            // 0 and "" are truthy in conditions too
            ("if (0) print \"t\"; else print \"f\";", "t\n"),
            ("if (\"\") print \"t\"; else print \"f\";", "t\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_logical_operators_yield_operands() {
        let tests = [
            ("print 1 or 2;", "1\n"),
            ("print nil or \"x\";", "x\n"),
            ("print 1 and 2;", "2\n"),
            ("print false and 1;", "false\n"),
            // short-circuit must not evaluate the right side
            (
                "fun boom() { print \"boom\"; return true; }\
                 print false and boom();\
                 print true or boom();",
                "false\ntrue\n",
            ),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_closure_counter() {
        test_statements(
            "fun mk() { var i = 0; fun c() { i = i + 1; print i; } return c; }\
             var c = mk(); c(); c(); c();",
            Some("1\n2\n3\n"),
            None,
        );
    }

    #[test]
    fn test_closure_captures_declaration_environment() {
        test_statements(
            "var a = \"global\";\
             {\
               fun showA() { print a; }\
               showA();\
               var a = \"block\";\
               showA();\
             }",
            Some("global\nglobal\n"),
            None,
        );
    }

    #[test]
    fn test_inheritance_and_super() {
        test_statements(
            "class A { say() { print \"A\"; } }\
             class B < A { say() { super.say(); print \"B\"; } }\
             B().say();",
            Some("A\nB\n"),
            None,
        );
    }

    #[test]
    fn test_super_uses_static_class_chain() {
        test_statements(
            "class A { m() { print \"A\"; } }\
             class B < A { m() { print \"B\"; } test() { super.m(); } }\
             class C < B {}\
             C().test();",
            Some("A\n"),
            None,
        );
    }

    #[test]
    fn test_initializer_returns_this() {
        test_statements(
            "class P { init(x) { this.x = x; } } print P(7).x;",
            Some("7\n"),
            None,
        );
        // an early bare return still yields the instance
        test_statements(
            "class P { init() { this.x = 1; return; this.x = 2; } } print P().x;",
            Some("1\n"),
            None,
        );
        // calling init through the instance also returns it
        test_statements(
            "class P { init() { this.x = 1; } }\
             var p = P();\
             print p.init() == p;",
            Some("true\n"),
            None,
        );
    }

    #[test]
    fn test_fields_and_methods() {
        test_statements(
            "class Box {\
               init(v) { this.v = v; }\
               get() { return this.v; }\
             }\
             var b = Box(3);\
             b.w = 10;\
             print b.get() + b.w;",
            Some("13\n"),
            None,
        );
    }

    #[test]
    fn test_for_loop_with_continue_runs_increment() {
        test_statements(
            "for (var i = 0; i < 4; i = i + 1) { if (i == 2) { continue; } print i; }",
            Some("0\n1\n3\n"),
            None,
        );
    }

    #[test]
    fn test_while_break() {
        test_statements(
            "var i = 0; while (true) { i = i + 1; if (i == 3) { break; } } print i;",
            Some("3\n"),
            None,
        );
    }

    #[test]
    fn test_nested_loop_break_is_local() {
        test_statements(
            "for (var i = 0; i < 2; i = i + 1) {\
               for (var j = 0; j < 5; j = j + 1) {\
                 if (j == 1) { break; }\
                 print i * 10 + j;\
               }\
             }",
            Some("0\n10\n"),
            None,
        );
    }

    #[test]
    fn test_exception_flow() {
        test_statements(
            "try { throw \"oops\"; } except (e) { print e; } finally { print \"done\"; }",
            Some("oops\ndone\n"),
            None,
        );
    }

    #[test]
    fn test_finally_runs_on_return() {
        test_statements(
            "fun f() { try { return 1; } finally { print \"fin\"; } } print f();",
            Some("fin\n1\n"),
            None,
        );
    }

    #[test]
    fn test_finally_exception_replaces_in_flight() {
        test_statements(
            "try { try { throw \"a\"; } finally { throw \"b\"; } } except (e) { print e; }",
            Some("b\n"),
            None,
        );
    }

    #[test]
    fn test_catch_rethrow() {
        test_statements(
            "try {\
               try { throw 1; } except (e) { throw e + 1; }\
             } except (e) { print e; }",
            Some("2\n"),
            None,
        );
    }

    #[test]
    fn test_uncaught_throw_is_a_runtime_error() {
        test_statements("throw \"oops\";", None, Some("Uncaught exception: oops."));
        // runtime errors are not catchable from the language
        test_statements(
            "try { print 1 / 0; } except (e) { print \"caught\"; }",
            None,
            Some("Division by zero."),
        );
    }

    #[test]
    fn test_memoized_fib() {
        test_statements(
            "var m = hash();\
             fun f(n) {\
               if (n < 2) return n;\
               if (m.has(n)) return m.get(n);\
               var r = f(n - 1) + f(n - 2);\
               m.set(n, r);\
               return r;\
             }\
             print f(20);",
            Some("6765\n"),
            None,
        );
    }

    #[test]
    fn test_lists() {
        let tests = [
            ("var l = [1, 2, 3]; print l[0];", "1\n"),
            ("var l = [1, 2, 3]; l[1] = 5; print l;", "[1, 5, 3]\n"),
            ("var l = [1, 2, 3]; l.append(4); print l.len();", "4\n"),
            ("var l = []; l.append(\"a\"); print l.pop();", "a\n"),
            ("var l = [1, 2]; var m = l; m.append(3); print l;", "[1, 2, 3]\n"),
            ("var l = [1, 2]; var m = l.copy(); m.append(3); print l;", "[1, 2]\n"),
            ("print [1, 2, 3].slice(1, 3);", "[2, 3]\n"),
            ("print [\"a\", \"b\"].join(\"-\");", "a-b\n"),
            ("var l = [1, 2, 3]; l.reverse(); print l;", "[3, 2, 1]\n"),
            ("print [1, 2].contains(2);", "true\n"),
            ("print len([1, 2, 3]);", "3\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_dicts() {
        let tests = [
            ("var d = {\"a\": 1}; print d[\"a\"];", "1\n"),
            ("var d = {\"a\": 1}; d[\"b\"] = 2; print d[\"b\"];", "2\n"),
            ("var d = {\"a\": 1, \"b\": 2}; print d.keys();", "[a, b]\n"),
            ("var d = {\"a\": 1, \"b\": 2}; print d.values();", "[1, 2]\n"),
            ("var d = {}; print d.has(\"x\");", "false\n"),
            ("var d = {1: \"one\"}; print d[1];", "one\n"),
            ("var d = {\"a\": 1}; print d.get(\"missing\");", "nil\n"),
            ("var d = {\"a\": 1, \"b\": 2}; print len(d);", "2\n"),
            ("var d = {\"b\": 1, \"a\": 2}; print d;", "{b: 1, a: 2}\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_strings() {
        let tests = [
            ("print \"abc\"[1];", "b\n"),
            ("print \"abc\".upper();", "ABC\n"),
            ("print \"A-B-C\".split(\"-\");", "[A, B, C]\n"),
            ("print \"hello\".len();", "5\n"),
            ("print len(\"hello\");", "5\n"),
            ("print \"hello\".replace(\"l\", \"L\");", "heLLo\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_lambda() {
        test_statements(
            "var f = lambda (x) { return x * 2; }; print f(21);",
            Some("42\n"),
            None,
        );
        test_statements(
            "fun twice(f, x) { return f(f(x)); }\
             print twice(lambda (n) { return n + 1; }, 0);",
            Some("2\n"),
            None,
        );
    }

    #[test]
    fn test_builtins() {
        let tests = [
            ("print min(3, 5) + max(3, 5);", "8\n"),
            ("print abs(-4.5);", "4.5\n"),
            ("print floor(2.7);", "2\n"),
            ("print ceil(2.1);", "3\n"),
            ("print round(2.5);", "3\n"),
            ("print int(\"42\") + 1;", "43\n"),
            ("print float(\"2.5\");", "2.5\n"),
            ("print str(42) + \"!\";", "42!\n"),
            ("print ord(\"A\");", "65\n"),
            ("print type(1);", "number\n"),
            ("print type(\"s\");", "string\n"),
            ("print type(nil);", "nil\n"),
            ("print type([]);", "list\n"),
            ("print type({});", "dict\n"),
            ("var a = array(); a.append(1); print a;", "[1]\n"),
            ("print type(clock());", "number\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_value_printing() {
        let tests = [
            ("print clock;", "<native fn clock>\n"),
            ("fun f() {} print f;", "<fn f>\n"),
            ("class A {} print A;", "<class A>\n"),
            ("class A {} print A();", "<A instance>\n"),
            ("print lambda (x) { return x; };", "<fn lambda>\n"),
            ("print [1, \"two\", nil, [3]];", "[1, two, nil, [3]]\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_reference_semantics_and_identity() {
        let tests = [
            ("print [1] == [1];", "false\n"),
            ("var a = [1]; var b = a; print a == b;", "true\n"),
            ("var d = {}; var e = {}; print d == e;", "false\n"),
            ("class A {} var a = A(); var b = a; print a == b;", "true\n"),
            ("class A {} print A() == A();", "false\n"),
        ];

        for (src, expected) in tests {
            test_statements(src, Some(expected), None);
        }
    }

    #[test]
    fn test_runtime_errors() {
        let tests = [
            ("print 1 / 0;", "Division by zero."),
            ("print 5 \\ 0;", "Division by zero."),
            ("print 5 % 0;", "Division by zero."),
            ("print \"a\" + 1;", "Operands must be two numbers or two strings."),
            ("print 1 < \"a\";", "Operands must be two numbers or two strings."),
            ("print -true;", "Operand must be a number."),
            ("print 1 - \"a\";", "Operands must be numbers."),
            ("1();", "Can only call functions and classes."),
            ("fun f(a) {} f(1, 2);", "Expected 1 arguments but got 2."),
            ("class A { init(x) {} } A();", "Expected 1 arguments but got 0."),
            ("print foo;", "Undefined variable 'foo'."),
            ("foo = 1;", "Undefined variable 'foo'."),
            ("var l = [1]; print l[3];", "List index out of range."),
            ("var l = [1]; print l[0.5];", "Index must be a non-negative integer."),
            ("var l = [1]; l[5] = 0;", "List index out of range."),
            ("var d = {}; print d[\"k\"];", "Undefined key 'k'."),
            ("var d = {}; d[[1]] = 1;", "Unhashable key of type 'list'."),
            ("class A {} print A().missing;", "Undefined property 'missing'."),
            ("print 1.x;", "Only instances have properties."),
            ("1.x = 2;", "Only instances have fields."),
            ("var A = 1; class B < A {}", "Superclass must be a class."),
            ("print true[0];", "Cannot index into boolean."),
            ("\"abc\"[0] = \"x\";", "Cannot assign into a string."),
            ("print [1, 2].nope();", "Undefined property 'nope'."),
            ("input(1, 2, 3);", "input() takes at most one argument."),
            ("len(1);", "Argument to len() must be a string, list, or dict, got number."),
        ];

        for (src, expected) in tests {
            test_statements(src, None, Some(expected));
        }
    }

    #[test]
    fn test_environment_restored_after_calls() {
        // the callee's locals must not leak into the caller's scope
        test_statements(
            "var x = \"outer\";\
             fun f() { var x = \"inner\"; }\
             f();\
             print x;",
            Some("outer\n"),
            None,
        );
    }

    #[test]
    fn test_import_missing_module() {
        test_statements(
            "import \"no/such/module.lox\";",
            None,
            Some("Cannot read module 'no/such/module.lox'."),
        );
    }

    #[test]
    fn test_import_executes_into_globals() {
        let dir = std::env::temp_dir().join("lox-import-test");
        std::fs::create_dir_all(&dir).unwrap();
        let module = dir.join("mod_a.lox");
        std::fs::write(&module, "var imported = 41;\nfun bump(n) { return n + 1; }\n").unwrap();

        let src = format!(
            "import \"{}\";\nprint bump(imported);\nimport \"{}\";",
            module.display(),
            module.display()
        );
        test_statements(&src, Some("42\n"), None);
    }

    #[test]
    fn test_import_cycle_detected() {
        let dir = std::env::temp_dir().join("lox-import-cycle");
        std::fs::create_dir_all(&dir).unwrap();
        let first = dir.join("first.lox");
        let second = dir.join("second.lox");
        std::fs::write(&first, format!("import \"{}\";\n", second.display())).unwrap();
        std::fs::write(&second, format!("import \"{}\";\n", first.display())).unwrap();

        // the error is raised by the innermost import and propagates out
        let src = format!("import \"{}\";", first.display());
        let expected = format!("Circular import '{}'.", first.display());
        test_statements(&src, None, Some(&expected));
    }

    #[test]
    fn test_repl_echo_of_last_expression() {
        let tokens = Scanner::new("1 + 2;").scan_tokens().unwrap();
        let parsed = Parser::new(&tokens).parse().unwrap();

        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        let mut resolver = Resolver::new(&mut interpreter);
        let resolved = resolver.resolve(parsed).unwrap();

        assert_eq!(interpreter.interpret(&resolved), Ok(Some(String::from("3"))));
    }
}
