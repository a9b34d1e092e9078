use std::collections::HashMap;
use std::rc::Rc;

use lox_core::{Error, Literal, Token};

use crate::ast::{ExceptClause, Expr, ExprId, ExprVisitor, Stmt, StmtVisitor};
use crate::interpreter::Interpreter;
use crate::parser::StmtStream;

enum State {
    Declared,
    Defined,
}

#[derive(Copy, Clone)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
    Lambda,
}

#[derive(Copy, Clone)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Copy, Clone)]
enum LoopType {
    None,
    Loop,
}

/// Walks the tree once between parsing and evaluation, recording the scope
/// distance of every local reference into the interpreter and checking the
/// static rules. All violations are collected so a single pass reports
/// everything; the scope stack is kept balanced throughout.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<String, State>>,
    interpreter: &'a mut Interpreter,
    current_fun: FunctionType,
    current_cls: ClassType,
    current_loop: LoopType,
    errors: Vec<Error>,
}

pub struct ResolvedStmts(pub(crate) Vec<Stmt>);

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Resolver {
            scopes: Vec::new(),
            interpreter,
            current_fun: FunctionType::None,
            current_cls: ClassType::None,
            current_loop: LoopType::None,
            errors: Vec::new(),
        }
    }

    pub fn resolve(&mut self, stmts: StmtStream) -> Result<ResolvedStmts, Vec<Error>> {
        self.resolve_stmts(&stmts.0);
        if self.errors.is_empty() {
            Ok(ResolvedStmts(stmts.0))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            let _ = self.visit_stmt(stmt);
        }
    }

    fn error(&mut self, token: &Token, msg: &str) {
        self.errors.push(Error::resolution(token, msg));
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, token: &Token) {
        let duplicate = match self.scopes.last() {
            Some(scope) => scope.contains_key(&token.lexeme),
            None => return,
        };

        if duplicate {
            self.error(token, "Already a variable with this name in this scope.");
        } else if let Some(last) = self.scopes.last_mut() {
            last.insert(token.lexeme.clone(), State::Declared);
        }
    }

    fn define(&mut self, token: &Token) {
        if let Some(last) = self.scopes.last_mut() {
            last.insert(token.lexeme.clone(), State::Defined);
        }
    }

    fn resolve_local(&mut self, id: ExprId, token: &Token) {
        for i in (0..self.scopes.len()).rev() {
            if self.scopes[i].contains_key(&token.lexeme) {
                self.interpreter.resolve(id, self.scopes.len() - 1 - i);
                return;
            }
        }
        // Not found in any local scope: a global, looked up by name at
        // runtime.
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], ty: FunctionType) {
        let enclosing_fun = self.current_fun;
        let enclosing_loop = self.current_loop;
        self.current_fun = ty;
        // A loop outside a function body does not license `break` inside it.
        self.current_loop = LoopType::None;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(body);
        self.end_scope();

        self.current_fun = enclosing_fun;
        self.current_loop = enclosing_loop;
    }
}

impl<'a> StmtVisitor for Resolver<'a> {
    type Item = ();
    type Error = ();

    fn visit_block(&mut self, statements: &[Stmt]) -> Result<(), ()> {
        self.begin_scope();
        self.resolve_stmts(statements);
        self.end_scope();
        Ok(())
    }

    fn visit_expression(&mut self, expression: &Expr) -> Result<(), ()> {
        self.visit_expr(expression)
    }

    fn visit_function(
        &mut self,
        name: &Token,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> Result<(), ()> {
        self.declare(name);
        self.define(name);
        self.resolve_function(params, body, FunctionType::Function);
        Ok(())
    }

    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
    ) -> Result<(), ()> {
        let enclosing = self.current_cls;
        self.current_cls = ClassType::Class;
        self.declare(name);
        self.define(name);

        if let Some(expr) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = expr
            {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.current_cls = ClassType::Subclass;
            let _ = self.visit_expr(expr);
            self.begin_scope();
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(String::from("super"), State::Defined);
            }
        }

        self.begin_scope();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(String::from("this"), State::Defined);
        }

        for method in methods {
            if let Stmt::Function { name, params, body } = method {
                let ty = if name.lexeme == "init" {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };
                self.resolve_function(params, body, ty);
            } else {
                panic!(
                    "Unexpected statement '{:?}' found in class body, expecting a method.",
                    method
                )
            }
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_cls = enclosing;
        Ok(())
    }

    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), ()> {
        self.visit_expr(condition)?;
        self.visit_stmt(then_branch)?;
        if let Some(else_branch) = else_branch {
            self.visit_stmt(else_branch)?;
        }
        Ok(())
    }

    fn visit_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        _is_for: bool,
        _increment: Option<&Expr>,
    ) -> Result<(), ()> {
        // The retained increment is an alias of the last body statement and
        // must not be resolved again from this position.
        let enclosing = self.current_loop;
        self.current_loop = LoopType::Loop;
        self.visit_expr(condition)?;
        self.visit_stmt(body)?;
        self.current_loop = enclosing;
        Ok(())
    }

    fn visit_print(&mut self, expression: &Expr) -> Result<(), ()> {
        self.visit_expr(expression)
    }

    fn visit_return(&mut self, keyword: &Token, value: Option<&Expr>) -> Result<(), ()> {
        if let FunctionType::None = self.current_fun {
            self.error(keyword, "Can't return from top-level code.");
        }

        if let Some(value) = value {
            if let FunctionType::Initializer = self.current_fun {
                self.error(keyword, "Can't return a value from an initializer.");
            }
            self.visit_expr(value)?;
        }
        Ok(())
    }

    fn visit_break(&mut self, keyword: &Token) -> Result<(), ()> {
        if let LoopType::None = self.current_loop {
            self.error(keyword, "Can't use 'break' outside of a loop.");
        }
        Ok(())
    }

    fn visit_continue(&mut self, keyword: &Token) -> Result<(), ()> {
        if let LoopType::None = self.current_loop {
            self.error(keyword, "Can't use 'continue' outside of a loop.");
        }
        Ok(())
    }

    fn visit_throw(&mut self, _keyword: &Token, value: &Expr) -> Result<(), ()> {
        self.visit_expr(value)
    }

    fn visit_try(
        &mut self,
        try_block: &[Stmt],
        except: Option<&ExceptClause>,
        finally: Option<&[Stmt]>,
    ) -> Result<(), ()> {
        self.visit_block(try_block)?;

        if let Some(clause) = except {
            // The caught value lives in the handler's own scope.
            self.begin_scope();
            self.declare(&clause.name);
            self.define(&clause.name);
            self.resolve_stmts(&clause.body);
            self.end_scope();
        }

        if let Some(finally) = finally {
            self.visit_block(finally)?;
        }
        Ok(())
    }

    fn visit_import(&mut self, _keyword: &Token, _path: &Token) -> Result<(), ()> {
        // Module contents are resolved when the import executes.
        Ok(())
    }

    fn visit_var(&mut self, name: &Token, init: Option<&Expr>) -> Result<(), ()> {
        self.declare(name);
        if let Some(init) = init {
            self.visit_expr(init)?;
        }
        self.define(name);
        Ok(())
    }
}

impl<'a> ExprVisitor for Resolver<'a> {
    type Item = ();
    type Error = ();

    fn visit_assign(&mut self, name: &Token, id: ExprId, value: &Expr) -> Result<(), ()> {
        self.visit_expr(value)?;
        self.resolve_local(id, name);
        Ok(())
    }

    fn visit_binary(&mut self, left: &Expr, _: &Token, right: &Expr) -> Result<(), ()> {
        self.visit_expr(left)?;
        self.visit_expr(right)
    }

    fn visit_call(&mut self, callee: &Expr, _: &Token, args: &[Expr]) -> Result<(), ()> {
        self.visit_expr(callee)?;
        for arg in args {
            self.visit_expr(arg)?;
        }
        Ok(())
    }

    fn visit_get(&mut self, object: &Expr, _: &Token) -> Result<(), ()> {
        self.visit_expr(object)
    }

    fn visit_set(&mut self, object: &Expr, _: &Token, value: &Expr) -> Result<(), ()> {
        self.visit_expr(value)?;
        self.visit_expr(object)
    }

    fn visit_index(&mut self, object: &Expr, _: &Token, key: &Expr) -> Result<(), ()> {
        self.visit_expr(object)?;
        self.visit_expr(key)
    }

    fn visit_index_set(
        &mut self,
        object: &Expr,
        _: &Token,
        key: &Expr,
        value: &Expr,
    ) -> Result<(), ()> {
        self.visit_expr(object)?;
        self.visit_expr(key)?;
        self.visit_expr(value)
    }

    fn visit_grouping(&mut self, expression: &Expr) -> Result<(), ()> {
        self.visit_expr(expression)
    }

    fn visit_literal(&mut self, _value: &Literal) -> Result<(), ()> {
        Ok(())
    }

    fn visit_logical(&mut self, left: &Expr, _: &Token, right: &Expr) -> Result<(), ()> {
        self.visit_expr(left)?;
        self.visit_expr(right)
    }

    fn visit_unary(&mut self, _: &Token, right: &Expr) -> Result<(), ()> {
        self.visit_expr(right)
    }

    fn visit_variable(&mut self, name: &Token, id: ExprId) -> Result<(), ()> {
        if let Some(last) = self.scopes.last() {
            if let Some(State::Declared) = last.get(&name.lexeme) {
                self.error(name, "Can't read local variable in its own initializer.");
            }
        }

        self.resolve_local(id, name);
        Ok(())
    }

    fn visit_this(&mut self, keyword: &Token, id: ExprId) -> Result<(), ()> {
        if let ClassType::None = self.current_cls {
            self.error(keyword, "Can't use 'this' outside of a class.");
            return Ok(());
        }

        self.resolve_local(id, keyword);
        Ok(())
    }

    fn visit_super(&mut self, keyword: &Token, _method: &Token, id: ExprId) -> Result<(), ()> {
        match self.current_cls {
            ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
            ClassType::Class => {
                self.error(keyword, "Can't use 'super' in a class with no superclass.")
            }
            ClassType::Subclass => self.resolve_local(id, keyword),
        }
        Ok(())
    }

    fn visit_lambda(
        &mut self,
        _keyword: &Token,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> Result<(), ()> {
        self.resolve_function(params, body, FunctionType::Lambda);
        Ok(())
    }

    fn visit_list(&mut self, _: &Token, elements: &[Expr]) -> Result<(), ()> {
        for element in elements {
            self.visit_expr(element)?;
        }
        Ok(())
    }

    fn visit_dict(&mut self, _: &Token, entries: &[(Expr, Expr)]) -> Result<(), ()> {
        for (key, value) in entries {
            self.visit_expr(key)?;
            self.visit_expr(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use lox_core::Scanner;

    use crate::interpreter::Interpreter;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn resolve_errs(src: &str) -> Vec<String> {
        let tokens = Scanner::new(src).scan_tokens().unwrap();
        let parsed = Parser::new(&tokens).parse().unwrap();

        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(output);
        let mut resolver = Resolver::new(&mut interpreter);
        match resolver.resolve(parsed) {
            Ok(_) => Vec::new(),
            Err(errs) => errs.iter().map(|e| String::from(e.message())).collect(),
        }
    }

    #[test]
    fn test_valid_programs_resolve() {
        let sources = [
            "fun f() { return; }",
            "class A { init() { this.x = 1; return; } }",
            "while (true) { break; }",
            "for (var i = 0; i < 3; i = i + 1) { continue; }",
            "var f = lambda (x) { return x; };",
            "var a = a;", // globals may be self-referential; checked at runtime
        ];

        for src in sources {
            let errs = resolve_errs(src);
            assert!(errs.is_empty(), "source: {} errors: {:?}", src, errs);
        }
    }

    #[test]
    fn test_read_in_own_initializer() {
        // `var a = a` inside a block reads the block-local `a`
        assert_eq!(
            resolve_errs("var a = 1; { var a = a; }"),
            vec!["Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(resolve_errs("return 1;"), vec!["Can't return from top-level code."]);
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            resolve_errs("class A { init() { return 1; } }"),
            vec!["Can't return a value from an initializer."]
        );
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve_errs("print this;"),
            vec!["Can't use 'this' outside of a class."]
        );
    }

    #[test]
    fn test_super_misuse() {
        assert_eq!(
            resolve_errs("print super.x;"),
            vec!["Can't use 'super' outside of a class."]
        );
        assert_eq!(
            resolve_errs("class A { f() { super.f(); } }"),
            vec!["Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_self_inheritance() {
        assert_eq!(
            resolve_errs("class A < A {}"),
            vec!["A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_duplicate_local() {
        assert_eq!(
            resolve_errs("{ var a = 1; var a = 2; }"),
            vec!["Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            resolve_errs("break;"),
            vec!["Can't use 'break' outside of a loop."]
        );
        assert_eq!(
            resolve_errs("continue;"),
            vec!["Can't use 'continue' outside of a loop."]
        );
        // a function body does not inherit the enclosing loop
        assert_eq!(
            resolve_errs("while (true) { fun f() { break; } }"),
            vec!["Can't use 'break' outside of a loop."]
        );
    }

    #[test]
    fn test_errors_are_collected() {
        let errs = resolve_errs("return 1; break; print this;");
        assert_eq!(errs.len(), 3);
    }
}
