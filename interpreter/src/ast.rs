use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use lox_core::{Literal, Token};

// Statements and expressions are cloned freely during parsing; function and
// lambda bodies sit behind an Rc so closures share them instead of copying.

/// Identity of a variable-referencing expression. The resolver keys its
/// distance map on this. Ids come from a process-wide counter so nodes from
/// imported files never collide with the importing program's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ExprId(u64);

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(0);

impl ExprId {
    pub(crate) fn next() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Assign {
        name: Token,
        id: ExprId,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        bracket: Token,
        key: Box<Expr>,
    },
    IndexSet {
        object: Box<Expr>,
        bracket: Token,
        key: Box<Expr>,
        value: Box<Expr>,
    },
    Grouping {
        expression: Box<Expr>,
    },
    Literal {
        value: Literal,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
        id: ExprId,
    },
    This {
        keyword: Token,
        id: ExprId,
    },
    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },
    Lambda {
        keyword: Token,
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
    },
    List {
        bracket: Token,
        elements: Vec<Expr>,
    },
    Dict {
        brace: Token,
        entries: Vec<(Expr, Expr)>,
    },
}

pub(crate) trait ExprVisitor {
    type Item;
    type Error;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Item, Self::Error> {
        match expr {
            Expr::Assign { name, id, value } => self.visit_assign(name, *id, value),
            Expr::Binary {
                left,
                operator,
                right,
            } => self.visit_binary(left, operator, right),
            Expr::Call {
                callee,
                paren,
                args,
            } => self.visit_call(callee, paren, args),
            Expr::Get { object, name } => self.visit_get(object, name),
            Expr::Set {
                object,
                name,
                value,
            } => self.visit_set(object, name, value),
            Expr::Index {
                object,
                bracket,
                key,
            } => self.visit_index(object, bracket, key),
            Expr::IndexSet {
                object,
                bracket,
                key,
                value,
            } => self.visit_index_set(object, bracket, key, value),
            Expr::Grouping { expression } => self.visit_grouping(expression),
            Expr::Literal { value } => self.visit_literal(value),
            Expr::Logical {
                left,
                operator,
                right,
            } => self.visit_logical(left, operator, right),
            Expr::Unary { operator, right } => self.visit_unary(operator, right),
            Expr::Variable { name, id } => self.visit_variable(name, *id),
            Expr::This { keyword, id } => self.visit_this(keyword, *id),
            Expr::Super {
                keyword,
                method,
                id,
            } => self.visit_super(keyword, method, *id),
            Expr::Lambda {
                keyword,
                params,
                body,
            } => self.visit_lambda(keyword, params, body),
            Expr::List { bracket, elements } => self.visit_list(bracket, elements),
            Expr::Dict { brace, entries } => self.visit_dict(brace, entries),
        }
    }

    fn visit_assign(
        &mut self,
        name: &Token,
        id: ExprId,
        value: &Expr,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        args: &[Expr],
    ) -> Result<Self::Item, Self::Error>;
    fn visit_get(&mut self, object: &Expr, name: &Token) -> Result<Self::Item, Self::Error>;
    fn visit_set(
        &mut self,
        object: &Expr,
        name: &Token,
        value: &Expr,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_index(
        &mut self,
        object: &Expr,
        bracket: &Token,
        key: &Expr,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_index_set(
        &mut self,
        object: &Expr,
        bracket: &Token,
        key: &Expr,
        value: &Expr,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_grouping(&mut self, expression: &Expr) -> Result<Self::Item, Self::Error>;
    fn visit_literal(&mut self, value: &Literal) -> Result<Self::Item, Self::Error>;
    fn visit_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<Self::Item, Self::Error>;
    fn visit_variable(&mut self, name: &Token, id: ExprId) -> Result<Self::Item, Self::Error>;
    fn visit_this(&mut self, keyword: &Token, id: ExprId) -> Result<Self::Item, Self::Error>;
    fn visit_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        id: ExprId,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_lambda(
        &mut self,
        keyword: &Token,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_list(&mut self, bracket: &Token, elements: &[Expr]) -> Result<Self::Item, Self::Error>;
    fn visit_dict(
        &mut self,
        brace: &Token,
        entries: &[(Expr, Expr)],
    ) -> Result<Self::Item, Self::Error>;
}

#[derive(Debug, Clone)]
pub(crate) struct ExceptClause {
    pub(crate) name: Token,
    pub(crate) body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub(crate) enum Stmt {
    Block {
        statements: Vec<Stmt>,
    },
    Expression {
        expression: Expr,
    },
    Function {
        name: Token,
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
    },
    Class {
        name: Token,
        superclass: Option<Expr>, // always a Variable
        methods: Vec<Stmt>,       // always Functions
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        // A while produced by desugaring `for` keeps its increment so that
        // `continue` can still evaluate it before the next condition test.
        is_for: bool,
        increment: Option<Expr>,
    },
    Print {
        expression: Expr,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Break {
        keyword: Token,
    },
    Continue {
        keyword: Token,
    },
    Throw {
        keyword: Token,
        value: Expr,
    },
    Try {
        try_block: Vec<Stmt>,
        except: Option<ExceptClause>,
        finally: Option<Vec<Stmt>>,
    },
    Import {
        keyword: Token,
        path: Token,
    },
    Var {
        name: Token,
        init: Option<Expr>,
    },
}

pub(crate) trait StmtVisitor {
    type Item;
    type Error;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<Self::Item, Self::Error> {
        match stmt {
            Stmt::Block { statements } => self.visit_block(statements),
            Stmt::Expression { expression } => self.visit_expression(expression),
            Stmt::Function { name, params, body } => self.visit_function(name, params, body),
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.visit_class(name, superclass.as_ref(), methods),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.visit_if(condition, then_branch, else_branch.as_deref()),
            Stmt::While {
                condition,
                body,
                is_for,
                increment,
            } => self.visit_while(condition, body, *is_for, increment.as_ref()),
            Stmt::Print { expression } => self.visit_print(expression),
            Stmt::Return { keyword, value } => self.visit_return(keyword, value.as_ref()),
            Stmt::Break { keyword } => self.visit_break(keyword),
            Stmt::Continue { keyword } => self.visit_continue(keyword),
            Stmt::Throw { keyword, value } => self.visit_throw(keyword, value),
            Stmt::Try {
                try_block,
                except,
                finally,
            } => self.visit_try(try_block, except.as_ref(), finally.as_deref()),
            Stmt::Import { keyword, path } => self.visit_import(keyword, path),
            Stmt::Var { name, init } => self.visit_var(name, init.as_ref()),
        }
    }

    fn visit_block(&mut self, statements: &[Stmt]) -> Result<Self::Item, Self::Error>;
    fn visit_expression(&mut self, expression: &Expr) -> Result<Self::Item, Self::Error>;
    fn visit_function(
        &mut self,
        name: &Token,
        params: &[Token],
        body: &Rc<Vec<Stmt>>,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
    ) -> Result<Self::Item, Self::Error>;
    fn visit_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        is_for: bool,
        increment: Option<&Expr>,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_print(&mut self, expression: &Expr) -> Result<Self::Item, Self::Error>;
    fn visit_return(
        &mut self,
        keyword: &Token,
        value: Option<&Expr>,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_break(&mut self, keyword: &Token) -> Result<Self::Item, Self::Error>;
    fn visit_continue(&mut self, keyword: &Token) -> Result<Self::Item, Self::Error>;
    fn visit_throw(&mut self, keyword: &Token, value: &Expr) -> Result<Self::Item, Self::Error>;
    fn visit_try(
        &mut self,
        try_block: &[Stmt],
        except: Option<&ExceptClause>,
        finally: Option<&[Stmt]>,
    ) -> Result<Self::Item, Self::Error>;
    fn visit_import(&mut self, keyword: &Token, path: &Token) -> Result<Self::Item, Self::Error>;
    fn visit_var(
        &mut self,
        name: &Token,
        init: Option<&Expr>,
    ) -> Result<Self::Item, Self::Error>;
}
