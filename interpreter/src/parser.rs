use std::rc::Rc;

use lox_core::{Error, Literal, Token, Type};

use crate::ast::{ExceptClause, Expr, ExprId, Stmt};

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    errors: Vec<Error>,
}

// A wrapper over the statement vector so `Stmt` stays private to the crate
#[derive(Debug)]
pub struct StmtStream(pub(crate) Vec<Stmt>);

type StmtResult = Result<Stmt, Error>;
type ExprResult = Result<Expr, Error>;

#[derive(Debug, Clone, Copy)]
enum FunctionKind {
    Function,
    Method,
}

impl FunctionKind {
    fn describe(self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
        }
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<StmtStream, Vec<Error>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => self.errors.push(err),
            }
        }

        if self.errors.is_empty() {
            Ok(StmtStream(statements))
        } else {
            Err(self.errors)
        }
    }

    fn declaration(&mut self) -> StmtResult {
        let res = if self.match_one(Type::Class) {
            self.class_declaration()
        } else if self.match_one(Type::Fun) {
            self.function(FunctionKind::Function)
        } else if self.match_one(Type::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        if res.is_err() {
            self.synchronize();
        }

        res
    }

    fn class_declaration(&mut self) -> StmtResult {
        let name = self.consume(Type::Identifier, "Expect class name.")?.clone();

        let mut superclass = None;
        if self.match_one(Type::Less) {
            self.consume(Type::Identifier, "Expect superclass name.")?;
            superclass = Some(Expr::Variable {
                name: self.previous().clone(),
                id: ExprId::next(),
            });
        }

        self.consume(Type::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            methods.push(self.function(FunctionKind::Method)?);
        }
        self.consume(Type::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: FunctionKind) -> StmtResult {
        let name = self
            .consume(Type::Identifier, &format!("Expect {} name.", kind.describe()))?
            .clone();
        self.consume(
            Type::LeftParen,
            &format!("Expect '(' after {} name.", kind.describe()),
        )?;
        let params = self.parameters()?;
        self.consume(
            Type::LeftBrace,
            &format!("Expect '{{' before {} body.", kind.describe()),
        )?;
        let body = self.block()?;

        Ok(Stmt::Function {
            name,
            params,
            body: Rc::new(body),
        })
    }

    // Parses the parameter list including the closing paren. Exceeding the
    // limit is reported but does not abort the parse.
    fn parameters(&mut self) -> Result<Vec<Token>, Error> {
        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= 255 {
                    let err = Error::parse(self.peek(), "Can't have more than 255 parameters.");
                    self.errors.push(err);
                }

                params.push(
                    self.consume(Type::Identifier, "Expect parameter name.")?
                        .clone(),
                );
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightParen, "Expect ')' after parameters.")?;
        Ok(params)
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self
            .consume(Type::Identifier, "Expect variable name.")?
            .clone();
        let mut init = None;
        if self.match_one(Type::Equal) {
            init = Some(self.expression()?);
        }

        self.consume(Type::SemiColon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, init })
    }

    fn statement(&mut self) -> StmtResult {
        if self.match_one(Type::If) {
            self.if_statement()
        } else if self.match_one(Type::Print) {
            self.print_statement()
        } else if self.match_one(Type::Return) {
            self.return_statement()
        } else if self.match_one(Type::While) {
            self.while_statement()
        } else if self.match_one(Type::For) {
            self.for_statement()
        } else if self.match_one(Type::Break) {
            let keyword = self.previous().clone();
            self.consume(Type::SemiColon, "Expect ';' after 'break'.")?;
            Ok(Stmt::Break { keyword })
        } else if self.match_one(Type::Continue) {
            let keyword = self.previous().clone();
            self.consume(Type::SemiColon, "Expect ';' after 'continue'.")?;
            Ok(Stmt::Continue { keyword })
        } else if self.match_one(Type::Throw) {
            self.throw_statement()
        } else if self.match_one(Type::Try) {
            self.try_statement()
        } else if self.match_one(Type::Import) {
            self.import_statement()
        } else if self.match_one(Type::LeftBrace) {
            Ok(Stmt::Block {
                statements: self.block()?,
            })
        } else {
            self.expression_statement()
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut stmts = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            stmts.push(self.declaration()?);
        }
        self.consume(Type::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expression: expr })
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let mut else_branch = None;
        if self.match_one(Type::Else) {
            else_branch = Some(Box::new(self.statement()?));
        }

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after while condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While {
            condition,
            body,
            is_for: false,
            increment: None,
        })
    }

    // `for (init; cond; incr) body` desugars into
    // `{ init; while (cond) { body; incr; } }`. The increment is also kept
    // on the While node itself; `continue` needs it (see the interpreter).
    fn for_statement(&mut self) -> StmtResult {
        self.consume(Type::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_one(Type::SemiColon) {
            None
        } else if self.match_one(Type::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(Type::SemiColon) {
            self.expression()?
        } else {
            Expr::Literal {
                value: Literal::Bool(true),
            }
        };
        self.consume(Type::SemiColon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(Type::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(Type::RightParen, "Expect ')' after for clauses.")?;

        let body = self.statement()?;
        let while_body = match &increment {
            Some(inc) => Stmt::Block {
                statements: vec![
                    body,
                    Stmt::Expression {
                        expression: inc.clone(),
                    },
                ],
            },
            None => body,
        };

        let while_stmt = Stmt::While {
            condition,
            body: Box::new(while_body),
            is_for: true,
            increment,
        };

        Ok(match initializer {
            Some(init) => Stmt::Block {
                statements: vec![init, while_stmt],
            },
            None => while_stmt,
        })
    }

    fn print_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expression: expr })
    }

    fn return_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let mut value = None;
        if !self.check(Type::SemiColon) {
            value = Some(self.expression()?);
        }

        self.consume(Type::SemiColon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn throw_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let value = self.expression()?;
        self.consume(Type::SemiColon, "Expect ';' after thrown value.")?;
        Ok(Stmt::Throw { keyword, value })
    }

    fn try_statement(&mut self) -> StmtResult {
        let try_token = self.previous().clone();
        self.consume(Type::LeftBrace, "Expect '{' after 'try'.")?;
        let try_block = self.block()?;

        let mut except = None;
        if self.match_one(Type::Except) {
            self.consume(Type::LeftParen, "Expect '(' after 'except'.")?;
            let name = self
                .consume(Type::Identifier, "Expect exception variable name.")?
                .clone();
            self.consume(Type::RightParen, "Expect ')' after exception variable.")?;
            self.consume(Type::LeftBrace, "Expect '{' before except body.")?;
            let body = self.block()?;
            except = Some(ExceptClause { name, body });
        }

        let mut finally = None;
        if self.match_one(Type::Finally) {
            self.consume(Type::LeftBrace, "Expect '{' before finally body.")?;
            finally = Some(self.block()?);
        }

        if except.is_none() && finally.is_none() {
            return Err(Error::parse(
                &try_token,
                "Expect 'except' or 'finally' after try block.",
            ));
        }

        Ok(Stmt::Try {
            try_block,
            except,
            finally,
        })
    }

    fn import_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        let path = self
            .consume(Type::String, "Expect module path string after 'import'.")?
            .clone();
        self.consume(Type::SemiColon, "Expect ';' after module path.")?;
        Ok(Stmt::Import { keyword, path })
    }

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.or_expression()?;
        if self.match_one(Type::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            match expr {
                Expr::Variable { name, id } => Ok(Expr::Assign { name, id, value }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                Expr::Index {
                    object,
                    bracket,
                    key,
                } => Ok(Expr::IndexSet {
                    object,
                    bracket,
                    key,
                    value,
                }),
                _ => Err(Error::parse(&equals, "Invalid assignment target.")),
            }
        } else {
            Ok(expr)
        }
    }

    fn or_expression(&mut self) -> ExprResult {
        let mut expr = self.and_expression()?;
        while self.match_one(Type::Or) {
            let operator = self.previous().clone();
            let right = self.and_expression()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> ExprResult {
        let mut expr = self.equality()?;
        while self.match_one(Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;
        while self.match_either(&[Type::BangEqual, Type::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while self.match_either(&[
            Type::Greater,
            Type::GreaterEqual,
            Type::Less,
            Type::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;
        while self.match_either(&[Type::Plus, Type::Minus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        while self.match_either(&[
            Type::Star,
            Type::Slash,
            Type::BackSlash,
            Type::Percent,
            Type::Caret,
        ]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_either(&[Type::Bang, Type::Minus]) {
            Ok(Expr::Unary {
                operator: self.previous().clone(),
                right: Box::new(self.unary()?),
            })
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        loop {
            if self.match_one(Type::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_one(Type::Dot) {
                let name = self
                    .consume(Type::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.match_one(Type::LeftBracket) {
                let bracket = self.previous().clone();
                let key = self.expression()?;
                self.consume(Type::RightBracket, "Expect ']' after index.")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    bracket,
                    key: Box::new(key),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut args: Vec<Expr> = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if args.len() >= 255 {
                    let err = Error::parse(self.peek(), "Can't have more than 255 arguments.");
                    self.errors.push(err);
                }

                args.push(self.expression()?);
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }

        let paren = self
            .consume(Type::RightParen, "Expect ')' after arguments.")?
            .clone();
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    fn primary(&mut self) -> ExprResult {
        if self.match_either(&[Type::True, Type::False, Type::Number, Type::String]) {
            Ok(Expr::Literal {
                value: self.previous().value.clone(),
            })
        } else if self.match_one(Type::Nil) {
            Ok(Expr::Literal {
                value: Literal::Nil,
            })
        } else if self.match_one(Type::LeftParen) {
            let expr = self.expression()?;
            self.consume(Type::RightParen, "Expect ')' after expression.")?;
            Ok(Expr::Grouping {
                expression: Box::new(expr),
            })
        } else if self.match_one(Type::Identifier) {
            Ok(Expr::Variable {
                name: self.previous().clone(),
                id: ExprId::next(),
            })
        } else if self.match_one(Type::This) {
            Ok(Expr::This {
                keyword: self.previous().clone(),
                id: ExprId::next(),
            })
        } else if self.match_one(Type::Super) {
            let keyword = self.previous().clone();
            self.consume(Type::Dot, "Expect '.' after 'super'.")?;
            let method = self
                .consume(Type::Identifier, "Expect superclass method name.")?
                .clone();
            Ok(Expr::Super {
                keyword,
                method,
                id: ExprId::next(),
            })
        } else if self.match_one(Type::Lambda) {
            self.lambda()
        } else if self.match_one(Type::LeftBracket) {
            self.list()
        } else if self.match_one(Type::LeftBrace) {
            self.dict()
        } else {
            Err(Error::parse(self.peek(), "Expect expression."))
        }
    }

    fn lambda(&mut self) -> ExprResult {
        let keyword = self.previous().clone();
        self.consume(Type::LeftParen, "Expect '(' after 'lambda'.")?;
        let params = self.parameters()?;
        self.consume(Type::LeftBrace, "Expect '{' before lambda body.")?;
        let body = self.block()?;

        Ok(Expr::Lambda {
            keyword,
            params,
            body: Rc::new(body),
        })
    }

    fn list(&mut self) -> ExprResult {
        let bracket = self.previous().clone();
        let mut elements = Vec::new();
        if !self.check(Type::RightBracket) {
            loop {
                elements.push(self.expression()?);
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }
        self.consume(Type::RightBracket, "Expect ']' after list elements.")?;

        Ok(Expr::List { bracket, elements })
    }

    fn dict(&mut self) -> ExprResult {
        let brace = self.previous().clone();
        let mut entries = Vec::new();
        if !self.check(Type::RightBrace) {
            loop {
                let key = self.expression()?;
                self.consume(Type::Colon, "Expect ':' after dict key.")?;
                let value = self.expression()?;
                entries.push((key, value));
                if !self.match_one(Type::Comma) {
                    break;
                }
            }
        }
        self.consume(Type::RightBrace, "Expect '}' after dict entries.")?;

        Ok(Expr::Dict { brace, entries })
    }

    fn is_at_end(&self) -> bool {
        self.peek().ty == Type::Eof
    }

    fn check(&self, ty: Type) -> bool {
        !self.is_at_end() && self.peek().ty == ty
    }

    fn consume(&mut self, ty: Type, msg: &str) -> Result<&Token, Error> {
        if self.check(ty) {
            Ok(self.advance())
        } else {
            Err(Error::parse(self.peek(), msg))
        }
    }

    // Panic-mode recovery: skip to the next statement boundary so one
    // mistake doesn't drown the rest of the file in noise.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().ty == Type::SemiColon {
                return;
            }

            match self.peek().ty {
                Type::Class
                | Type::Fun
                | Type::Var
                | Type::For
                | Type::If
                | Type::While
                | Type::Print
                | Type::Return
                | Type::Throw => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn match_either(&mut self, types: &[Type]) -> bool {
        for ty in types {
            if self.match_one(*ty) {
                return true;
            }
        }

        false
    }

    fn match_one(&mut self, ty: Type) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use lox_core::{Literal, Scanner, Token, Type};

    use crate::ast::{Expr, Stmt};
    use crate::parser::Parser;

    fn parse(src: &str) -> Vec<Stmt> {
        let tokens = Scanner::new(src).scan_tokens().unwrap();
        Parser::new(&tokens).parse().unwrap().0
    }

    fn parse_errs(src: &str) -> Vec<lox_core::Error> {
        let tokens = Scanner::new(src).scan_tokens().unwrap();
        Parser::new(&tokens).parse().unwrap_err()
    }

    #[test]
    fn test_precedence() {
        // `1 + 2 * 3;` parses the multiplication as the right operand
        let stmts = parse("1 + 2 * 3;");
        let Stmt::Expression {
            expression: Expr::Binary { left, operator, right },
        } = &stmts[0]
        else {
            panic!("expected binary expression statement");
        };

        assert_eq!(operator.ty, Type::Plus);
        assert!(matches!(**left, Expr::Literal { value: Literal::Num(n) } if n == 1.0));
        assert!(
            matches!(&**right, Expr::Binary { operator: Token { ty: Type::Star, .. }, .. })
        );
    }

    #[test]
    fn test_left_associativity() {
        // `4 - 2 - 1;` groups as `(4 - 2) - 1`
        let stmts = parse("4 - 2 - 1;");
        let Stmt::Expression {
            expression: Expr::Binary { left, right, .. },
        } = &stmts[0]
        else {
            panic!("expected binary expression statement");
        };

        assert!(matches!(**left, Expr::Binary { .. }));
        assert!(matches!(**right, Expr::Literal { .. }));
    }

    #[test]
    fn test_factor_operators() {
        for src in ["8 \\ 3;", "8 % 3;", "2 ^ 10;"] {
            let stmts = parse(src);
            assert!(matches!(
                &stmts[0],
                Stmt::Expression {
                    expression: Expr::Binary { .. }
                }
            ));
        }
    }

    #[test]
    fn test_assignment_targets() {
        assert!(matches!(
            &parse("x = 1;")[0],
            Stmt::Expression {
                expression: Expr::Assign { .. }
            }
        ));
        assert!(matches!(
            &parse("a.b = 1;")[0],
            Stmt::Expression {
                expression: Expr::Set { .. }
            }
        ));
        assert!(matches!(
            &parse("a[0] = 1;")[0],
            Stmt::Expression {
                expression: Expr::IndexSet { .. }
            }
        ));

        let errs = parse_errs("1 + 2 = 3;");
        assert_eq!(errs[0].message(), "Invalid assignment target.");
    }

    #[test]
    fn test_for_desugaring() {
        let stmts = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        let Stmt::Block { statements } = &stmts[0] else {
            panic!("expected block around for loop");
        };

        assert!(matches!(statements[0], Stmt::Var { .. }));
        let Stmt::While {
            is_for,
            increment,
            body,
            ..
        } = &statements[1]
        else {
            panic!("expected while loop");
        };

        assert!(*is_for);
        assert!(matches!(increment, Some(Expr::Assign { .. })));
        // the increment is also the last statement of the body block
        let Stmt::Block { statements: body } = &**body else {
            panic!("expected block body");
        };
        assert!(matches!(
            body.last(),
            Some(Stmt::Expression {
                expression: Expr::Assign { .. }
            })
        ));
    }

    #[test]
    fn test_list_dict_literals() {
        assert!(matches!(
            &parse("var l = [1, 2, 3];")[0],
            Stmt::Var {
                init: Some(Expr::List { elements, .. }),
                ..
            } if elements.len() == 3
        ));
        assert!(matches!(
            &parse("var d = {\"a\": 1, \"b\": 2};")[0],
            Stmt::Var {
                init: Some(Expr::Dict { entries, .. }),
                ..
            } if entries.len() == 2
        ));
        // a `{` in statement position is a block, not a dict
        assert!(matches!(&parse("{ print 1; }")[0], Stmt::Block { .. }));
    }

    #[test]
    fn test_lambda() {
        let stmts = parse("var f = lambda (a, b) { return a + b; };");
        assert!(matches!(
            &stmts[0],
            Stmt::Var {
                init: Some(Expr::Lambda { params, .. }),
                ..
            } if params.len() == 2
        ));
    }

    #[test]
    fn test_try_statement() {
        let stmts = parse("try { throw 1; } except (e) { print e; } finally { print 2; }");
        let Stmt::Try {
            except, finally, ..
        } = &stmts[0]
        else {
            panic!("expected try statement");
        };
        assert_eq!(except.as_ref().unwrap().name.lexeme, "e");
        assert!(finally.is_some());

        let errs = parse_errs("try { print 1; }");
        assert_eq!(
            errs[0].message(),
            "Expect 'except' or 'finally' after try block."
        );
    }

    #[test]
    fn test_import_statement() {
        assert!(matches!(
            &parse("import \"lib.lox\";")[0],
            Stmt::Import { path, .. } if path.value == Literal::from("lib.lox")
        ));
    }

    #[test]
    fn test_synchronization_reports_every_statement() {
        let errs = parse_errs("var 1 = 2; print; var x = 3;");
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].message(), "Expect variable name.");
    }

    #[test]
    fn test_missing_semicolon() {
        let errs = parse_errs("print 1");
        assert_eq!(errs[0].message(), "Expect ';' after value.");
    }

    #[test]
    fn test_call_chain() {
        let stmts = parse("a.b(1)[2].c;");
        assert!(matches!(
            &stmts[0],
            Stmt::Expression {
                expression: Expr::Get { .. }
            }
        ));
    }
}
