use std::rc::Rc;

use lox_core::{Literal, Token};

use crate::ast::{Expr, ExprId, ExprVisitor, Stmt};

/// Renders expressions as parenthesized prefix forms, e.g.
/// `(+ 1 (* 2 3))`. Handy for debugging the parser and for asserting tree
/// shapes in tests.
#[allow(dead_code)]
pub(crate) struct AstPrinter;

#[allow(dead_code)]
impl AstPrinter {
    pub(crate) fn print(&mut self, expr: &Expr) -> String {
        self.visit_expr(expr).unwrap_or_default()
    }

    fn parenthesize(&mut self, name: &str, exprs: &[&Expr]) -> Result<String, ()> {
        let mut builder = String::from(name);
        for expr in exprs {
            builder.push(' ');
            builder.push_str(&self.visit_expr(expr)?);
        }
        Ok(format!("({})", builder))
    }
}

impl ExprVisitor for AstPrinter {
    type Item = String;
    type Error = ();

    fn visit_assign(&mut self, name: &Token, _id: ExprId, value: &Expr) -> Result<String, ()> {
        self.parenthesize(&format!("= {}", name.lexeme), &[value])
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<String, ()> {
        self.parenthesize(&operator.lexeme, &[left, right])
    }

    fn visit_call(&mut self, callee: &Expr, _: &Token, args: &[Expr]) -> Result<String, ()> {
        let mut exprs: Vec<&Expr> = vec![callee];
        exprs.extend(args.iter());
        self.parenthesize("call", &exprs)
    }

    fn visit_get(&mut self, object: &Expr, name: &Token) -> Result<String, ()> {
        self.parenthesize(&format!(". {}", name.lexeme), &[object])
    }

    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> Result<String, ()> {
        self.parenthesize(&format!("=. {}", name.lexeme), &[object, value])
    }

    fn visit_index(&mut self, object: &Expr, _: &Token, key: &Expr) -> Result<String, ()> {
        self.parenthesize("[]", &[object, key])
    }

    fn visit_index_set(
        &mut self,
        object: &Expr,
        _: &Token,
        key: &Expr,
        value: &Expr,
    ) -> Result<String, ()> {
        self.parenthesize("=[]", &[object, key, value])
    }

    fn visit_grouping(&mut self, expression: &Expr) -> Result<String, ()> {
        self.parenthesize("group", &[expression])
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<String, ()> {
        Ok(match value {
            Literal::Str(s) => s.clone(),
            Literal::Num(n) => n.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Nil => String::from("nil"),
        })
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<String, ()> {
        self.parenthesize(&operator.lexeme, &[left, right])
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> Result<String, ()> {
        self.parenthesize(&operator.lexeme, &[right])
    }

    fn visit_variable(&mut self, name: &Token, _id: ExprId) -> Result<String, ()> {
        Ok(name.lexeme.clone())
    }

    fn visit_this(&mut self, _keyword: &Token, _id: ExprId) -> Result<String, ()> {
        Ok(String::from("this"))
    }

    fn visit_super(&mut self, _keyword: &Token, method: &Token, _id: ExprId) -> Result<String, ()> {
        Ok(format!("super.{}", method.lexeme))
    }

    fn visit_lambda(
        &mut self,
        _keyword: &Token,
        params: &[Token],
        _body: &Rc<Vec<Stmt>>,
    ) -> Result<String, ()> {
        let params: Vec<&str> = params.iter().map(|p| p.lexeme.as_str()).collect();
        Ok(format!("(lambda ({}))", params.join(" ")))
    }

    fn visit_list(&mut self, _: &Token, elements: &[Expr]) -> Result<String, ()> {
        let exprs: Vec<&Expr> = elements.iter().collect();
        self.parenthesize("list", &exprs)
    }

    fn visit_dict(&mut self, _: &Token, entries: &[(Expr, Expr)]) -> Result<String, ()> {
        let mut builder = String::from("dict");
        for (key, value) in entries {
            builder.push_str(&format!(
                " ({} {})",
                self.visit_expr(key)?,
                self.visit_expr(value)?
            ));
        }
        Ok(format!("({})", builder))
    }
}

#[cfg(test)]
mod tests {
    use lox_core::Scanner;

    use crate::ast::Stmt;
    use crate::parser::Parser;
    use crate::printer::AstPrinter;

    fn print_expr(src: &str) -> String {
        let tokens = Scanner::new(src).scan_tokens().unwrap();
        let stmts = Parser::new(&tokens).parse().unwrap().0;
        match &stmts[0] {
            Stmt::Expression { expression } => AstPrinter.print(expression),
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_prefix_forms() {
        let tests = [
            ("1 + 2 * 3;", "(+ 1 (* 2 3))"),
            ("(1 + 2) / 4;", "(/ (group (+ 1 2)) 4)"),
            ("-x ^ 2;", "(^ (- x) 2)"),
            ("a = b or !c;", "(= a (or b (! c)))"),
            ("f(1)[2].g;", "(. g ([] (call f 1) 2))"),
            ("[1, nil].len();", "(call (. len (list 1 nil)))"),
            // a bare `{` would start a block, so group the dict literal
            ("({\"k\": 1});", "(group (dict (k 1)))"),
        ];

        for (src, expected) in tests {
            assert_eq!(print_expr(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_printing_is_deterministic() {
        let src = "1 + foo(bar, \"s\") - [2][0];";
        assert_eq!(print_expr(src), print_expr(src));
    }
}
