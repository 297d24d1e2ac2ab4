//! Recursive-descent parser from tokens to [`Expr`].

use super::ast::{BinOp, CmpOp, Expr};
use super::lexer::{tokenize, Token};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {expected}, found {}", self.peek()))
        }
    }

    /// `conditional := additive ("if" additive "else" conditional)?`
    fn parse_conditional(&mut self) -> Result<Expr, String> {
        let then = self.parse_comparison()?;
        if matches!(self.peek(), Token::If) {
            self.advance();
            let cond = self.parse_comparison()?;
            self.expect(&Token::Else)?;
            let otherwise = self.parse_conditional()?;
            Ok(Expr::Conditional {
                then: Box::new(then),
                cond: Box::new(cond),
                otherwise: Box::new(otherwise),
            })
        } else {
            Ok(then)
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            Token::EqEq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_power()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// Right-associative `**`.
    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_unary()?;
        if matches!(self.peek(), Token::StarStar) {
            self.advance();
            let exp = self.parse_power()?;
            Ok(Expr::BinOp(BinOp::Pow, Box::new(base), Box::new(exp)))
        } else {
            Ok(base)
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::LParen => {
                let inner = self.parse_conditional()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if matches!(self.peek(), Token::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Token::RParen) {
                        args.push(self.parse_conditional()?);
                        while matches!(self.peek(), Token::Comma) {
                            self.advance();
                            args.push(self.parse_conditional()?);
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            other => Err(format!("unexpected token: {other}")),
        }
    }
}

/// Parse a rate expression into an [`Expr`] tree.
pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_conditional()?;
    if !matches!(parser.peek(), Token::End) {
        return Err(format!("unexpected trailing token: {}", parser.peek()));
    }
    Ok(expr)
}

/// Collect every `Var` identifier referenced in `expr`, used to derive a
/// transition's regulatory set `Σ(t)` from places with no incident arc.
pub fn collect_vars(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Var(name) => out.push(name.clone()),
        Expr::Neg(inner) => collect_vars(inner, out),
        Expr::BinOp(_, a, b) | Expr::Compare(_, a, b) => {
            collect_vars(a, out);
            collect_vars(b, out);
        }
        Expr::Conditional {
            then,
            cond,
            otherwise,
        } => {
            collect_vars(then, out);
            collect_vars(cond, out);
            collect_vars(otherwise, out);
        }
        Expr::Call(_, args) => {
            for a in args {
                collect_vars(a, out);
            }
        }
    }
}
