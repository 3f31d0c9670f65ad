use crate::diagnostics::{Diagnostic, Position, Span};

use super::lexer::{lex, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNotEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            _ => return None,
        })
    }

    fn prec(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 3,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Member {
        target: Box<Expr>,
        field: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Parses one predicate. Lexer problems are all reported together; the
/// parser stops at its first error.
pub fn parse_predicate(text: &str) -> Result<Expr, Vec<Diagnostic>> {
    let (tokens, diagnostics) = lex(text);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    parse_tokens(tokens).map_err(|diagnostic| vec![diagnostic])
}

fn parse_tokens(tokens: Vec<Token>) -> Result<Expr, Diagnostic> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    if parser.tokens.is_empty() {
        return Err(Diagnostic::new(
            "E2005",
            "empty predicate",
            Span::single(1, 1, 1),
        ));
    }
    let expr = parser.parse_binary(1)?;
    if let Some(token) = parser.tokens.get(parser.pos) {
        return Err(Diagnostic::new(
            "E2004",
            format!("unexpected '{}' after end of expression", token.text),
            token.span.clone(),
        ));
    }
    Ok(expr)
}

/// Deepest tree the parser builds. Evaluation and drop recurse over the tree,
/// so the bound also keeps them off the end of the stack.
const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Operators, groups and postfix links opened above the current token.
    depth: usize,
}

impl Parser {
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Diagnostic> {
        let saved = self.depth;
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_binary_op() {
            let prec = op.prec();
            if prec < min_prec {
                break;
            }
            self.descend()?;
            self.pos += 1;
            let right = self.parse_binary(prec + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = saved;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let saved = self.depth;
        self.descend()?;
        let op = if self.consume_symbol("!") {
            UnaryOp::Not
        } else if self.consume_symbol("-") {
            UnaryOp::Neg
        } else {
            self.depth = saved;
            return self.parse_postfix();
        };
        let expr = self.parse_unary()?;
        self.depth = saved;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let saved = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek_symbol(), Some("." | "[")) {
                self.descend()?;
            }
            if self.consume_symbol(".") {
                let field = self.expect_ident("expected property name after '.'")?;
                expr = Expr::Member {
                    target: Box::new(expr),
                    field,
                };
                continue;
            }
            if self.consume_symbol("[") {
                let index = self.parse_binary(1)?;
                self.expect_symbol("]", "expected ']' to close index")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
                continue;
            }
            self.depth = saved;
            return Ok(expr);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(Diagnostic::new(
                "E2003",
                "unexpected end of predicate",
                self.end_span(),
            ));
        };
        self.pos += 1;
        match token.kind {
            TokenKind::Number => token
                .text
                .parse::<f64>()
                .map(|n| Expr::Literal(Literal::Number(n)))
                .map_err(|_| {
                    Diagnostic::new("E2003", format!("invalid number {}", token.text), token.span)
                }),
            TokenKind::String => Ok(Expr::Literal(Literal::Text(token.text))),
            TokenKind::Ident => Ok(match token.text.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                _ => Expr::Ident(token.text),
            }),
            TokenKind::Symbol if token.text == "(" => {
                let saved = self.depth;
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    return Err(too_deep(token.span));
                }
                let expr = self.parse_binary(1)?;
                self.expect_symbol(")", "expected ')' to close group")
                    .map_err(|diag| diag.with_label("group opened here", token.span))?;
                self.depth = saved;
                Ok(expr)
            }
            TokenKind::Symbol => Err(Diagnostic::new(
                "E2003",
                format!("unexpected token '{}'", token.text),
                token.span,
            )),
        }
    }

    fn descend(&mut self) -> Result<(), Diagnostic> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(too_deep(self.current_span()));
        }
        Ok(())
    }

    fn peek_symbol(&self) -> Option<&str> {
        self.tokens
            .get(self.pos)
            .filter(|token| token.kind == TokenKind::Symbol)
            .map(|token| token.text.as_str())
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let token = self.tokens.get(self.pos)?;
        if token.kind != TokenKind::Symbol {
            return None;
        }
        BinaryOp::from_symbol(&token.text)
    }

    fn consume_symbol(&mut self, symbol: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Symbol && token.text == symbol => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_symbol(&mut self, symbol: &str, message: &str) -> Result<(), Diagnostic> {
        if self.consume_symbol(symbol) {
            return Ok(());
        }
        Err(Diagnostic::new("E2003", message, self.current_span()))
    }

    fn expect_ident(&mut self, message: &str) -> Result<String, Diagnostic> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Ident => {
                self.pos += 1;
                Ok(token.text.clone())
            }
            _ => Err(Diagnostic::new("E2003", message, self.current_span())),
        }
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|token| token.span.clone())
            .unwrap_or_else(|| self.end_span())
    }

    fn end_span(&self) -> Span {
        let end = self
            .tokens
            .last()
            .map(|token| token.span.end)
            .unwrap_or(Position { line: 1, column: 0 });
        Span::single(end.line, end.column + 1, 1)
    }
}

fn too_deep(span: Span) -> Diagnostic {
    Diagnostic::new("E2006", "predicate nested too deeply", span)
}
