//! Kconfig dependency expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr   := and ( "||" and )*
//! and    := factor ( "&&" factor )*
//! factor := "!" factor | "(" expr ")" | operand ( cmp operand )?
//! cmp    := "=" | "!=" | "<" | "<=" | ">" | ">="
//! ```

use super::lexer::{Token, Tokens};
use std::fmt;

/// Leaf of an expression: a symbol reference or a quoted constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Unquoted word. Resolves to a symbol when one of that name is defined,
    /// otherwise behaves as a constant spelled like the word.
    Sym(String),
    /// Quoted string constant.
    Const(String),
}

impl Operand {
    pub fn name(&self) -> &str {
        match self {
            Operand::Sym(s) | Operand::Const(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Eq => Some(CmpOp::Eq),
            Token::Ne => Some(CmpOp::Ne),
            Token::Lt => Some(CmpOp::Lt),
            Token::Le => Some(CmpOp::Le),
            Token::Gt => Some(CmpOp::Gt),
            Token::Ge => Some(CmpOp::Ge),
            _ => None,
        }
    }

    /// Apply the operator to the result of a three-way comparison.
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Eq => ordering == Equal,
            CmpOp::Ne => ordering != Equal,
            CmpOp::Lt => ordering == Less,
            CmpOp::Le => ordering != Greater,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Ge => ordering != Less,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(Operand),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Operand, Operand),
}

impl Expr {
    /// The constant `y`.
    pub fn yes() -> Self {
        Expr::Term(Operand::Const("y".to_string()))
    }

    /// The constant `n`.
    pub fn no() -> Self {
        Expr::Term(Operand::Const("n".to_string()))
    }

    pub fn is_const(&self, value: &str) -> bool {
        matches!(self, Expr::Term(Operand::Const(s)) if s == value)
    }

    /// `a && b`, folding away constant `y` operands.
    pub fn and(a: Expr, b: Expr) -> Expr {
        if a.is_const("y") {
            b
        } else if b.is_const("y") {
            a
        } else {
            Expr::And(Box::new(a), Box::new(b))
        }
    }

    /// `a || b`, folding away constant `n` operands.
    pub fn or(a: Expr, b: Expr) -> Expr {
        if a.is_const("n") {
            b
        } else if b.is_const("n") {
            a
        } else {
            Expr::Or(Box::new(a), Box::new(b))
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Term(Operand::Sym(s)) => write!(f, "{}", s),
            Expr::Term(Operand::Const(s)) => write!(f, "\"{}\"", s),
            Expr::Not(e) => write!(f, "!({})", e),
            Expr::And(a, b) => write!(f, "({} && {})", a, b),
            Expr::Or(a, b) => write!(f, "({} || {})", a, b),
            Expr::Cmp(op, a, b) => write!(f, "{} {} {}", a.name(), op.as_str(), b.name()),
        }
    }
}

/// Parse an expression from the cursor, stopping at the first token that
/// cannot continue it (such as a trailing `if`).
pub fn parse_expr(tokens: &mut Tokens) -> Result<Expr, String> {
    let mut expr = parse_and(tokens)?;
    while tokens.eat(&Token::Or) {
        let rhs = parse_and(tokens)?;
        expr = Expr::Or(Box::new(expr), Box::new(rhs));
    }
    Ok(expr)
}

fn parse_and(tokens: &mut Tokens) -> Result<Expr, String> {
    let mut expr = parse_factor(tokens)?;
    while tokens.eat(&Token::And) {
        let rhs = parse_factor(tokens)?;
        expr = Expr::And(Box::new(expr), Box::new(rhs));
    }
    Ok(expr)
}

fn parse_factor(tokens: &mut Tokens) -> Result<Expr, String> {
    match tokens.next() {
        Some(Token::Not) => Ok(Expr::Not(Box::new(parse_factor(tokens)?))),
        Some(Token::LParen) => {
            let expr = parse_expr(tokens)?;
            if !tokens.eat(&Token::RParen) {
                return Err("missing ')'".to_string());
            }
            Ok(expr)
        }
        Some(token) => {
            let lhs = operand_from(token)?;
            match tokens.peek().and_then(CmpOp::from_token) {
                Some(op) => {
                    tokens.next();
                    let rhs = match tokens.next() {
                        Some(token) => operand_from(token)?,
                        None => return Err("expected operand after comparison".to_string()),
                    };
                    Ok(Expr::Cmp(op, lhs, rhs))
                }
                None => Ok(Expr::Term(lhs)),
            }
        }
        None => Err("expected expression".to_string()),
    }
}

fn operand_from(token: Token) -> Result<Operand, String> {
    match token {
        Token::Word(w) => Ok(Operand::Sym(w)),
        Token::Str(s) => Ok(Operand::Const(s)),
        other => Err(format!("unexpected '{}' in expression", other)),
    }
}

/// Parse an operand: a single symbol or constant.
pub fn parse_operand(tokens: &mut Tokens) -> Result<Operand, String> {
    match tokens.next() {
        Some(token) => operand_from(token),
        None => Err("expected symbol or constant".to_string()),
    }
}

/// Parse an optional trailing `if <expr>`, yielding `y` when absent.
pub fn parse_condition(tokens: &mut Tokens) -> Result<Expr, String> {
    if tokens.eat_word("if") {
        parse_expr(tokens)
    } else {
        Ok(Expr::yes())
    }
}
