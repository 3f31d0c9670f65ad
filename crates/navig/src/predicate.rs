//! Sandboxed predicate language used by trace search.
//!
//! Predicates are plain expressions over an [`Environment`]: literals,
//! identifiers, member and index access, `!`/`-`, arithmetic, comparisons and
//! short-circuit `&&`/`||`. Nothing a predicate does can reach host code.

use std::cell::RefCell;

use crate::diagnostics::{render_diagnostics, Diagnostic};
use crate::environment::Environment;
use crate::ConsistencyError;

mod eval;
mod lexer;
mod parser;

pub use self::parser::{parse_predicate, BinaryOp, Expr, Literal, UnaryOp};

pub const PREDICATE_ORIGIN: &str = "<predicate>";

/// Failure of one predicate evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{}", render_diagnostics(PREDICATE_ORIGIN, .0))]
    Syntax(Vec<Diagnostic>),
    #[error("{0} is not defined")]
    UnknownIdentifier(String),
    #[error("cannot read property '{field}' of {target}")]
    NullAccess { field: String, target: &'static str },
    #[error("cannot use {found} as a property key")]
    InvalidKey { found: &'static str },
    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("operator '{op}' cannot be applied to {operand}")]
    UnaryMismatch {
        op: &'static str,
        operand: &'static str,
    },
    /// The environment itself is broken; search treats this as fatal.
    #[error(transparent)]
    Inconsistent(#[from] ConsistencyError),
}

/// Decides whether `text` holds in `env`.
pub trait PredicateEvaluator {
    fn evaluate(&self, text: &str, env: &Environment) -> Result<bool, EvalError>;
}

impl<F> PredicateEvaluator for F
where
    F: Fn(&str, &Environment) -> Result<bool, EvalError>,
{
    fn evaluate(&self, text: &str, env: &Environment) -> Result<bool, EvalError> {
        self(text, env)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    expr: Expr,
}

impl Predicate {
    pub fn parse(text: &str) -> Result<Self, EvalError> {
        let expr = parse_predicate(text).map_err(EvalError::Syntax)?;
        Ok(Self { expr })
    }

    pub fn test(&self, env: &Environment) -> Result<bool, EvalError> {
        Ok(eval::eval(&self.expr, env)?.truthy())
    }
}

/// Built-in evaluator. Keeps the last parsed predicate so a search over a
/// long trace parses its text once.
#[derive(Debug, Default)]
pub struct ExprEvaluator {
    last: RefCell<Option<(String, Result<Predicate, EvalError>)>>,
}

impl ExprEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredicateEvaluator for ExprEvaluator {
    fn evaluate(&self, text: &str, env: &Environment) -> Result<bool, EvalError> {
        let mut last = self.last.borrow_mut();
        let cached = matches!(last.as_ref(), Some((source, _)) if source == text);
        if !cached {
            *last = Some((text.to_string(), Predicate::parse(text)));
        }
        match last.as_ref() {
            Some((_, Ok(predicate))) => predicate.test(env),
            Some((_, Err(err))) => Err(err.clone()),
            None => Predicate::parse(text)?.test(env),
        }
    }
}
