use std::collections::BTreeMap;

use crate::environment::{Environment, Slot};
use crate::heap::{lookup, Address, Constant, Value};
use crate::render::format_number;

use super::parser::{BinaryOp, Expr, Literal, UnaryOp};
use super::EvalError;

/// Runtime value of the predicate language. Borrows from the environment
/// it is evaluated against.
#[derive(Debug, Clone)]
pub(super) enum Datum<'e> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Ref(Address),
    Closure,
    Json(&'e serde_json::Value),
    Namespace(&'e BTreeMap<String, Slot>),
    Heap,
}

impl<'e> Datum<'e> {
    fn type_name(&self) -> &'static str {
        match self {
            Datum::Undefined => "undefined",
            Datum::Null => "null",
            Datum::Bool(_) => "boolean",
            Datum::Number(_) => "number",
            Datum::Text(_) => "string",
            Datum::Ref(_) | Datum::Json(_) | Datum::Namespace(_) | Datum::Heap => "object",
            Datum::Closure => "function",
        }
    }

    pub(super) fn truthy(&self) -> bool {
        match self {
            Datum::Undefined | Datum::Null => false,
            Datum::Bool(b) => *b,
            Datum::Number(n) => *n != 0.0 && !n.is_nan(),
            Datum::Text(text) => !text.is_empty(),
            _ => true,
        }
    }

    fn from_value(value: &'e Value) -> Self {
        match value {
            Value::Constant(Constant::Bool(b)) => Datum::Bool(*b),
            Value::Constant(Constant::Number(n)) => Datum::Number(*n),
            Value::Constant(Constant::Unrecognized(json)) => Datum::from_json(json),
            Value::Reference(address) => Datum::Ref(*address),
            Value::Closure(_) => Datum::Closure,
            Value::Unrecognized(json) => Datum::from_json(json),
        }
    }

    fn from_json(json: &'e serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Datum::Null,
            serde_json::Value::Bool(b) => Datum::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Datum::Undefined, Datum::Number),
            serde_json::Value::String(s) => Datum::Text(s.clone()),
            other => Datum::Json(other),
        }
    }

    fn from_slot(slot: &'e Slot) -> Self {
        match slot {
            Slot::Value(value) => Datum::from_value(value),
            Slot::Number(n) => Datum::Number(*n),
            Slot::Text(text) => Datum::Text(text.clone()),
            Slot::Namespace(namespace) => Datum::Namespace(namespace),
            Slot::Heap => Datum::Heap,
        }
    }

    fn display(&self) -> Option<String> {
        match self {
            Datum::Undefined => Some("undefined".to_string()),
            Datum::Null => Some("null".to_string()),
            Datum::Bool(b) => Some(b.to_string()),
            Datum::Number(n) => Some(format_number(*n)),
            Datum::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

pub(super) fn eval<'e>(expr: &Expr, env: &'e Environment) -> Result<Datum<'e>, EvalError> {
    match expr {
        Expr::Literal(literal) => Ok(match literal {
            Literal::Number(n) => Datum::Number(*n),
            Literal::Text(text) => Datum::Text(text.clone()),
            Literal::Bool(b) => Datum::Bool(*b),
            Literal::Null => Datum::Null,
            Literal::Undefined => Datum::Undefined,
        }),
        Expr::Ident(name) => env
            .get(name)
            .map(Datum::from_slot)
            .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),
        Expr::Member { target, field } => {
            let target = eval(target, env)?;
            member(env, target, field)
        }
        Expr::Index { target, index } => {
            let target = eval(target, env)?;
            let index = eval(index, env)?;
            let key = index.display().ok_or(EvalError::InvalidKey {
                found: index.type_name(),
            })?;
            member(env, target, &key)
        }
        Expr::Unary { op, expr } => {
            let operand = eval(expr, env)?;
            match op {
                UnaryOp::Not => Ok(Datum::Bool(!operand.truthy())),
                UnaryOp::Neg => match operand {
                    Datum::Number(n) => Ok(Datum::Number(-n)),
                    other => Err(EvalError::UnaryMismatch {
                        op: "-",
                        operand: other.type_name(),
                    }),
                },
            }
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left, env)?;
            match op {
                BinaryOp::And if !left.truthy() => Ok(left),
                BinaryOp::Or if left.truthy() => Ok(left),
                BinaryOp::And | BinaryOp::Or => eval(right, env),
                _ => {
                    let right = eval(right, env)?;
                    binary(*op, left, right)
                }
            }
        }
    }
}

fn member<'e>(env: &'e Environment, target: Datum<'e>, key: &str) -> Result<Datum<'e>, EvalError> {
    match target {
        Datum::Undefined | Datum::Null => Err(EvalError::NullAccess {
            field: key.to_string(),
            target: target.type_name(),
        }),
        Datum::Ref(address) => {
            let object = lookup(env.heap(), address)?;
            Ok(object.field(key).map_or(Datum::Undefined, Datum::from_value))
        }
        Datum::Namespace(namespace) => {
            Ok(namespace.get(key).map_or(Datum::Undefined, Datum::from_slot))
        }
        Datum::Heap => {
            let address = key.parse::<u64>().ok().map(Address);
            Ok(match address {
                Some(address) if env.heap().contains_key(&address) => Datum::Ref(address),
                _ => Datum::Undefined,
            })
        }
        Datum::Json(serde_json::Value::Object(map)) => {
            Ok(map.get(key).map_or(Datum::Undefined, Datum::from_json))
        }
        Datum::Json(serde_json::Value::Array(items)) => Ok(if key == "length" {
            Datum::Number(items.len() as f64)
        } else {
            key.parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map_or(Datum::Undefined, Datum::from_json)
        }),
        Datum::Text(text) if key == "length" => Ok(Datum::Number(text.chars().count() as f64)),
        _ => Ok(Datum::Undefined),
    }
}

fn binary<'e>(op: BinaryOp, left: Datum<'e>, right: Datum<'e>) -> Result<Datum<'e>, EvalError> {
    let mismatch = |left: &Datum, right: &Datum| EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match op {
        BinaryOp::Eq => Ok(Datum::Bool(equals(&left, &right, true))),
        BinaryOp::NotEq => Ok(Datum::Bool(!equals(&left, &right, true))),
        BinaryOp::StrictEq => Ok(Datum::Bool(equals(&left, &right, false))),
        BinaryOp::StrictNotEq => Ok(Datum::Bool(!equals(&left, &right, false))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (&left, &right) {
                (Datum::Number(a), Datum::Number(b)) => a.partial_cmp(b),
                (Datum::Text(a), Datum::Text(b)) => Some(a.cmp(b)),
                _ => return Err(mismatch(&left, &right)),
            };
            // Comparisons involving NaN are false.
            let Some(ordering) = ordering else {
                return Ok(Datum::Bool(false));
            };
            Ok(Datum::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => match (&left, &right) {
            (Datum::Number(a), Datum::Number(b)) => Ok(Datum::Number(a + b)),
            (Datum::Text(_), _) | (_, Datum::Text(_)) => {
                match (left.display(), right.display()) {
                    (Some(a), Some(b)) => Ok(Datum::Text(a + &b)),
                    _ => Err(mismatch(&left, &right)),
                }
            }
            _ => Err(mismatch(&left, &right)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Datum::Number(a), Datum::Number(b)) = (&left, &right) else {
                return Err(mismatch(&left, &right));
            };
            Ok(Datum::Number(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
        BinaryOp::And => Ok(if left.truthy() { right } else { left }),
        BinaryOp::Or => Ok(if left.truthy() { left } else { right }),
    }
}

fn equals(left: &Datum, right: &Datum, loose: bool) -> bool {
    match (left, right) {
        (Datum::Undefined, Datum::Undefined) | (Datum::Null, Datum::Null) => true,
        (Datum::Undefined, Datum::Null) | (Datum::Null, Datum::Undefined) => loose,
        (Datum::Bool(a), Datum::Bool(b)) => a == b,
        (Datum::Number(a), Datum::Number(b)) => a == b,
        (Datum::Text(a), Datum::Text(b)) => a == b,
        (Datum::Ref(a), Datum::Ref(b)) => a == b,
        (Datum::Json(a), Datum::Json(b)) => std::ptr::eq(*a, *b),
        (Datum::Namespace(a), Datum::Namespace(b)) => std::ptr::eq(*a, *b),
        (Datum::Heap, Datum::Heap) => true,
        _ => false,
    }
}
