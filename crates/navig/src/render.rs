use serde::Serialize;

use crate::context::{ContextArena, ContextId};
use crate::heap::{fields_of, lookup, Address, Constant, Heap, Value};
use crate::ConsistencyError;

pub const DEFAULT_EXPAND_DEPTH: usize = 1;

/// Display tree for a value. Expansion state beyond the requested depth
/// belongs to whoever draws the tree; a collapsed object has `fields: None`
/// and can be re-rendered from its address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    Literal {
        text: String,
    },
    Object {
        address: Address,
        label: String,
        fields: Option<Vec<RenderField>>,
    },
    Closure {
        label: String,
    },
    Structured {
        json: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderField {
    pub name: String,
    pub node: RenderNode,
}

pub fn render(heap: &Heap, value: &Value, depth: usize) -> Result<RenderNode, ConsistencyError> {
    match value {
        Value::Constant(constant) => Ok(RenderNode::Literal {
            text: text_of_constant(constant),
        }),
        Value::Reference(address) => {
            let fields = if depth > 0 {
                Some(render_object(heap, *address, depth - 1)?)
            } else {
                None
            };
            Ok(RenderNode::Object {
                address: *address,
                label: format!("<Object>({address})"),
                fields,
            })
        }
        Value::Closure(_) => Ok(RenderNode::Closure {
            label: "<Closure>".to_string(),
        }),
        Value::Unrecognized(json) => Ok(RenderNode::Structured {
            json: format!("{json:#}"),
        }),
    }
}

/// Present fields of the object at `address`, each rendered with `depth`.
/// An empty list means the object has no present fields.
pub fn render_object(
    heap: &Heap,
    address: Address,
    depth: usize,
) -> Result<Vec<RenderField>, ConsistencyError> {
    let object = lookup(heap, address)?;
    fields_of(object)
        .map(|(name, value)| {
            Ok(RenderField {
                name: name.to_string(),
                node: render(heap, value, depth)?,
            })
        })
        .collect()
}

/// Every binding of a chain, innermost first.
pub fn render_context(
    heap: &Heap,
    arena: &ContextArena,
    chain: ContextId,
    depth: usize,
) -> Result<Vec<RenderField>, ConsistencyError> {
    arena
        .flatten(chain)?
        .into_iter()
        .map(|binding| {
            Ok(RenderField {
                name: binding.name.clone(),
                node: render(heap, &binding.value, depth)?,
            })
        })
        .collect()
}

pub fn text_of_constant(constant: &Constant) -> String {
    match constant {
        Constant::Bool(value) => value.to_string(),
        Constant::Number(value) => format_number(*value),
        Constant::Unrecognized(_) => "unrecognized constant".to_string(),
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}
