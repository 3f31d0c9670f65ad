use std::collections::BTreeMap;

use crate::context::{ContextArena, ContextId};
use crate::heap::{Heap, Value};
use crate::render::render;
use crate::trace::{Event, Trace};
use crate::ConsistencyError;

pub const DEFAULT_RESERVED_KEY: &str = "X";

/// Entry of an [`Environment`]. Program values stay as recorded; references
/// are resolved against the environment's heap when a predicate reads them.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    Number(f64),
    Text(String),
    Namespace(BTreeMap<String, Slot>),
    /// The raw heap of the event, indexable by address.
    Heap,
}

/// Point-in-time view of a trace position for predicates and display.
#[derive(Debug, Clone)]
pub struct Environment {
    heap: Heap,
    bindings: BTreeMap<String, Slot>,
}

impl Environment {
    pub fn new(heap: Heap) -> Self {
        Self {
            heap,
            bindings: BTreeMap::new(),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.bindings.get(name)
    }

    pub fn insert(&mut self, name: &str, slot: Slot) {
        self.bindings.insert(name.to_string(), slot);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// JSON description of every binding, references expanded to `depth`.
    pub fn describe(&self, depth: usize) -> Result<serde_json::Value, ConsistencyError> {
        describe_namespace(&self.heap, &self.bindings, depth)
    }
}

/// Bindings of `chain` over `heap`. Shadowed names resolve to the innermost
/// binding.
pub fn build_environment(
    heap: &Heap,
    arena: &ContextArena,
    chain: ContextId,
) -> Result<Environment, ConsistencyError> {
    let mut env = Environment::new(heap.clone());
    env.bindings = chain_bindings(arena, chain)?;
    Ok(env)
}

/// Environment seen by a predicate at `event`: program bindings at top
/// level, and under `reserved_key` the interpreter locals together with the
/// event's `line`, `kind` and `heap`.
pub fn event_environment(
    trace: &Trace,
    event: &Event,
    reserved_key: &str,
) -> Result<Environment, ConsistencyError> {
    let arena = trace.contexts();
    let mut env = build_environment(
        &event.state.heap,
        arena,
        event.environment.unwrap_or(ContextId::EMPTY),
    )?;
    let mut internal = chain_bindings(arena, event.context.unwrap_or(ContextId::EMPTY))?;
    internal.insert("line".to_string(), Slot::Number(event.line() as f64));
    internal.insert("kind".to_string(), Slot::Text(event.kind.as_str().to_string()));
    internal.insert("heap".to_string(), Slot::Heap);
    env.insert(reserved_key, Slot::Namespace(internal));
    Ok(env)
}

fn chain_bindings(
    arena: &ContextArena,
    chain: ContextId,
) -> Result<BTreeMap<String, Slot>, ConsistencyError> {
    let mut bindings = BTreeMap::new();
    for binding in arena.flatten(chain)? {
        bindings
            .entry(binding.name.clone())
            .or_insert_with(|| Slot::Value(binding.value.clone()));
    }
    Ok(bindings)
}

fn describe_namespace(
    heap: &Heap,
    namespace: &BTreeMap<String, Slot>,
    depth: usize,
) -> Result<serde_json::Value, ConsistencyError> {
    let mut out = serde_json::Map::new();
    for (name, slot) in namespace {
        let described = match slot {
            Slot::Value(value) => {
                serde_json::to_value(render(heap, value, depth)?).unwrap_or_default()
            }
            Slot::Number(n) => serde_json::json!(n),
            Slot::Text(text) => serde_json::json!(text),
            Slot::Namespace(inner) => describe_namespace(heap, inner, depth)?,
            Slot::Heap => serde_json::json!({ "kind": "heap", "objects": heap.len() }),
        };
        out.insert(name.clone(), described);
    }
    Ok(serde_json::Value::Object(out))
}
