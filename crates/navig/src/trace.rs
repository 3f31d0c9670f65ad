use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::{Binding, ContextArena, ContextId};
use crate::debug::{debug_trace_enabled, emit_debug_event};
use crate::diagnostics::Position;
use crate::heap::{Heap, Value};
use crate::ConsistencyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Enter,
    Return,
    Case,
    Let,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Enter => "enter",
            EventKind::Return => "return",
            EventKind::Case => "case",
            EventKind::Let => "let",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source span of an event, `line` 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Location {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start: Position {
                line: start_line,
                column: start_col,
            },
            end: Position {
                line: end_line,
                column: end_col,
            },
            file: None,
        }
    }

    pub fn line(&self) -> usize {
        self.start.line
    }
}

/// Interpreter-global state captured with an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "object_heap", default)]
    pub heap: Heap,
    /// Any other interpreter state the producer recorded, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl State {
    pub fn with_heap(heap: Heap) -> Self {
        Self {
            heap,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub location: Location,
    pub kind: EventKind,
    /// Interpreter-local scope chain.
    pub context: Option<ContextId>,
    /// Program-level environment chain.
    pub environment: Option<ContextId>,
    pub state: State,
    current_term: Option<Location>,
}

impl Event {
    pub fn new(location: Location, kind: EventKind) -> Self {
        Self {
            location,
            kind,
            context: None,
            environment: None,
            state: State::default(),
            current_term: None,
        }
    }

    pub fn with_context(mut self, context: ContextId) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_environment(mut self, environment: ContextId) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn line(&self) -> usize {
        self.location.line()
    }

    /// Location of the term being evaluated, carried forward from the most
    /// recent event that exposed one. Only set once the trace is linked.
    pub fn current_term(&self) -> Option<&Location> {
        self.current_term.as_ref()
    }
}

/// Trace under construction. The producer pushes scope frames and appends
/// events in execution order, then calls [`TraceStore::link_terms`] once.
#[derive(Debug, Default)]
pub struct TraceStore {
    contexts: ContextArena,
    events: Vec<Event>,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_context(
        &mut self,
        parent: ContextId,
        bindings: Vec<Binding>,
    ) -> Result<ContextId, ConsistencyError> {
        self.contexts.push(parent, bindings)
    }

    pub fn contexts(&self) -> &ContextArena {
        &self.contexts
    }

    pub fn append(&mut self, event: Event) -> Result<usize, ConsistencyError> {
        for id in [event.context, event.environment].into_iter().flatten() {
            if !self.contexts.contains(id) {
                return Err(ConsistencyError::UnknownContext(id.index().unwrap_or(0)));
            }
        }
        self.events.push(event);
        Ok(self.events.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Annotates every event with its current term and freezes the store.
    ///
    /// An event's context exposes a term when its innermost binding is named
    /// `term_key` and holds a value with a `loc` member. Events are visited
    /// in trace order; each one sees only terms exposed at or before it.
    pub fn link_terms(mut self, term_key: &str) -> Result<Trace, ConsistencyError> {
        let mut last: Option<Location> = None;
        let mut linked = 0usize;
        for event in &mut self.events {
            if let Some(context) = event.context {
                if let Some(binding) = self.contexts.innermost(context)? {
                    if binding.name == term_key {
                        if let Some(location) = term_location(&binding.value) {
                            last = Some(location);
                        }
                    }
                }
            }
            event.current_term = last.clone();
            if event.current_term.is_some() {
                linked += 1;
            }
        }
        if debug_trace_enabled() {
            emit_debug_event(serde_json::json!({
                "kind": "trace.linked",
                "events": self.events.len(),
                "linked": linked,
            }));
        }
        Ok(Trace {
            contexts: self.contexts,
            events: self.events,
        })
    }
}

fn term_location(value: &Value) -> Option<Location> {
    let Value::Unrecognized(json) = value else {
        return None;
    };
    let loc = json.get("loc")?;
    serde_json::from_value(loc.clone()).ok()
}

/// Frozen, linked trace. Read-only for navigation and search.
#[derive(Debug, Default)]
pub struct Trace {
    contexts: ContextArena,
    events: Vec<Event>,
}

impl Trace {
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn contexts(&self) -> &ContextArena {
        &self.contexts
    }
}
