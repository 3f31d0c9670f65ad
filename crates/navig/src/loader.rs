use std::path::Path;

use serde::Deserialize;

use crate::context::{Binding, ContextArena, ContextId};
use crate::trace::{Event, EventKind, Location, State, Trace, TraceStore};
use crate::{ConsistencyError, NavigError};

pub const DEFAULT_TERM_KEY: &str = "_term_";

#[derive(Debug, Deserialize)]
struct TraceFile {
    #[serde(default)]
    contexts: Vec<ContextRecord>,
    #[serde(default)]
    events: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct ContextRecord {
    #[serde(default)]
    parent: Option<usize>,
    #[serde(default)]
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    loc: Location,
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default)]
    ctx: Option<usize>,
    #[serde(default)]
    env: Option<usize>,
    #[serde(default)]
    state: State,
}

pub fn load_trace(path: &Path, term_key: &str) -> Result<Trace, NavigError> {
    let text = std::fs::read_to_string(path)?;
    parse_trace(&text, term_key).map_err(|err| match err {
        NavigError::TraceFormat(message) => {
            NavigError::TraceFormat(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Decodes a trace file and replays it into a [`TraceStore`] in file order,
/// then links terms.
pub fn parse_trace(text: &str, term_key: &str) -> Result<Trace, NavigError> {
    let file: TraceFile =
        serde_json::from_str(text).map_err(|err| NavigError::TraceFormat(err.to_string()))?;

    let mut store = TraceStore::new();
    let mut ids = Vec::with_capacity(file.contexts.len());
    for (index, record) in file.contexts.into_iter().enumerate() {
        let parent = match record.parent {
            None => ContextArena::empty(),
            Some(parent) if parent < index => ids[parent],
            Some(parent) => {
                return Err(ConsistencyError::ForwardParent {
                    child: index,
                    parent,
                }
                .into())
            }
        };
        ids.push(store.push_context(parent, record.bindings)?);
    }

    let resolve = |index: Option<usize>| -> Result<Option<ContextId>, ConsistencyError> {
        index
            .map(|index| {
                ids.get(index)
                    .copied()
                    .ok_or(ConsistencyError::UnknownContext(index))
            })
            .transpose()
    };
    for record in file.events {
        let mut event = Event::new(record.loc, record.kind).with_state(record.state);
        event.context = resolve(record.ctx)?;
        event.environment = resolve(record.env)?;
        store.append(event)?;
    }
    Ok(store.link_terms(term_key)?)
}
