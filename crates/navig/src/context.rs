use serde::{Deserialize, Serialize};

use crate::heap::Value;
use crate::ConsistencyError;

/// Handle to a frame in a [`ContextArena`]. `ContextId::EMPTY` is the
/// terminal chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

impl ContextId {
    pub const EMPTY: ContextId = ContextId(usize::MAX);

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    pub fn index(self) -> Option<usize> {
        (!self.is_empty()).then_some(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "key")]
    pub name: String,
    #[serde(rename = "val", default)]
    pub value: Value,
}

impl Binding {
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone)]
struct Frame {
    parent: ContextId,
    bindings: Vec<Binding>,
}

/// Persistent scope chains stored as an arena of frames.
///
/// A frame only ever points at a frame created before it, so chains are
/// acyclic and suffixes are shared between every chain that extends them.
#[derive(Debug, Clone, Default)]
pub struct ContextArena {
    frames: Vec<Frame>,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> ContextId {
        ContextId::EMPTY
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains(&self, id: ContextId) -> bool {
        id.index().map_or(true, |index| index < self.frames.len())
    }

    /// Extends `parent` with a new frame. `bindings` are in insertion order;
    /// the newest binding is last.
    pub fn push(
        &mut self,
        parent: ContextId,
        bindings: Vec<Binding>,
    ) -> Result<ContextId, ConsistencyError> {
        if !self.contains(parent) {
            return Err(ConsistencyError::UnknownContext(parent.0));
        }
        self.frames.push(Frame { parent, bindings });
        Ok(ContextId(self.frames.len() - 1))
    }

    /// Bindings of the chain, innermost first: frames from head to root,
    /// each frame's bindings newest first.
    pub fn flatten(&self, id: ContextId) -> Result<Vec<&Binding>, ConsistencyError> {
        let mut out = Vec::new();
        for frame in self.frames_of(id) {
            out.extend(frame?.bindings.iter().rev());
        }
        Ok(out)
    }

    /// The innermost binding of the chain, i.e. the first element of
    /// [`ContextArena::flatten`].
    pub fn innermost(&self, id: ContextId) -> Result<Option<&Binding>, ConsistencyError> {
        for frame in self.frames_of(id) {
            if let Some(binding) = frame?.bindings.last() {
                return Ok(Some(binding));
            }
        }
        Ok(None)
    }

    fn frames_of(&self, id: ContextId) -> FrameIter<'_> {
        FrameIter {
            arena: self,
            next: id,
        }
    }
}

struct FrameIter<'a> {
    arena: &'a ContextArena,
    next: ContextId,
}

impl<'a> Iterator for FrameIter<'a> {
    type Item = Result<&'a Frame, ConsistencyError>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next.index()?;
        let Some(frame) = self.arena.frames.get(index) else {
            self.next = ContextId::EMPTY;
            return Some(Err(ConsistencyError::UnknownContext(index)));
        };
        self.next = frame.parent;
        Some(Ok(frame))
    }
}
