use serde::Serialize;

use crate::debug::{debug_trace_enabled, emit_debug_event};
use crate::environment::DEFAULT_RESERVED_KEY;
use crate::trace::{Event, EventKind, Trace};

/// What a navigation request did to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    /// The cursor is on the requested target.
    Moved,
    /// The scan ran off the trace; the cursor is on the last position it
    /// visited.
    Parked,
    /// The step would leave the trace; the cursor did not move.
    Rejected,
    /// There are no events to move over.
    Empty,
}

impl Motion {
    pub fn as_str(self) -> &'static str {
        match self {
            Motion::Moved => "moved",
            Motion::Parked => "parked",
            Motion::Rejected => "rejected",
            Motion::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn delta(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Cursor over a frozen trace. All position changes go through these
/// methods, which keep the cursor inside `[0, len)`.
#[derive(Debug, Clone)]
pub struct NavigationSession<'t> {
    trace: &'t Trace,
    cursor: usize,
    reserved_key: String,
}

impl<'t> NavigationSession<'t> {
    pub fn new(trace: &'t Trace) -> Self {
        Self {
            trace,
            cursor: 0,
            reserved_key: DEFAULT_RESERVED_KEY.to_string(),
        }
    }

    /// Name of the interpreter namespace in predicate environments.
    pub fn with_reserved_key(mut self, reserved_key: &str) -> Self {
        self.reserved_key = reserved_key.to_string();
        self
    }

    pub fn reserved_key(&self) -> &str {
        &self.reserved_key
    }

    pub fn trace(&self) -> &'t Trace {
        self.trace
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    pub fn current(&self) -> Option<&'t Event> {
        self.trace.get(self.cursor)
    }

    pub fn event_at(&self, index: usize) -> Option<&'t Event> {
        self.trace.get(index)
    }

    pub fn restart(&mut self) -> Motion {
        let from = self.cursor;
        let motion = if self.is_empty() {
            Motion::Empty
        } else {
            self.cursor = 0;
            Motion::Moved
        };
        self.record("restart", from, motion)
    }

    /// Jumps to `index`, clamped into the trace.
    pub fn set_cursor(&mut self, index: i64) -> Motion {
        let from = self.cursor;
        let motion = if self.is_empty() {
            Motion::Empty
        } else {
            let last = (self.len() - 1) as i64;
            self.cursor = index.clamp(0, last) as usize;
            Motion::Moved
        };
        self.record("set_cursor", from, motion)
    }

    pub fn step(&mut self) -> Motion {
        let from = self.cursor;
        let motion = self.shared_step(Direction::Forward);
        self.record("step", from, motion)
    }

    pub fn back_step(&mut self) -> Motion {
        let from = self.cursor;
        let motion = self.shared_step(Direction::Backward);
        self.record("back_step", from, motion)
    }

    /// Next event at the same call depth, skipping nested calls.
    pub fn next(&mut self) -> Motion {
        let from = self.cursor;
        let motion = self.shared_next(Direction::Forward, 0);
        self.record("next", from, motion)
    }

    /// Previous event at the same call depth, skipping nested calls.
    pub fn previous(&mut self) -> Motion {
        let from = self.cursor;
        let motion = self.shared_next(Direction::Backward, 0);
        self.record("previous", from, motion)
    }

    /// Forward to where the current call has returned to its caller.
    pub fn finish(&mut self) -> Motion {
        let from = self.cursor;
        let motion = self.shared_next(Direction::Forward, -1);
        self.record("finish", from, motion)
    }

    /// Search landed on `index`; only the search engine moves the cursor
    /// this way, and only to an existing position.
    pub(crate) fn land(&mut self, index: usize) {
        if index < self.len() {
            self.cursor = index;
        }
    }

    fn shared_step(&mut self, direction: Direction) -> Motion {
        if self.is_empty() {
            return Motion::Empty;
        }
        match self.offset(self.cursor, direction) {
            Some(index) => {
                self.cursor = index;
                Motion::Moved
            }
            None => Motion::Rejected,
        }
    }

    /// Depth-aware scan. `depth` counts calls opened and not yet closed
    /// since the start of the scan; the cursor stops at the first visited
    /// position (other than the start) where `depth == target`.
    fn shared_next(&mut self, direction: Direction, target: i64) -> Motion {
        if self.is_empty() {
            return Motion::Empty;
        }
        let start = self.cursor;
        let mut depth: i64 = match (direction, self.kind_at(start)) {
            (Direction::Forward, Some(EventKind::Return)) => 1,
            (Direction::Backward, Some(EventKind::Enter)) => -1,
            _ => 0,
        };
        let mut index = start;
        loop {
            if index != start && depth == target {
                self.cursor = index;
                return Motion::Moved;
            }
            match self.kind_at(index) {
                Some(EventKind::Enter) => depth += 1,
                Some(EventKind::Return) => depth -= 1,
                _ => {}
            }
            match self.offset(index, direction) {
                Some(next) => index = next,
                None => {
                    self.cursor = index;
                    return Motion::Parked;
                }
            }
        }
    }

    fn offset(&self, index: usize, direction: Direction) -> Option<usize> {
        let next = index.checked_add_signed(direction.delta())?;
        (next < self.len()).then_some(next)
    }

    fn kind_at(&self, index: usize) -> Option<EventKind> {
        self.trace.get(index).map(|event| event.kind)
    }

    fn record(&self, op: &str, from: usize, motion: Motion) -> Motion {
        if debug_trace_enabled() {
            emit_debug_event(serde_json::json!({
                "kind": "nav.move",
                "op": op,
                "from": from,
                "to": self.cursor,
                "outcome": motion.as_str(),
            }));
        }
        motion
    }
}

#[cfg(test)]
mod tests;
