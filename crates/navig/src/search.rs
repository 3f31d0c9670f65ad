use std::fmt;

use serde::Serialize;

use crate::debug::{debug_trace_enabled, emit_debug_event};
use crate::environment::event_environment;
use crate::navigation::NavigationSession;
use crate::predicate::{EvalError, PredicateEvaluator};
use crate::trace::Trace;
use crate::ConsistencyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found {
        position: usize,
    },
    NotFound,
    /// Every evaluated position failed, which usually means the predicate
    /// itself is malformed.
    AllErrored {
        attempts: usize,
        last_error: String,
    },
}

impl SearchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOutcome::Found { .. } => "found",
            SearchOutcome::NotFound => "not_found",
            SearchOutcome::AllErrored { .. } => "all_errored",
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Found { position } => write!(f, "found at {position}"),
            SearchOutcome::NotFound => f.write_str("not found"),
            SearchOutcome::AllErrored { last_error, .. } => write!(
                f,
                "the condition failed to evaluate at every position; is it a valid predicate? ({last_error})"
            ),
        }
    }
}

/// Looks for a position after `from` whose environment satisfies `text`,
/// wrapping around the end of the trace. `from` itself is tried last.
///
/// Evaluation errors are counted and skipped; a consistency error in the
/// trace aborts the search.
pub fn search<E>(
    trace: &Trace,
    from: usize,
    text: &str,
    evaluator: &E,
    reserved_key: &str,
) -> Result<SearchOutcome, ConsistencyError>
where
    E: PredicateEvaluator + ?Sized,
{
    if trace.is_empty() {
        return Ok(SearchOutcome::NotFound);
    }
    let len = trace.len();
    let from = from.min(len - 1);
    let order = (from + 1..len).chain(0..from).chain(std::iter::once(from));

    let mut evaluated = 0usize;
    let mut errors = 0usize;
    let mut last_error = None;
    let mut outcome = None;
    for position in order {
        let Some(event) = trace.get(position) else {
            continue;
        };
        let env = event_environment(trace, event, reserved_key)?;
        evaluated += 1;
        match evaluator.evaluate(text, &env) {
            Ok(true) => {
                outcome = Some(SearchOutcome::Found { position });
                break;
            }
            Ok(false) => {}
            Err(EvalError::Inconsistent(err)) => return Err(err),
            Err(err) => {
                if debug_trace_enabled() {
                    emit_debug_event(serde_json::json!({
                        "kind": "search.error",
                        "position": position,
                        "error": err.to_string(),
                    }));
                }
                errors += 1;
                last_error = Some(err);
            }
        }
    }

    let outcome = match (outcome, last_error) {
        (Some(found), _) => found,
        (None, Some(err)) if errors == evaluated && evaluated == len => SearchOutcome::AllErrored {
            attempts: errors,
            last_error: err.to_string(),
        },
        (None, _) => SearchOutcome::NotFound,
    };
    if debug_trace_enabled() {
        emit_debug_event(serde_json::json!({
            "kind": "search.done",
            "from": from,
            "outcome": outcome,
            "errors": errors,
            "evaluated": evaluated,
        }));
    }
    Ok(outcome)
}

impl<'t> NavigationSession<'t> {
    /// Searches from the cursor and moves it to the match, if any.
    pub fn search<E>(&mut self, text: &str, evaluator: &E) -> Result<SearchOutcome, ConsistencyError>
    where
        E: PredicateEvaluator + ?Sized,
    {
        let outcome = search(
            self.trace(),
            self.position(),
            text,
            evaluator,
            self.reserved_key(),
        )?;
        if let SearchOutcome::Found { position } = outcome {
            self.land(position);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::context::{Binding, ContextArena};
    use crate::environment::{Environment, Slot};
    use crate::heap::{Address, Heap, Object, Value};
    use crate::predicate::ExprEvaluator;
    use crate::trace::{Event, EventKind, Location, State, TraceStore};

    /// Five events; the program scope binds `i` to the event index and the
    /// heap holds an object whose `hits` field equals the index.
    fn numbered_trace(len: usize) -> Trace {
        let mut store = TraceStore::new();
        for index in 0..len {
            let env = store
                .push_context(
                    ContextArena::empty(),
                    vec![
                        Binding::new("i", Value::number(index as f64)),
                        Binding::new("o", Value::reference(1)),
                    ],
                )
                .expect("push");
            let heap = Heap::new().update(
                Address(1),
                Object::new().with_field("hits", Value::number(index as f64)),
            );
            let line = index + 1;
            store
                .append(
                    Event::new(Location::new(line, 0, line, 1), EventKind::Let)
                        .with_environment(env)
                        .with_state(State::with_heap(heap)),
                )
                .expect("append");
        }
        store.link_terms("_term_").expect("link")
    }

    fn index_of(env: &Environment) -> usize {
        match env.get("i") {
            Some(Slot::Value(Value::Constant(crate::heap::Constant::Number(n)))) => *n as usize,
            other => panic!("unexpected binding {other:?}"),
        }
    }

    #[test]
    fn empty_trace_is_not_found() {
        let trace = TraceStore::new().link_terms("_term_").expect("link");
        let outcome = search(&trace, 0, "true", &ExprEvaluator::new(), "X").expect("search");
        assert_eq!(outcome, SearchOutcome::NotFound);
    }

    #[test]
    fn search_wraps_past_the_end() {
        let trace = numbered_trace(5);
        let outcome = search(&trace, 3, "i == 1", &ExprEvaluator::new(), "X").expect("search");
        assert_eq!(outcome, SearchOutcome::Found { position: 1 });
    }

    #[test]
    fn visits_every_other_position_in_circular_order_then_the_start() {
        let trace = numbered_trace(5);
        let visited = RefCell::new(Vec::new());
        let record = |_: &str, env: &Environment| -> Result<bool, EvalError> {
            visited.borrow_mut().push(index_of(env));
            Ok(false)
        };
        let outcome = search(&trace, 2, "ignored", &record, "X").expect("search");
        assert_eq!(outcome, SearchOutcome::NotFound);
        assert_eq!(visited.into_inner(), vec![3, 4, 0, 1, 2]);
    }

    #[test]
    fn prefers_other_matches_over_the_start() {
        let trace = numbered_trace(5);
        let outcome =
            search(&trace, 2, "i == 2 || i == 0", &ExprEvaluator::new(), "X").expect("search");
        assert_eq!(outcome, SearchOutcome::Found { position: 0 });
    }

    #[test]
    fn falls_back_to_the_start_when_nothing_else_matches() {
        let trace = numbered_trace(5);
        let outcome = search(&trace, 4, "o.hits == 4", &ExprEvaluator::new(), "X").expect("search");
        assert_eq!(outcome, SearchOutcome::Found { position: 4 });
    }

    #[test]
    fn errors_everywhere_are_reported_distinctly() {
        let trace = numbered_trace(5);
        let failing = |_: &str, _: &Environment| -> Result<bool, EvalError> {
            Err(EvalError::UnknownIdentifier("y".to_string()))
        };
        let outcome = search(&trace, 0, "y", &failing, "X").expect("search");
        assert_eq!(
            outcome,
            SearchOutcome::AllErrored {
                attempts: 5,
                last_error: "y is not defined".to_string(),
            }
        );

        let outcome = search(&trace, 0, "i ==", &ExprEvaluator::new(), "X").expect("search");
        assert!(matches!(outcome, SearchOutcome::AllErrored { attempts: 5, .. }));
    }

    #[test]
    fn partial_errors_do_not_stop_the_scan() {
        let trace = numbered_trace(5);
        let flaky = |_: &str, env: &Environment| -> Result<bool, EvalError> {
            match index_of(env) {
                0 | 1 => Err(EvalError::UnknownIdentifier("z".to_string())),
                2 => Ok(true),
                _ => Ok(false),
            }
        };
        let outcome = search(&trace, 0, "z", &flaky, "X").expect("search");
        assert_eq!(outcome, SearchOutcome::Found { position: 2 });

        let never = |_: &str, env: &Environment| -> Result<bool, EvalError> {
            if index_of(env) == 3 {
                Ok(false)
            } else {
                Err(EvalError::UnknownIdentifier("z".to_string()))
            }
        };
        let outcome = search(&trace, 0, "z", &never, "X").expect("search");
        assert_eq!(outcome, SearchOutcome::NotFound);
    }

    #[test]
    fn reserved_namespace_is_visible_to_predicates() {
        let trace = numbered_trace(5);
        let outcome =
            search(&trace, 0, "X.line == 4 && X.kind == 'let'", &ExprEvaluator::new(), "X")
                .expect("search");
        assert_eq!(outcome, SearchOutcome::Found { position: 3 });
    }

    #[test]
    fn dangling_references_abort_the_search() {
        let mut store = TraceStore::new();
        let env = store
            .push_context(
                ContextArena::empty(),
                vec![Binding::new("o", Value::reference(77))],
            )
            .expect("push");
        store
            .append(
                Event::new(Location::new(1, 0, 1, 1), EventKind::Enter).with_environment(env),
            )
            .expect("append");
        let trace = store.link_terms("_term_").expect("link");
        let result = search(&trace, 0, "o.size", &ExprEvaluator::new(), "X");
        assert_eq!(result, Err(ConsistencyError::MissingObject(Address(77))));
    }

    #[test]
    fn session_search_moves_the_cursor_only_on_success() {
        let trace = numbered_trace(5);
        let evaluator = ExprEvaluator::new();
        let mut session = NavigationSession::new(&trace);
        session.set_cursor(3);
        assert_eq!(
            session.search("i == 1", &evaluator).expect("search"),
            SearchOutcome::Found { position: 1 }
        );
        assert_eq!(session.position(), 1);
        assert_eq!(
            session.search("i == 9", &evaluator).expect("search"),
            SearchOutcome::NotFound
        );
        assert_eq!(session.position(), 1);
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(SearchOutcome::NotFound.to_string(), "not found");
        assert_eq!(
            SearchOutcome::Found { position: 4 }.to_string(),
            "found at 4"
        );
        let json = serde_json::to_value(SearchOutcome::Found { position: 4 }).expect("json");
        assert_eq!(json, serde_json::json!({ "outcome": "found", "position": 4 }));
    }
}
