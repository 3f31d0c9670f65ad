use super::*;
use crate::trace::{Location, TraceStore};

const ENTER: EventKind = EventKind::Enter;
const RETURN: EventKind = EventKind::Return;
const LET: EventKind = EventKind::Let;
const CASE: EventKind = EventKind::Case;

fn trace_of(kinds: &[EventKind]) -> Trace {
    let mut store = TraceStore::new();
    for (index, kind) in kinds.iter().enumerate() {
        let line = index + 1;
        store
            .append(Event::new(Location::new(line, 0, line, 1), *kind))
            .expect("append");
    }
    store.link_terms("_term_").expect("link")
}

fn at<'t>(trace: &'t Trace, position: i64) -> NavigationSession<'t> {
    let mut session = NavigationSession::new(trace);
    session.set_cursor(position);
    session
}

#[test]
fn every_operation_is_a_no_op_on_an_empty_trace() {
    let trace = trace_of(&[]);
    let mut session = NavigationSession::new(&trace);
    assert_eq!(session.restart(), Motion::Empty);
    assert_eq!(session.set_cursor(3), Motion::Empty);
    assert_eq!(session.step(), Motion::Empty);
    assert_eq!(session.back_step(), Motion::Empty);
    assert_eq!(session.next(), Motion::Empty);
    assert_eq!(session.previous(), Motion::Empty);
    assert_eq!(session.finish(), Motion::Empty);
    assert_eq!(session.position(), 0);
    assert!(session.current().is_none());
}

#[test]
fn set_cursor_clamps_into_the_trace() {
    let trace = trace_of(&[LET, LET, LET, LET]);
    let mut session = NavigationSession::new(&trace);
    session.set_cursor(10);
    assert_eq!(session.position(), 3);
    session.set_cursor(-5);
    assert_eq!(session.position(), 0);
    session.set_cursor(2);
    assert_eq!(session.position(), 2);
}

#[test]
fn steps_move_by_one_and_reject_at_the_ends() {
    let trace = trace_of(&[ENTER, LET, RETURN]);
    let mut session = NavigationSession::new(&trace);
    assert_eq!(session.back_step(), Motion::Rejected);
    assert_eq!(session.position(), 0);
    assert_eq!(session.step(), Motion::Moved);
    assert_eq!(session.step(), Motion::Moved);
    assert_eq!(session.position(), 2);
    assert_eq!(session.step(), Motion::Rejected);
    assert_eq!(session.position(), 2);
    assert_eq!(session.back_step(), Motion::Moved);
    assert_eq!(session.position(), 1);
}

#[test]
fn cursor_never_goes_below_zero_after_restart() {
    let trace = trace_of(&[ENTER, LET, ENTER, CASE, RETURN, RETURN, LET]);
    let mut session = at(&trace, 5);
    session.restart();
    for round in 0..6 {
        if round % 2 == 0 {
            session.previous();
        } else {
            session.back_step();
        }
        assert_eq!(session.position(), 0);
    }
}

// From the outermost `enter` the scan never drops below zero, so `finish`
// runs off the end instead of stopping at the matching `return`.
#[test]
fn finish_from_outermost_enter_parks_at_the_end() {
    let trace = trace_of(&[ENTER, ENTER, ENTER, LET, RETURN, RETURN, RETURN]);
    let mut session = at(&trace, 0);
    assert_eq!(session.finish(), Motion::Parked);
    assert_eq!(session.position(), 6);

    let trace = trace_of(&[ENTER, ENTER, RETURN, RETURN, LET]);
    let mut session = at(&trace, 0);
    assert_eq!(session.finish(), Motion::Parked);
    assert_eq!(session.position(), 4);
    assert_eq!(session.current().map(|event| event.kind), Some(LET));
}

#[test]
fn finish_inside_a_call_lands_just_past_its_return() {
    //                    0      1    2      3    4       5    6       7
    let trace = trace_of(&[ENTER, LET, ENTER, LET, RETURN, LET, RETURN, LET]);
    let mut session = at(&trace, 3);
    assert_eq!(session.finish(), Motion::Moved);
    assert_eq!(session.position(), 5);

    let mut session = at(&trace, 1);
    assert_eq!(session.finish(), Motion::Moved);
    assert_eq!(session.position(), 7);
}

// The enter under the cursor opens a level before the scan starts, so
// `finish` from an inner `enter` leaves the enclosing call as well.
#[test]
fn finish_from_enter_counts_the_entered_call() {
    let trace = trace_of(&[ENTER, LET, ENTER, LET, RETURN, LET, RETURN, LET]);
    let mut session = at(&trace, 2);
    assert_eq!(session.finish(), Motion::Moved);
    assert_eq!(session.position(), 7);
}

#[test]
fn next_skips_nested_calls() {
    //                    0    1      2    3      4    5       6       7
    let trace = trace_of(&[LET, ENTER, LET, ENTER, LET, RETURN, RETURN, LET]);
    let mut session = at(&trace, 0);
    assert_eq!(session.next(), Motion::Moved);
    assert_eq!(session.position(), 1);
    assert_eq!(session.next(), Motion::Moved);
    assert_eq!(session.position(), 7);
}

// A `return` under the cursor is pre-counted when scanning forward, so
// `next` from it moves to the very next event.
#[test]
fn next_from_return_moves_to_the_following_event() {
    let trace = trace_of(&[LET, ENTER, LET, ENTER, LET, RETURN, RETURN, LET]);
    let mut session = at(&trace, 5);
    assert_eq!(session.next(), Motion::Moved);
    assert_eq!(session.position(), 6);
    assert_eq!(session.next(), Motion::Moved);
    assert_eq!(session.position(), 7);
}

#[test]
fn previous_mirrors_next() {
    let trace = trace_of(&[LET, ENTER, LET, ENTER, LET, RETURN, RETURN, LET]);
    let mut session = at(&trace, 7);
    assert_eq!(session.previous(), Motion::Moved);
    assert_eq!(session.position(), 6);
    assert_eq!(session.previous(), Motion::Moved);
    assert_eq!(session.position(), 0);

    let mut session = at(&trace, 1);
    assert_eq!(session.previous(), Motion::Moved);
    assert_eq!(session.position(), 0);
}

#[test]
fn next_then_previous_returns_to_same_depth_neighbour() {
    let trace = trace_of(&[LET, ENTER, LET, RETURN, LET]);
    for start in [0, 3] {
        let mut session = at(&trace, start);
        session.next();
        assert_ne!(session.position() as i64, start);
        session.previous();
        assert_eq!(session.position() as i64, start);
    }

    let flat = trace_of(&[LET, CASE, LET]);
    let mut session = at(&flat, 1);
    session.next();
    assert_eq!(session.position(), 2);
    session.previous();
    assert_eq!(session.position(), 1);
}

#[test]
fn scans_that_run_off_the_trace_park_at_the_last_position() {
    let trace = trace_of(&[LET, ENTER, LET, LET]);
    let mut session = at(&trace, 1);
    assert_eq!(session.next(), Motion::Parked);
    assert_eq!(session.position(), 3);

    let mut session = at(&trace, 3);
    assert_eq!(session.next(), Motion::Parked);
    assert_eq!(session.position(), 3);

    let mut session = at(&trace, 2);
    assert_eq!(session.finish(), Motion::Parked);
    assert_eq!(session.position(), 3);

    let mut session = at(&trace, 0);
    assert_eq!(session.previous(), Motion::Parked);
    assert_eq!(session.position(), 0);
}

#[test]
fn event_queries_follow_the_cursor() {
    let trace = trace_of(&[ENTER, CASE, RETURN]);
    let mut session = NavigationSession::new(&trace).with_reserved_key("S");
    assert_eq!(session.reserved_key(), "S");
    assert_eq!(session.len(), 3);
    session.step();
    assert_eq!(session.current().map(Event::line), Some(2));
    assert_eq!(session.event_at(2).map(|event| event.kind), Some(RETURN));
    assert!(session.event_at(3).is_none());
}
