use std::cell::Cell;

thread_local! {
    static DEBUG_TRACE_OVERRIDE: Cell<Option<bool>> = const { Cell::new(None) };
}

/// Debug events are on when forced for this thread, or when
/// `NAVIG_DEBUG_TRACE=1` is set.
pub fn debug_trace_enabled() -> bool {
    DEBUG_TRACE_OVERRIDE.with(|cell| {
        cell.get()
            .unwrap_or_else(|| std::env::var("NAVIG_DEBUG_TRACE").is_ok_and(|v| v == "1"))
    })
}

pub fn set_debug_trace(enabled: Option<bool>) {
    DEBUG_TRACE_OVERRIDE.with(|cell| cell.set(enabled));
}

pub(crate) fn emit_debug_event(event: serde_json::Value) {
    // JSONL on stderr, one object per event.
    if let Ok(line) = serde_json::to_string(&event) {
        eprintln!("{line}");
    }
}

#[cfg(test)]
pub(crate) fn with_debug_trace<T>(enabled: bool, f: impl FnOnce() -> T) -> T {
    DEBUG_TRACE_OVERRIDE.with(|cell| {
        let prev = cell.get();
        cell.set(Some(enabled));
        let out = f();
        cell.set(prev);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_environment() {
        with_debug_trace(true, || assert!(debug_trace_enabled()));
        with_debug_trace(false, || assert!(!debug_trace_enabled()));
    }

    #[test]
    fn override_is_restored_after_scope() {
        set_debug_trace(Some(false));
        with_debug_trace(true, || {});
        assert!(!debug_trace_enabled());
        set_debug_trace(None);
    }
}
