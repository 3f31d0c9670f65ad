#![no_main]

use libfuzzer_sys::fuzz_target;
use navig::{NavigationSession, DEFAULT_TERM_KEY};

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    let Ok(trace) = navig::parse_trace(&src, DEFAULT_TERM_KEY) else {
        return;
    };
    // Navigation must stay in bounds on anything the loader accepts.
    let mut session = NavigationSession::new(&trace);
    session.finish();
    session.previous();
    session.next();
    assert!(trace.is_empty() || session.position() < trace.len());
});
