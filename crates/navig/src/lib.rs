//! Replay, navigation and predicate search over recorded interpreter traces.

mod config;
mod context;
mod debug;
mod diagnostics;
mod environment;
mod heap;
mod loader;
mod navigation;
mod predicate;
mod render;
mod search;
mod trace;

pub use config::{DebugConfig, EnvironmentConfig, NavigConfig, RenderConfig, CONFIG_FILE_NAME};
pub use context::{Binding, ContextArena, ContextId};
pub use debug::{debug_trace_enabled, set_debug_trace};
pub use diagnostics::{
    render_diagnostic, render_diagnostics, Diagnostic, DiagnosticLabel, Position, Span,
};
pub use environment::{
    build_environment, event_environment, Environment, Slot, DEFAULT_RESERVED_KEY,
};
pub use heap::{fields_of, lookup, Address, Constant, Heap, Object, Value};
pub use loader::{load_trace, parse_trace, DEFAULT_TERM_KEY};
pub use navigation::{Motion, NavigationSession};
pub use predicate::{
    parse_predicate, BinaryOp, EvalError, Expr, ExprEvaluator, Literal, Predicate,
    PredicateEvaluator, UnaryOp, PREDICATE_ORIGIN,
};
pub use render::{
    format_number, render, render_context, render_object, text_of_constant, RenderField,
    RenderNode, DEFAULT_EXPAND_DEPTH,
};
pub use search::{search, SearchOutcome};
pub use trace::{Event, EventKind, Location, State, Trace, TraceStore};

/// The recorded trace contradicts itself. Never recoverable: search aborts
/// instead of treating it as a predicate failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("heap has no object at address {0}")]
    MissingObject(Address),
    #[error("context {0} does not exist")]
    UnknownContext(usize),
    #[error("context {child} names parent {parent}, which does not precede it")]
    ForwardParent { child: usize, parent: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum NavigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid trace: {0}")]
    TraceFormat(String),
    #[error("inconsistent trace: {0}")]
    Consistency(#[from] ConsistencyError),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
