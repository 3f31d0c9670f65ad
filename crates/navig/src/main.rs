use navig::{
    event_environment, load_trace, render_context, set_debug_trace, ContextId, ExprEvaluator,
    NavigConfig, NavigError, NavigationSession,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), NavigError> {
    let args: Vec<String> = env::args().skip(1).collect();
    let (debug_trace, args) = consume_debug_trace_flag(&args);
    let Some((command, rest)) = args.split_first() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "-h" | "--help" => {
            print_help();
            Ok(())
        }
        "replay" => cmd_replay(rest, debug_trace),
        "search" => cmd_search(rest, debug_trace),
        other => Err(NavigError::InvalidCommand(format!(
            "unknown command {other} (try --help)"
        ))),
    }
}

fn print_help() {
    println!(
        "navig\n\nUSAGE:\n  navig <COMMAND>\n\nCOMMANDS:\n  replay <trace.json> [--config <navig.toml>]\n  search <trace.json> <predicate> [--from <n>] [--config <navig.toml>]\n\nREPLAY COMMANDS (stdin, one per line):\n  r  restart          s  step\n  b  back-step        n  next\n  p  previous         f  finish\n  g <n>  go to n      ? <predicate>  search\n  e  environment      c  context\n  q  quit\n\n  --debug-trace    structured debug events on stderr\n  -h, --help"
    );
}

fn consume_debug_trace_flag(args: &[String]) -> (bool, Vec<String>) {
    let mut enabled = false;
    let mut out = Vec::new();
    for arg in args {
        if arg == "--debug-trace" {
            enabled = true;
        } else {
            out.push(arg.clone());
        }
    }
    (enabled, out)
}

struct Invocation {
    positional: Vec<String>,
    config: Option<String>,
    from: Option<i64>,
}

fn parse_invocation(args: &[String], allow_from: bool) -> Result<Invocation, NavigError> {
    let mut invocation = Invocation {
        positional: Vec::new(),
        config: None,
        from: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = iter.next() else {
                    return Err(NavigError::InvalidCommand(
                        "--config expects a path".to_string(),
                    ));
                };
                invocation.config = Some(path.clone());
            }
            "--from" if allow_from => {
                let Some(value) = iter.next() else {
                    return Err(NavigError::InvalidCommand(
                        "--from expects a position".to_string(),
                    ));
                };
                let from = value.parse().map_err(|_| {
                    NavigError::InvalidCommand(format!("invalid position {value}"))
                })?;
                invocation.from = Some(from);
            }
            other if other.starts_with("--") => {
                return Err(NavigError::InvalidCommand(format!(
                    "unexpected argument {other}"
                )));
            }
            value => invocation.positional.push(value.to_string()),
        }
    }
    Ok(invocation)
}

fn load_config(
    explicit: Option<&str>,
    trace_path: &Path,
    debug_trace: bool,
) -> Result<NavigConfig, NavigError> {
    let config = match explicit {
        Some(path) => NavigConfig::load(Path::new(path))?,
        None => {
            let dir = trace_path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .map_or_else(env::current_dir, Ok)?;
            NavigConfig::discover(&dir)?
        }
    };
    if debug_trace {
        set_debug_trace(Some(true));
    } else {
        config.apply_debug();
    }
    Ok(config)
}

fn cmd_search(args: &[String], debug_trace: bool) -> Result<(), NavigError> {
    let invocation = parse_invocation(args, true)?;
    let [trace_path, predicate] = invocation.positional.as_slice() else {
        return Err(NavigError::InvalidCommand(
            "search expects <trace.json> <predicate>".to_string(),
        ));
    };
    let trace_path = Path::new(trace_path);
    let config = load_config(invocation.config.as_deref(), trace_path, debug_trace)?;
    let trace = load_trace(trace_path, &config.environment.term_key)?;

    let mut session =
        NavigationSession::new(&trace).with_reserved_key(&config.environment.reserved_key);
    session.set_cursor(invocation.from.unwrap_or(0));
    let from = session.position();
    let outcome = session.search(predicate, &ExprEvaluator::new())?;
    let reply = serde_json::json!({
        "from": from,
        "length": session.len(),
        "outcome": outcome.as_str(),
        "message": outcome.to_string(),
        "search": outcome,
        "event": describe_event(&session),
    });
    println!("{reply}");
    Ok(())
}

fn cmd_replay(args: &[String], debug_trace: bool) -> Result<(), NavigError> {
    let invocation = parse_invocation(args, false)?;
    let [trace_path] = invocation.positional.as_slice() else {
        return Err(NavigError::InvalidCommand(
            "replay expects <trace.json>".to_string(),
        ));
    };
    let trace_path = Path::new(trace_path);
    let config = load_config(invocation.config.as_deref(), trace_path, debug_trace)?;
    let trace = load_trace(trace_path, &config.environment.term_key)?;

    let mut session =
        NavigationSession::new(&trace).with_reserved_key(&config.environment.reserved_key);
    let evaluator = ExprEvaluator::new();
    let depth = config.render.auto_expand_depth;
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = match ReplayCommand::parse(line) {
            Ok(ReplayCommand::Quit) => break,
            Ok(command) => execute(&mut session, &evaluator, command, depth)?,
            Err(err) => serde_json::json!({
                "position": session.position(),
                "length": session.len(),
                "outcome": "invalid",
                "error": err.to_string(),
                "event": describe_event(&session),
            }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

enum ReplayCommand {
    Restart,
    Step,
    BackStep,
    Next,
    Previous,
    Finish,
    Goto(i64),
    Search(String),
    Environment,
    Context,
    Quit,
}

impl ReplayCommand {
    fn parse(line: &str) -> Result<Self, NavigError> {
        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((head, arg)) => (head, arg.trim()),
            None => (line, ""),
        };
        // `?` takes the rest of the line, spaces included, and may be glued
        // to the predicate.
        if let Some(predicate) = line.strip_prefix('?') {
            let predicate = predicate.trim();
            if predicate.is_empty() {
                return Err(NavigError::InvalidCommand(
                    "? expects a predicate".to_string(),
                ));
            }
            return Ok(ReplayCommand::Search(predicate.to_string()));
        }
        let command = match (head, arg) {
            ("r", "") => ReplayCommand::Restart,
            ("s", "") => ReplayCommand::Step,
            ("b", "") => ReplayCommand::BackStep,
            ("n", "") => ReplayCommand::Next,
            ("p", "") => ReplayCommand::Previous,
            ("f", "") => ReplayCommand::Finish,
            ("e", "") => ReplayCommand::Environment,
            ("c", "") => ReplayCommand::Context,
            ("q", "") => ReplayCommand::Quit,
            ("g", value) => ReplayCommand::Goto(value.parse().map_err(|_| {
                NavigError::InvalidCommand(format!("g expects a position, got '{value}'"))
            })?),
            _ => {
                return Err(NavigError::InvalidCommand(format!(
                    "unknown replay command '{line}'"
                )))
            }
        };
        Ok(command)
    }
}

fn execute(
    session: &mut NavigationSession<'_>,
    evaluator: &ExprEvaluator,
    command: ReplayCommand,
    depth: usize,
) -> Result<serde_json::Value, NavigError> {
    let mut extra = serde_json::Map::new();
    let outcome = match command {
        ReplayCommand::Restart => session.restart().as_str(),
        ReplayCommand::Step => session.step().as_str(),
        ReplayCommand::BackStep => session.back_step().as_str(),
        ReplayCommand::Next => session.next().as_str(),
        ReplayCommand::Previous => session.previous().as_str(),
        ReplayCommand::Finish => session.finish().as_str(),
        ReplayCommand::Goto(index) => session.set_cursor(index).as_str(),
        ReplayCommand::Search(predicate) => {
            let outcome = session.search(&predicate, evaluator)?;
            extra.insert("message".to_string(), outcome.to_string().into());
            outcome.as_str()
        }
        ReplayCommand::Environment => match session.current() {
            Some(event) => {
                let env = event_environment(session.trace(), event, session.reserved_key())?;
                extra.insert("environment".to_string(), env.describe(depth)?);
                "shown"
            }
            None => "empty",
        },
        ReplayCommand::Context => match session.current() {
            Some(event) => {
                let context = render_context(
                    &event.state.heap,
                    session.trace().contexts(),
                    event.context.unwrap_or(ContextId::EMPTY),
                    depth,
                )?;
                extra.insert("context".to_string(), serde_json::json!(context));
                "shown"
            }
            None => "empty",
        },
        ReplayCommand::Quit => "quit",
    };

    let mut reply = serde_json::Map::new();
    reply.insert("position".to_string(), session.position().into());
    reply.insert("length".to_string(), session.len().into());
    reply.insert("outcome".to_string(), outcome.into());
    reply.insert("event".to_string(), describe_event(session));
    reply.extend(extra);
    Ok(serde_json::Value::Object(reply))
}

fn describe_event(session: &NavigationSession<'_>) -> serde_json::Value {
    let Some(event) = session.current() else {
        return serde_json::Value::Null;
    };
    serde_json::json!({
        "index": session.position(),
        "kind": event.kind,
        "line": event.line(),
        "location": event.location,
        "term": event.current_term(),
    })
}
