use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn navig() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_navig"));
    command.env_remove("NAVIG_DEBUG_TRACE");
    command
}

fn replay(args: &[&str], input: &str) -> Output {
    let mut child = navig()
        .arg("replay")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn navig replay");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write commands");
    child.wait_with_output().expect("wait for navig")
}

fn replies(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json reply"))
        .collect()
}

#[test]
fn replay_answers_every_command_until_quit() {
    let trace = fixture("calls.json");
    let output = replay(
        &[trace.to_str().expect("utf-8 path")],
        "s\nn\n\ne\nc\nbogus\ng 4\nc\nq\ns\n",
    );
    assert!(output.status.success(), "{output:?}");
    let replies = replies(&output);
    assert_eq!(replies.len(), 7);

    assert_eq!(replies[0]["outcome"], "moved");
    assert_eq!(replies[0]["position"], 1);
    assert_eq!(replies[0]["length"], 7);
    assert_eq!(replies[0]["event"]["kind"], "let");
    assert_eq!(replies[0]["event"]["term"]["start"]["line"], 2);

    assert_eq!(replies[1]["position"], 2);
    assert_eq!(replies[1]["event"]["location"]["file"], "main.js");

    let environment = &replies[2]["environment"];
    assert_eq!(replies[2]["outcome"], "shown");
    assert_eq!(environment["n"]["text"], "3");
    assert_eq!(environment["acc"]["label"], "<Object>(1)");
    assert_eq!(environment["acc"]["fields"][0]["name"], "count");
    assert_eq!(environment["X"]["kind"], "enter");
    assert_eq!(environment["X"]["line"], 3.0);

    assert_eq!(replies[3]["context"], serde_json::json!([]));

    assert_eq!(replies[4]["outcome"], "invalid");
    assert_eq!(replies[4]["position"], 2);

    assert_eq!(replies[5]["position"], 4);
    assert_eq!(replies[6]["context"][0]["name"], "_term_");
    assert_eq!(replies[6]["context"][0]["node"]["kind"], "structured");
}

#[test]
fn replay_search_reports_outcomes() {
    let trace = fixture("calls.json");
    let output = replay(
        &[trace.to_str().expect("utf-8 path")],
        "? acc.count == 2\n? nosuch\n?\n",
    );
    assert!(output.status.success(), "{output:?}");
    let replies = replies(&output);
    assert_eq!(replies[0]["outcome"], "found");
    assert_eq!(replies[0]["position"], 4);
    assert_eq!(replies[1]["outcome"], "all_errored");
    assert!(replies[1]["message"]
        .as_str()
        .expect("message")
        .contains("nosuch is not defined"));
    assert_eq!(replies[2]["outcome"], "invalid");
}

#[test]
fn search_command_uses_config_reserved_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("navig.toml");
    std::fs::write(&config, "[environment]\nreserved_key = \"I\"\n").expect("write config");
    let trace = fixture("calls.json");
    let output = navig()
        .arg("search")
        .arg(&trace)
        .arg("I.line == 7")
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run navig search");
    assert!(output.status.success(), "{output:?}");
    let reply: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json reply");
    assert_eq!(reply["outcome"], "found");
    assert_eq!(reply["search"]["position"], 6);
    assert_eq!(reply["event"]["kind"], "return");
}

#[test]
fn search_from_wraps_around() {
    let trace = fixture("flat.json");
    let output = navig()
        .arg("search")
        .arg(&trace)
        .arg("i == 0")
        .args(["--from", "2"])
        .output()
        .expect("run navig search");
    assert!(output.status.success(), "{output:?}");
    let reply: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json reply");
    assert_eq!(reply["from"], 2);
    assert_eq!(reply["search"]["position"], 0);
}

#[test]
fn debug_trace_flag_emits_events_on_stderr() {
    let trace = fixture("flat.json");
    let output = navig()
        .arg("search")
        .arg(&trace)
        .arg("done")
        .arg("--debug-trace")
        .output()
        .expect("run navig search");
    assert!(output.status.success(), "{output:?}");
    let events: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    assert!(events.iter().any(|event| event["kind"] == "trace.linked"));
    let done = events
        .iter()
        .find(|event| event["kind"] == "search.done")
        .expect("search.done event");
    assert_eq!(done["evaluated"], 3);
}

#[test]
fn broken_traces_fail_with_a_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let trace = dir.path().join("broken.json");
    std::fs::write(&trace, r#"{ "contexts": [ { "parent": 3 } ] }"#).expect("write trace");
    let output = navig()
        .arg("search")
        .arg(&trace)
        .arg("true")
        .output()
        .expect("run navig search");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not precede"), "{stderr}");

    let output = navig().arg("frobnicate").output().expect("run navig");
    assert!(!output.status.success());
}
