//! Unit tests for the session dispatch loop, driven over in-memory streams.
//!
//! No inference server is involved: everything here exercises the
//! disconnected paths and the loop's error handling.

use std::io::Cursor;

use serde_json::{json, Value};

use nitrogen_sidecar::protocol::{Command, Response};
use nitrogen_sidecar::session::{Outcome, Session};
use nitrogen_sidecar::Settings;

fn test_settings() -> Settings {
    Settings {
        // Keep connect failures fast; no server listens in these tests.
        timeout_ms: 300,
        ..Settings::default()
    }
}

/// Run the loop over a scripted stdin and collect the JSON output lines.
async fn run_script(settings: Settings, script: &str) -> Vec<Value> {
    let mut out = Cursor::new(Vec::new());
    Session::new(settings)
        .run(script.as_bytes(), &mut out)
        .await
        .expect("session loop must not fail");

    String::from_utf8(out.into_inner())
        .expect("output must be UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each output line must be JSON"))
        .collect()
}

#[tokio::test]
async fn ready_is_emitted_before_any_command() {
    let responses = run_script(test_settings(), "").await;

    assert_eq!(responses, vec![json!({"type": "ready"})]);
}

#[tokio::test]
async fn ping_reports_disconnected_state() {
    let responses = run_script(test_settings(), "{\"type\":\"ping\"}\n").await;

    assert_eq!(responses[1], json!({"type": "pong", "connected": false}));
}

#[tokio::test]
async fn predict_without_connection_fails_in_the_prediction_envelope() {
    let responses =
        run_script(test_settings(), "{\"type\":\"predict\",\"image\":\"AAAA\"}\n").await;

    assert_eq!(
        responses[1],
        json!({"type": "prediction", "error": "not connected"})
    );
}

#[tokio::test]
async fn unknown_command_is_reported() {
    let responses = run_script(test_settings(), "{\"type\":\"reboot\"}\n").await;

    assert_eq!(
        responses[1],
        json!({"type": "error", "message": "unknown command: reboot"})
    );
}

#[tokio::test]
async fn malformed_json_keeps_the_loop_alive() {
    let script = "this is not json\n{\"type\":\"ping\"}\n";
    let responses = run_script(test_settings(), script).await;

    assert_eq!(responses[1]["type"], "error");
    let message = responses[1]["message"]
        .as_str()
        .expect("error response must carry a message");
    assert!(
        message.contains("invalid json"),
        "message must mention invalid json, got: {message}"
    );

    // The loop kept running: the following ping was answered.
    assert_eq!(responses[2], json!({"type": "pong", "connected": false}));
}

#[tokio::test]
async fn quit_stops_the_loop() {
    let script = "{\"type\":\"ping\"}\n{\"type\":\"quit\"}\n{\"type\":\"ping\"}\n";
    let responses = run_script(test_settings(), script).await;

    assert_eq!(
        responses.len(),
        2,
        "nothing after quit may be answered: {responses:?}"
    );
    assert_eq!(responses[1]["type"], "pong");
}

#[tokio::test]
async fn blank_lines_are_skipped_silently() {
    let script = "\n   \n{\"type\":\"ping\"}\n";
    let responses = run_script(test_settings(), script).await;

    assert_eq!(responses.len(), 2, "blank lines must produce no responses");
}

#[tokio::test]
async fn disconnect_while_disconnected_still_confirms() {
    let responses = run_script(test_settings(), "{\"type\":\"disconnect\"}\n").await;

    assert_eq!(responses[1], json!({"type": "disconnected"}));
}

#[tokio::test]
async fn connect_failure_yields_an_error_response() {
    // Nothing listens on the discard port.
    let script = "{\"type\":\"connect\",\"addr\":\"tcp://127.0.0.1:1\"}\n{\"type\":\"ping\"}\n";
    let responses = run_script(test_settings(), script).await;

    assert_eq!(responses[1]["type"], "error");
    let message = responses[1]["message"]
        .as_str()
        .expect("error response must carry a message");
    assert!(
        message.contains("failed to connect"),
        "message must mention the connect failure, got: {message}"
    );

    // The failed connect leaves the session disconnected.
    assert_eq!(responses[2], json!({"type": "pong", "connected": false}));
}

#[tokio::test]
async fn oversized_line_is_reported_and_skipped() {
    let settings = Settings {
        max_line_bytes: 32,
        ..test_settings()
    };
    let long_line = format!("{{\"type\":\"predict\",\"image\":\"{}\"}}\n", "A".repeat(64));
    let script = format!("{long_line}{{\"type\":\"ping\"}}\n");
    let responses = run_script(settings, &script).await;

    assert_eq!(responses[1]["type"], "error");
    let message = responses[1]["message"]
        .as_str()
        .expect("error response must carry a message");
    assert!(
        message.contains("line too long"),
        "message must mention the line limit, got: {message}"
    );

    // The loop must survive the oversized line: the follow-up ping is
    // answered, and the long line produced exactly one error response.
    assert_eq!(
        responses.get(2),
        Some(&json!({"type": "pong", "connected": false})),
        "commands after an oversized line must still be answered"
    );
    assert_eq!(responses.len(), 3);
}

#[tokio::test]
async fn multiple_oversized_lines_each_get_one_error() {
    let settings = Settings {
        max_line_bytes: 32,
        ..test_settings()
    };
    let long_line = format!("{{\"type\":\"predict\",\"image\":\"{}\"}}\n", "B".repeat(64));
    let script = format!("{long_line}{long_line}{{\"type\":\"ping\"}}\n");
    let responses = run_script(settings, &script).await;

    assert_eq!(responses[1]["type"], "error");
    assert_eq!(responses[2]["type"], "error");
    assert_eq!(responses[3]["type"], "pong");
    assert_eq!(responses.len(), 4);
}

#[tokio::test]
async fn dispatch_quit_returns_shutdown() {
    let mut session = Session::new(test_settings());

    let outcome = session.dispatch(Command::Quit).await;
    assert!(
        matches!(outcome, Outcome::Shutdown),
        "quit must shut the loop down"
    );
}

#[tokio::test]
async fn dispatch_ping_replies_with_pong() {
    let mut session = Session::new(test_settings());

    match session.dispatch(Command::Ping).await {
        Outcome::Reply(Response::Pong { connected }) => {
            assert!(!connected, "a fresh session must be disconnected");
        }
        other => panic!("expected a pong reply, got: {other:?}"),
    }
}
