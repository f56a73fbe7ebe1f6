mod fake_api;

use fake_api::FakeApi;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar(api: &FakeApi) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_agencyd");
    let mut child = Command::new(exe)
        .env_remove("AGENCYD_CONFIG")
        .env("AGENCYD_API_URL", &api.base_url)
        .env("AGENCYD_API_TOKEN", "test-token")
        .env("AGENCYD_TIMEOUT_SECS", "5")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn agencyd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn send_line(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, line: &str) -> serde_json::Value {
    writeln!(stdin, "{}", line).expect("write request");
    stdin.flush().expect("flush request");
    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn health_reports_version_and_session() {
    let api = FakeApi::start();
    let (_child, mut stdin, mut reader) = spawn_sidecar(&api);

    let resp = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(resp["ok"], json!(true));
    assert_eq!(resp["result"]["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(resp["result"]["session"]["signedIn"], json!(true));
    assert_eq!(resp["result"]["openViews"], json!(0));
    assert_eq!(resp["result"]["rowsPerPageOptions"], json!([5, 10, 25]));
    assert!(api.requests().is_empty());
}

#[test]
fn malformed_and_unknown_requests_get_error_envelopes() {
    let api = FakeApi::start();
    let (_child, mut stdin, mut reader) = spawn_sidecar(&api);

    let bad = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    let unknown = request(&mut stdin, &mut reader, "2", "students.reorder", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    let family = request(
        &mut stdin,
        &mut reader,
        "3",
        "views.open",
        json!({ "family": "payments" }),
    );
    assert_eq!(error_code(&family), Some("bad_params"));
    assert!(family["error"]["details"]["known"]
        .as_array()
        .expect("known families")
        .contains(&json!("course-associations")));

    let missing = request(
        &mut stdin,
        &mut reader,
        "4",
        "views.get",
        json!({ "viewId": "nope" }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));

    let zero = request(
        &mut stdin,
        &mut reader,
        "5",
        "views.open",
        json!({ "family": "agents", "rowsPerPage": 0 }),
    );
    assert_eq!(error_code(&zero), Some("bad_params"));
    assert!(api.requests().is_empty());
}

#[test]
fn cleared_session_blocks_requests_until_set_again() {
    let api = FakeApi::start();
    api.route("GET", "/api/intakes", 200, Some(json!({ "intakes": [], "total": 0 })));
    let (_child, mut stdin, mut reader) = spawn_sidecar(&api);

    let cleared = request(&mut stdin, &mut reader, "1", "session.clear", json!({}));
    assert_eq!(cleared["result"]["signedIn"], json!(false));

    let open = request(
        &mut stdin,
        &mut reader,
        "2",
        "views.open",
        json!({ "family": "intakes" }),
    );
    assert_eq!(error_code(&open), Some("signed_out"));
    assert_eq!(open["error"]["details"]["redirect"], json!("/auth/sign-in"));
    assert!(api.requests().is_empty());

    let set = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.set",
        json!({ "token": "fresh-token" }),
    );
    assert_eq!(set["result"]["signedIn"], json!(true));

    let open = request(
        &mut stdin,
        &mut reader,
        "4",
        "views.open",
        json!({ "family": "intakes" }),
    );
    assert_eq!(open["ok"], json!(true));
    assert_eq!(
        api.last_request().authorization.as_deref(),
        Some("Bearer fresh-token")
    );
}
