//! End-to-end tests through the HTTP router, with a fake Judge0 and shell
//! scripts standing in for the JDK.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use coderun::http_server::router;
use coderun::judge::{Encoding, JudgeClient};
use coderun::language::LanguageTable;
use coderun::local::{LocalConfig, LocalExecutor, Program};
use coderun::state::AppState;
use coderun::Dispatcher;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Clone, Default)]
struct Judge {
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Judge {
    fn calls(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    fn last_source(&self) -> String {
        let bodies = self.bodies.lock().unwrap();
        let encoded = bodies.last().unwrap()["source_code"].as_str().unwrap().to_string();
        String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap()
    }
}

/// Base64-mode judge that sums integers from stdin. Sources mentioning
/// `FAIL_JUDGE` get a 500.
async fn judge_submit(
    State(judge): State<Judge>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    judge.bodies.lock().unwrap().push(body.clone());
    let source = STANDARD.decode(body["source_code"].as_str().unwrap()).unwrap();
    if String::from_utf8_lossy(&source).contains("FAIL_JUDGE") {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"})));
    }
    let stdin = STANDARD.decode(body["stdin"].as_str().unwrap()).unwrap();
    let sum: i64 = String::from_utf8(stdin)
        .unwrap()
        .split_whitespace()
        .map(|n| n.parse::<i64>().unwrap())
        .sum();
    (
        StatusCode::CREATED,
        Json(json!({
            "stdout": STANDARD.encode(format!("{}\n", sum)),
            "stderr": null,
            "compile_output": null,
            "status": {"id": 3, "description": "Accepted"},
            "time": "0.01"
        })),
    )
}

async fn spawn_judge() -> (String, Judge) {
    let judge = Judge::default();
    let app = Router::new()
        .route("/submissions/", post(judge_submit))
        .with_state(judge.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), judge)
}

fn sh(script: &str) -> Program {
    Program {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
    }
}

async fn app(root: &TempDir, runtime: &str) -> (Router, Judge) {
    let (url, judge) = spawn_judge().await;
    let dispatcher = Dispatcher::new(
        Arc::new(LanguageTable::builtin()),
        LocalExecutor::new(LocalConfig {
            sandbox_root: root.path().join("sandbox"),
            compiler: sh("true"),
            runtime: sh(runtime),
            fsize_kb: 1024,
        }),
        JudgeClient::new(&url, Encoding::Base64),
    );
    (router(AppState::new(dispatcher)), judge)
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_raw(app, method, uri, body.map(|b| b.to_string())).await
}

/// Like `call`, but the body is sent verbatim so key order is the caller's.
async fn call_raw(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body)).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, value)
}

fn dir_is_empty_or_missing(path: &Path) -> bool {
    std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[tokio::test]
async fn unsupported_language_touches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "true").await;

    let (status, body) = call(
        app,
        "POST",
        "/run",
        Some(json!({
            "language": "cobol",
            "entrypoint": "Main.java",
            "files": {"Main.java": ""},
            "jars": {"lib.jar": "UEsDBA=="}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("cobol"));
    assert_eq!(judge.calls(), 0);
    assert!(!root.path().join("sandbox").exists());
}

#[tokio::test]
async fn remote_run_sums_stdin() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "true").await;

    let (status, body) = call_raw(
        app,
        "POST",
        "/run",
        Some(
            r#"{
                "language": "Python",
                "entrypoint": "main.py",
                "files": {
                    "main.py": "import helper\nprint(helper.add(int(input()), int(input())))",
                    "helper.py": "def add(a, b):\n    return a + b"
                },
                "stdin": "3\n4\n",
                "timeout_seconds": 5
            }"#
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["output"].as_str().unwrap().contains('7'));
    assert_eq!(body["error"], Value::Null);
    assert_eq!(body["success"], true);
    assert!(body.get("raw").is_none());

    let source = judge.last_source();
    assert!(source.starts_with("# FILE: main.py\n"));
    assert!(source.find("# FILE: main.py").unwrap() < source.find("# FILE: helper.py").unwrap());
}

#[tokio::test]
async fn files_reach_the_judge_in_request_order() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "true").await;

    let (status, _) = call_raw(
        app,
        "POST",
        "/run",
        Some(
            r#"{"language": "ruby", "entrypoint": "z.rb",
                "files": {"z.rb": "require_relative 'a'", "a.rb": "", "m.rb": ""}}"#
                .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let source = judge.last_source();
    let z = source.find("# FILE: z.rb").unwrap();
    let a = source.find("# FILE: a.rb").unwrap();
    let m = source.find("# FILE: m.rb").unwrap();
    assert!(z < a && a < m);
}

#[tokio::test]
async fn raw_response_on_request() {
    let root = tempfile::tempdir().unwrap();
    let (app, _judge) = app(&root, "true").await;

    let (status, body) = call(
        app,
        "POST",
        "/run?raw=true",
        Some(json!({
            "language": "c",
            "entrypoint": "main.c",
            "files": {"main.c": "int main(){}"},
            "stdin": "1 2"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "3\n");
    assert_eq!(body["raw"]["status"]["description"], "Accepted");
    assert_eq!(body["raw"]["time"], "0.01");
}

#[tokio::test]
async fn java_without_jars_goes_remote_with_metadata_free_source() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "echo local").await;

    let (status, body) = call(
        app,
        "POST",
        "/run",
        Some(json!({
            "language": "java",
            "entrypoint": "Main.java",
            "files": {"Main.java": "public class Main {}"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "0\n");
    assert_eq!(judge.calls(), 1);
    assert!(!judge.last_source().contains("JAR:"));
}

#[tokio::test]
async fn jars_on_remote_languages_travel_as_metadata() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "echo local").await;

    let (status, _) = call(
        app,
        "POST",
        "/run",
        Some(json!({
            "language": "python",
            "entrypoint": "main.py",
            "files": {"main.py": "print(0)"},
            "jars": {"lib.jar": "UEsDBA=="}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(judge.calls(), 1);
    assert!(judge.last_source().ends_with("# JAR:lib.jar:UEsDBA==\n"));
    assert!(!root.path().join("sandbox").exists());
}

#[tokio::test]
async fn java_with_jars_runs_locally() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "read a; read b; echo $((a * b))").await;

    let (status, body) = call(
        app,
        "POST",
        "/run",
        Some(json!({
            "language": "java",
            "entrypoint": "Main.java",
            "files": {"Main.java": "public class Main {}"},
            "jars": {"lib.jar": "UEsDBA=="},
            "stdin": "6\n7\n"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "42\n");
    assert_eq!(body["success"], true);
    assert_eq!(judge.calls(), 0);
    assert!(dir_is_empty_or_missing(&root.path().join("sandbox")));
}

#[tokio::test]
async fn local_path_traversal_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let (app, _judge) = app(&root, "true").await;

    let (status, _) = call(
        app,
        "POST",
        "/run",
        Some(json!({
            "language": "java",
            "entrypoint": "Main.java",
            "files": {"Main.java": "", "../evil.txt": "x"},
            "jars": {"lib.jar": "UEsDBA=="}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!root.path().join("evil.txt").exists());
    assert!(!root.path().join("sandbox").exists());
}

#[tokio::test]
async fn judge_error_status_propagates() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "true").await;

    let (status, body) = call(
        app,
        "POST",
        "/run",
        Some(json!({
            "language": "bash",
            "entrypoint": "run.sh",
            "files": {"run.sh": "echo FAIL_JUDGE"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("boom"));
    assert_eq!(judge.calls(), 1);
}

#[tokio::test]
async fn empty_files_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    let (app, judge) = app(&root, "true").await;

    let (status, _) = call(
        app,
        "POST",
        "/run",
        Some(json!({"language": "python", "entrypoint": "main.py", "files": {}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn root_and_health() {
    let root = tempfile::tempdir().unwrap();
    let (app, _judge) = app(&root, "true").await;

    let (status, body) = call(app.clone(), "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let languages: Vec<&str> = body["languages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l.as_str().unwrap())
        .collect();
    assert!(languages.contains(&"java"));
    assert!(languages.contains(&"python"));

    let (status, body) = call(app.clone(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let (status, body) = call(app, "GET", "/languages", None).await;
    assert_eq!(status, StatusCode::OK);
    let java = body
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == "java")
        .unwrap();
    assert_eq!(java["judge_id"], 62);
    assert_eq!(java["requires_local_sandbox"], true);
}
