//! Integration tests for the handler binary
//!
//! These run the built binary the way the Sensu backend does: event JSON on
//! stdin, configuration from flags and environment, exit code as the result.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

const EVENT: &str = r#"{
    "timestamp": 1700000000,
    "entity": {
        "entity_class": "agent",
        "system": {"hostname": "entity1"},
        "metadata": {"name": "entity1", "namespace": "default"}
    },
    "check": {
        "command": "check-cpu -w 80 -c 90",
        "status": 2,
        "output": "CPU at 97%",
        "metadata": {"name": "check1", "namespace": "default"}
    }
}"#;

/// Helper to get the handler binary path
fn handler_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sensu-squadcast-handler"))
}

/// Helper to run the handler in an isolated home directory
fn run_handler(home: &Path, args: &[&str], envs: &[(&str, &str)], stdin: &str) -> Output {
    let mut command = Command::new(handler_binary());
    command
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("SQUADCAST_HANDLER_CONFIG")
        .env_remove("SENSU_SQUADCAST_APIURL")
        .env_remove("SENSU_SQUADCAST_STATE_MESSAGE")
        .env_remove("SENSU_SQUADCAST_ENTITY_ID")
        .env_remove("RUST_LOG")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        command.env(key, value);
    }

    let mut child = command.spawn().expect("Failed to execute handler");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write event");
    child.wait_with_output().expect("Failed to wait for handler")
}

/// Helper to start a one-shot webhook that answers with `status`
///
/// The thread yields `None` if the handler never posts within ten seconds.
fn webhook(status: u16) -> (String, thread::JoinHandle<Option<serde_json::Value>>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let handle = thread::spawn(move || {
        let mut request = server.recv_timeout(Duration::from_secs(10)).unwrap()?;
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).unwrap();
        request
            .respond(tiny_http::Response::from_string("").with_status_code(status))
            .unwrap();
        Some(serde_json::from_str(&body).unwrap())
    });

    (format!("http://{}/v2/incidents/api/token123", addr), handle)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_forwards_event_to_webhook() {
    let home = TempDir::new().unwrap();
    let (url, server) = webhook(200);

    let output = run_handler(home.path(), &[], &[("SENSU_SQUADCAST_APIURL", &url)], EVENT);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let body = server.join().unwrap().expect("webhook was called");
    assert_eq!(body["message_type"], "CRITICAL");
    assert_eq!(body["entity_id"], "entity1/check1");
    assert_eq!(body["state_message"], "entity1:check1:CPU at 97%");
    assert_eq!(body["host_name"], "entity1");
    assert_eq!(body["monitoring_tool"], "sensu");
    assert_eq!(body["check"]["command"], "check-cpu -w 80 -c 90");
    assert_eq!(body["entity"]["system"]["hostname"], "entity1");
}

#[test]
fn test_flags_override_templates() {
    let home = TempDir::new().unwrap();
    let (url, server) = webhook(200);

    let output = run_handler(
        home.path(),
        &["--api-url", &url, "-e", "{{.Check.Name}}@{{.Entity.Name}}", "-s", "{{check.output}}"],
        &[],
        EVENT,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let body = server.join().unwrap().expect("webhook was called");
    assert_eq!(body["entity_id"], "check1@entity1");
    assert_eq!(body["state_message"], "CPU at 97%");
}

#[test]
fn test_missing_url_exits_nonzero() {
    let home = TempDir::new().unwrap();

    let output = run_handler(home.path(), &[], &[], EVENT);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("missing Squadcast API URL"));
}

#[test]
fn test_invalid_url_exits_nonzero() {
    let home = TempDir::new().unwrap();

    let output = run_handler(home.path(), &["-a", "InvalidURL"], &[], EVENT);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid Squadcast API URL"));
}

#[test]
fn test_webhook_error_exits_nonzero() {
    let home = TempDir::new().unwrap();
    let (url, server) = webhook(500);

    let output = run_handler(home.path(), &["-a", &url], &[], EVENT);
    assert!(!output.status.success());
    assert!(server.join().unwrap().is_some(), "webhook was never called");

    let err = stderr(&output);
    assert!(err.contains("500"), "stderr: {}", err);
    assert!(!err.contains("token123"), "webhook token leaked: {}", err);
}

#[test]
fn test_malformed_event_exits_nonzero() {
    let home = TempDir::new().unwrap();

    let output = run_handler(home.path(), &["-a", "http://example.com:3000"], &[], "{not json");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to parse event"));
}

#[test]
fn test_dry_run_prints_payload() {
    let home = TempDir::new().unwrap();

    let output = run_handler(home.path(), &["-a", "http://example.com:3000", "--dry-run"], &[], EVENT);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["message_type"], "CRITICAL");
    assert_eq!(payload["entity_id"], "entity1/check1");
}

#[test]
fn test_event_file_and_config_file() {
    let home = TempDir::new().unwrap();
    let event_path = home.path().join("event.json");
    fs::write(&event_path, EVENT).unwrap();

    let config_path = home.path().join("handler.yaml");
    fs::write(
        &config_path,
        "api_url: http://example.com:3000\nentity_id: \"{{entity.metadata.namespace}}/{{check.name}}\"\n",
    )
    .unwrap();

    let output = run_handler(
        home.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "--event-file",
            event_path.to_str().unwrap(),
            "--dry-run",
        ],
        &[],
        "",
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["entity_id"], "default/check1");
}

#[test]
fn test_user_config_dir_is_picked_up() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("sensu-squadcast-handler");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.yaml"),
        "api_url: http://example.com:3000\nstate_message: from-user-config\n",
    )
    .unwrap();

    let output = run_handler(home.path(), &["--dry-run"], &[], EVENT);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["state_message"], "from-user-config");
}

#[test]
fn test_env_config_file_is_picked_up() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("from-env.yaml");
    fs::write(&config_path, "api_url: http://example.com:3000\nentity_id: from-env-config\n").unwrap();

    let output = run_handler(
        home.path(),
        &["--dry-run"],
        &[("SQUADCAST_HANDLER_CONFIG", config_path.to_str().unwrap())],
        EVENT,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["entity_id"], "from-env-config");
}

#[test]
fn test_broken_env_config_file_is_reported() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("broken.yaml");
    fs::write(&config_path, "api_url: [not, a, string\n").unwrap();

    let output = run_handler(
        home.path(),
        &["--dry-run"],
        &[("SQUADCAST_HANDLER_CONFIG", config_path.to_str().unwrap())],
        EVENT,
    );
    assert!(!output.status.success());

    let err = stderr(&output);
    assert!(err.contains("broken.yaml"), "stderr: {}", err);
    assert!(err.contains("Failed to parse config file"), "stderr: {}", err);
    assert!(!err.contains("missing Squadcast API URL"), "stderr: {}", err);
}

#[test]
fn test_local_config_file_is_picked_up() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("squadcast-handler.yaml"),
        "api_url: http://example.com:3000\nstate_message: from-local-config\n",
    )
    .unwrap();

    let output = run_handler(home.path(), &["--dry-run"], &[], EVENT);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["state_message"], "from-local-config");
}

#[test]
fn test_broken_local_config_file_is_reported() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("squadcast-handler.yaml"), "apiurl: http://example.com:3000\n").unwrap();

    let output = run_handler(home.path(), &["-a", "http://example.com:3000", "--dry-run"], &[], EVENT);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("squadcast-handler.yaml"));
}

#[test]
fn test_flags_and_env_beat_config_file() {
    let home = TempDir::new().unwrap();
    let (url, server) = webhook(200);
    fs::write(
        home.path().join("squadcast-handler.yaml"),
        "api_url: http://127.0.0.1:9/unused\nstate_message: from-file\nentity_id: from-file\n",
    )
    .unwrap();

    let output = run_handler(
        home.path(),
        &["-e", "from-flag"],
        &[("SENSU_SQUADCAST_APIURL", &url), ("SENSU_SQUADCAST_STATE_MESSAGE", "from-env")],
        EVENT,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let body = server.join().unwrap().expect("webhook was called");
    assert_eq!(body["entity_id"], "from-flag");
    assert_eq!(body["state_message"], "from-env");
}

#[test]
fn test_unset_entity_class_renders_empty() {
    let home = TempDir::new().unwrap();
    let event = EVENT.replace("\"entity_class\": \"agent\",", "");

    let output = run_handler(
        home.path(),
        &["-a", "http://example.com:3000", "-e", "{{.Entity.EntityClass}}/{{.Check.Name}}", "--dry-run"],
        &[],
        &event,
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["entity_id"], "/check1");
}
