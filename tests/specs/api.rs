// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control API specs: the happy start path and the HTTP error surface.

use crate::prelude::*;
use serde_json::json;
use std::net::TcpListener;

#[test]
fn happy_start_reaches_running_and_healthy() {
    let port = free_port();
    // The liveness probe is a bare TCP connect, so a listener on the
    // configured port stands in for the child binding it.
    let listener = TcpListener::bind(("127.0.0.1", port)).expect("bind server port");

    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60", "port": port },
    ]));

    let (code, body) = daemon.post("/servers/a/start");
    assert_eq!(code, 200, "body: {body}");
    assert_eq!(body["success"], true);

    let running = wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running");
    assert!(running, "never reached running; log:\n{}", daemon.log());

    let healthy = wait_for(SPEC_WAIT_MAX_MS, || daemon.healthy("a"));
    assert!(healthy, "never became healthy; log:\n{}", daemon.log());

    let lines = daemon.log_lines("a");
    assert!(
        lines.iter().any(|l| l.starts_with("[system] Started with PID ")),
        "missing start line in {lines:?}"
    );
    drop(listener);
}

#[test]
fn start_twice_spawns_once() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
    ]));

    daemon.post("/servers/a/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running"));

    let (code, body) = daemon.post("/servers/a/start");
    assert_eq!(code, 200);
    assert_eq!(body["success"], true);

    let starts = daemon
        .log_lines("a")
        .iter()
        .filter(|l| l.starts_with("[system] Started with PID "))
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn stop_kills_the_child_and_is_idempotent() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
    ]));
    daemon.post("/servers/a/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running"));
    let child_pid = daemon.child_pid("a").expect("child pid in logs");

    let (code, body) = daemon.post("/servers/a/stop");
    assert_eq!(code, 200);
    assert_eq!(body["success"], true, "body: {body}");
    assert_eq!(daemon.status_of("a"), "stopped");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || !process_alive(child_pid)));

    // Stopping a stopped server is a no-op success.
    let (code, body) = daemon.post("/servers/a/stop");
    assert_eq!(code, 200);
    assert_eq!(body["success"], true);
}

#[test]
fn clear_logs_empties_the_buffer() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "echo hello" },
    ]));
    daemon.post("/servers/a/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || !daemon.log_lines("a").is_empty()));

    let (code, _) = daemon.post("/servers/a/clear-logs");
    assert_eq!(code, 200);
    let (_, body) = daemon.get("/servers/a/logs?lines=10");
    assert_eq!(body["totalLines"], 0);
}

#[test]
fn server_listing_preserves_configuration_order() {
    let daemon = Daemon::start(json!([
        { "id": "zeta", "name": "Z", "workingDir": "/tmp", "command": "sleep 60" },
        { "id": "alpha", "name": "A", "workingDir": "/tmp", "command": "sleep 60" },
        { "id": "mid", "name": "M", "workingDir": "/tmp", "command": "sleep 60" },
    ]));

    let (code, body) = daemon.get("/servers");
    assert_eq!(code, 200);
    let ids: Vec<&str> =
        body["servers"].as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn unknown_id_and_route_are_404() {
    let daemon = Daemon::start(json!([]));

    let (code, body) = daemon.get("/servers/ghost");
    assert_eq!(code, 404);
    assert_eq!(body["error"], "Server not found");

    let (code, body) = daemon.post("/servers/ghost/start");
    assert_eq!(code, 404);
    assert_eq!(body["error"], "Server not found");

    let (code, body) = daemon.get("/completely/else");
    assert_eq!(code, 404);
    assert!(body["error"].as_str().unwrap().contains("/completely/else"));
}

#[test]
fn malformed_request_line_is_400() {
    let daemon = Daemon::start(json!([]));

    let (code, _) = raw_request(daemon.api_port, "NONSENSE\r\n\r\n").expect("exchange");
    assert_eq!(code, 400);
}

#[test]
fn broken_settings_keep_the_api_up_with_config_error() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
    ]));

    std::fs::write(daemon.settings_path(), "{ broken").expect("write");
    let (code, body) = daemon.post("/servers/reload-settings");
    assert_eq!(code, 200);
    assert_eq!(body["success"], false);

    let (code, body) = daemon.get("/servers");
    assert_eq!(code, 200);
    assert_eq!(body["servers"].as_array().unwrap().len(), 0);
    assert!(body["configError"].as_str().is_some());
}
