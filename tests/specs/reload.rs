// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings reload specs.

use crate::prelude::*;
use serde_json::json;

#[test]
fn reload_swaps_the_server_set_and_stops_old_children() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
        { "id": "b", "name": "Beta", "workingDir": "/tmp", "command": "sleep 60" },
    ]));
    daemon.post("/servers/a/start");
    daemon.post("/servers/b/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || {
        daemon.status_of("a") == "running" && daemon.status_of("b") == "running"
    }));
    let pid_a = daemon.child_pid("a").expect("pid of a");
    let pid_b = daemon.child_pid("b").expect("pid of b");

    daemon.rewrite_settings(&json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
        { "id": "c", "name": "Gamma", "workingDir": "/tmp", "command": "sleep 60" },
    ]));

    let (code, body) = daemon.post("/servers/reload-settings");
    assert_eq!(code, 200, "body: {body}");
    assert_eq!(body["success"], true, "body: {body}");

    // The call returned: the new set is visible, everything Stopped.
    let (_, body) = daemon.get("/servers");
    let servers = body["servers"].as_array().unwrap();
    let ids: Vec<&str> = servers.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(servers.iter().all(|s| s["status"] == "stopped"), "body: {servers:?}");

    // The old children are dead (the TERM-grace-KILL sequence may lag
    // the reply by up to the grace period).
    assert!(wait_for(SPEC_WAIT_MAX_MS, || !process_alive(pid_a) && !process_alive(pid_b)));

    // The rebuilt entry is startable.
    let (_, body) = daemon.post("/servers/c/start");
    assert_eq!(body["success"], true);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("c") == "running"));
}

#[test]
fn reload_with_unchanged_settings_is_stable() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
    ]));

    let (_, body) = daemon.post("/servers/reload-settings");
    assert_eq!(body["success"], true);

    let (_, body) = daemon.get("/servers");
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["id"], "a");
    assert_eq!(servers[0]["status"], "stopped");
}

#[test]
fn auto_start_runs_at_startup_but_not_on_reload() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60", "autoStart": true },
    ]));

    // autoStart brought the server up without any API call.
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running"),
        "auto-start never ran; log:\n{}",
        daemon.log()
    );

    // Reload stops it and leaves it stopped: autoStart is startup-only.
    let (_, body) = daemon.post("/servers/reload-settings");
    assert_eq!(body["success"], true);
    assert_eq!(daemon.status_of("a"), "stopped");
    std::thread::sleep(std::time::Duration::from_secs(2));
    assert_eq!(daemon.status_of("a"), "stopped");
}
