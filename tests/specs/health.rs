// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health prober specs: TCP-connect transitions, lifecycle untouched.

use crate::prelude::*;
use serde_json::json;
use std::net::TcpListener;

/// The probe cycle is 3 s first delay + 5 s interval; transitions must
/// land within two cycles.
const PROBE_WAIT_MS: u64 = 13_000;

#[test]
fn health_follows_the_port_while_running_stays() {
    let port = free_port();
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60", "port": port },
    ]));

    daemon.post("/servers/a/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running"));

    // Nothing listens yet: the server may run, but it is not healthy.
    assert!(!daemon.healthy("a"));

    // The port opens: the next probe flips healthy on.
    let listener = TcpListener::bind(("127.0.0.1", port)).expect("bind server port");
    assert!(
        wait_for(PROBE_WAIT_MS, || daemon.healthy("a")),
        "probe never saw the open port; log:\n{}",
        daemon.log()
    );
    assert_eq!(daemon.status_of("a"), "running");

    // The port closes again: healthy drops, status does not.
    drop(listener);
    assert!(
        wait_for(PROBE_WAIT_MS, || !daemon.healthy("a")),
        "probe never saw the closed port; log:\n{}",
        daemon.log()
    );
    assert_eq!(daemon.status_of("a"), "running");
}

#[test]
fn stopping_forces_healthy_false() {
    let port = free_port();
    let listener = TcpListener::bind(("127.0.0.1", port)).expect("bind server port");
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60", "port": port },
    ]));

    daemon.post("/servers/a/start");
    assert!(wait_for(PROBE_WAIT_MS, || daemon.healthy("a")), "log:\n{}", daemon.log());

    daemon.post("/servers/a/stop");
    assert_eq!(daemon.status_of("a"), "stopped");
    assert!(!daemon.healthy("a"));
    drop(listener);
}

#[test]
fn server_without_port_is_never_probed_healthy() {
    let daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
    ]));
    daemon.post("/servers/a/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running"));

    std::thread::sleep(std::time::Duration::from_secs(4));
    assert!(!daemon.healthy("a"));
}
