// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown specs: signals kill the children, release the
//! port, and exit 0.

use crate::prelude::*;
use serde_json::json;

#[test]
fn sigterm_tears_down_children_and_releases_the_port() {
    let mut daemon = Daemon::start(json!([
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
    let api_port = daemon.api_port;

    daemon.sigterm();

    let code = daemon.wait_exit(SPEC_WAIT_MAX_MS).expect("daemon did not exit");
    assert_eq!(code, 0, "log:\n{}", daemon.log());

    // Children were SIGKILLed during teardown.
    assert!(wait_for(SPEC_WAIT_MAX_MS, || !process_alive(pid_a) && !process_alive(pid_b)));

    // The port is free for the next supervisor: a fresh daemon binds the
    // same control port (closed connections may linger in TIME_WAIT,
    // which the listener's endpoint-reuse socket option tolerates).
    let successor = Daemon::start_on(api_port, json!([]));
    let (code, _) = successor.get("/servers");
    assert_eq!(code, 200);
}

#[test]
fn sigint_is_equivalent_to_sigterm() {
    let mut daemon = Daemon::start(json!([
        { "id": "a", "name": "Alpha", "workingDir": "/tmp", "command": "sleep 60" },
    ]));
    daemon.post("/servers/a/start");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || daemon.status_of("a") == "running"));
    let child_pid = daemon.child_pid("a").expect("child pid");

    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        kill(Pid::from_raw(daemon.pid()), Signal::SIGINT).expect("SIGINT");
    }

    let code = daemon.wait_exit(SPEC_WAIT_MAX_MS).expect("daemon did not exit");
    assert_eq!(code, 0, "log:\n{}", daemon.log());
    assert!(wait_for(SPEC_WAIT_MAX_MS, || !process_alive(child_pid)));
}

#[test]
fn shutdown_with_no_children_exits_promptly() {
    let mut daemon = Daemon::start(json!([]));
    daemon.sigterm();
    let code = daemon.wait_exit(SPEC_WAIT_MAX_MS).expect("daemon did not exit");
    assert_eq!(code, 0);
}
