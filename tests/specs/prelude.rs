// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the integration specs.

use serde_json::Value;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Generous ceiling for anything the supervisor promises "soon".
pub const SPEC_WAIT_MAX_MS: u64 = 15_000;

/// One running daemon over a throwaway configuration directory.
pub struct Daemon {
    child: Child,
    pub api_port: u16,
    dir: TempDir,
}

impl Daemon {
    /// Write a settings document for `servers` and launch the daemon on
    /// an ephemeral control port.
    pub fn start(servers: Value) -> Daemon {
        Self::start_on(free_port(), servers)
    }

    /// Launch on a specific control port (port-reuse specs).
    pub fn start_on(api_port: u16, servers: Value) -> Daemon {
        let dir = TempDir::new().expect("temp dir");
        write_settings_to(dir.path(), api_port, &servers);

        let log = std::fs::File::create(dir.path().join("daemon.stderr")).expect("log file");
        let child = Command::new(assert_cmd::cargo::cargo_bin("stagehand"))
            .env("STAGEHAND_DIR", dir.path())
            .env("RUST_LOG", "debug")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .expect("spawn daemon");

        let daemon = Daemon { child, api_port, dir };
        let up = wait_for(SPEC_WAIT_MAX_MS, || daemon.try_get("/servers").is_some());
        assert!(up, "daemon did not start serving; log:\n{}", daemon.log());
        daemon
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.path().join("settings.json")
    }

    /// Replace the settings document on disk (the daemon only sees it
    /// on reload).
    pub fn rewrite_settings(&self, servers: &Value) {
        write_settings_to(self.dir.path(), self.api_port, servers);
    }

    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }

    /// Daemon's own stderr, for failure diagnostics.
    pub fn log(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("daemon.stderr")).unwrap_or_default()
    }

    pub fn get(&self, path: &str) -> (u16, Value) {
        self.try_get(path).expect("GET failed")
    }

    pub fn post(&self, path: &str) -> (u16, Value) {
        request(self.api_port, "POST", path).expect("POST failed")
    }

    fn try_get(&self, path: &str) -> Option<(u16, Value)> {
        request(self.api_port, "GET", path)
    }

    /// Status string a la `GET /servers/{id}`.
    pub fn status_of(&self, id: &str) -> String {
        let (code, body) = self.get(&format!("/servers/{id}"));
        assert_eq!(code, 200, "body: {body}");
        body["status"].as_str().expect("status").to_string()
    }

    pub fn healthy(&self, id: &str) -> bool {
        let (_, body) = self.get(&format!("/servers/{id}"));
        body["healthy"].as_bool().unwrap_or(false)
    }

    pub fn log_lines(&self, id: &str) -> Vec<String> {
        let (code, body) = self.get(&format!("/servers/{id}/logs?lines=500"));
        assert_eq!(code, 200);
        body["lines"]
            .as_array()
            .expect("lines")
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// PID of the server's child, scraped from its startup log line.
    pub fn child_pid(&self, id: &str) -> Option<i32> {
        self.log_lines(id).iter().rev().find_map(|line| {
            line.strip_prefix("[system] Started with PID ")
                .and_then(|rest| rest.trim().parse().ok())
        })
    }

    pub fn sigterm(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        kill(Pid::from_raw(self.pid()), Signal::SIGTERM).expect("SIGTERM daemon");
    }

    /// Wait for the daemon process to exit; returns its exit code.
    pub fn wait_exit(&mut self, max_ms: u64) -> Option<i32> {
        let deadline = Instant::now() + Duration::from_millis(max_ms);
        loop {
            match self.child.try_wait().expect("try_wait") {
                Some(status) => return status.code(),
                None if Instant::now() >= deadline => return None,
                None => std::thread::sleep(Duration::from_millis(100)),
            }
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if self.child.try_wait().ok().flatten().is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn write_settings_to(dir: &std::path::Path, api_port: u16, servers: &Value) {
    let doc = serde_json::json!({ "apiPort": api_port, "servers": servers });
    std::fs::write(dir.join("settings.json"), doc.to_string()).expect("write settings");
}

/// Bind an ephemeral port, note it, release it for the caller.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

/// Poll `f` until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, f: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if f() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// True when `pid` still exists (signal 0 probe).
pub fn process_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid), None).is_ok()
}

/// One-shot HTTP exchange against the control API.
pub fn request(port: u16, method: &str, path: &str) -> Option<(u16, Value)> {
    let (status, body) = raw_request(port, &format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"))?;
    let value = serde_json::from_str(&body).ok()?;
    Some((status, value))
}

/// Send raw bytes, return (status, body). Used directly by the specs
/// that exercise protocol errors.
pub fn raw_request(port: u16, payload: &str) -> Option<(u16, String)> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).ok()?;
    stream.set_read_timeout(Some(Duration::from_secs(10))).ok()?;
    stream.write_all(payload.as_bytes()).ok()?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).ok()?;

    let status: u16 = raw.split_whitespace().nth(1)?.parse().ok()?;
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b.to_string())?;
    Some((status, body))
}
