// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real process runner: `/bin/sh -c` children in their own process
//! groups, piped output, group signaling.

use super::{path_prefix, ProcessAdapter, SpawnError, SpawnRequest, STOP_GRACE};
use async_trait::async_trait;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use stagehand_core::logbuf::SharedLogBuffer;
use stagehand_core::{Clock, Event};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Lock files some dev toolchains leave behind after an unclean exit,
/// relative to the working directory.
const STALE_LOCKS: &[&str] = &[".next/dev/lock"];

/// Production [`ProcessAdapter`].
pub struct ShellAdapter<C: Clock> {
    clock: C,
}

impl<C: Clock> ShellAdapter<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl<C: Clock> ProcessAdapter for ShellAdapter<C> {
    async fn spawn(
        &self,
        req: SpawnRequest,
        events: mpsc::Sender<Event>,
    ) -> Result<i32, SpawnError> {
        let cwd = req.spec.working_dir();
        if !cwd.is_dir() {
            return Err(SpawnError::WorkingDir(cwd.display().to_string()));
        }

        preflight(&req, &cwd).await;

        // Users write pipelines and env manipulations in `command`, so
        // the whole line goes through the shell; `exec` keeps the shell
        // from lingering as an extra layer in the process group.
        let prefix = path_prefix(&req.extra_paths);
        let shell_line = if prefix.is_empty() {
            req.spec.command.clone()
        } else {
            format!("export PATH={prefix}:$PATH && exec {}", req.spec.command)
        };

        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c")
            .arg(&shell_line)
            .current_dir(&cwd)
            .env("FORCE_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id().unwrap_or_default() as i32;
        debug!(id = %req.id, pid, cwd = %cwd.display(), "spawned child");

        // Enqueue the spawn event before the exit watcher exists, so the
        // supervisor always sees spawn before exit.
        if events.send(Event::ChildSpawned { id: req.id.clone(), pid }).await.is_err() {
            debug!("supervisor gone, killing fresh child");
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
            return Ok(pid);
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_task = stdout.map(|s| {
            tokio::spawn(read_stream(s, req.logs.clone(), self.clock.clone(), false))
        });
        let err_task = stderr.map(|s| {
            tokio::spawn(read_stream(s, req.logs.clone(), self.clock.clone(), true))
        });

        // Exit watcher: reap the child, drain both readers so EOF is
        // fully flushed, then report the exit.
        let id = req.id.clone();
        let logs = req.logs.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            if let Some(task) = out_task {
                let _ = task.await;
            }
            if let Some(task) = err_task {
                let _ = task.await;
            }
            let code = status.ok().and_then(|s| s.code());
            logs.lock().append(
                clock.unix_ms(),
                &format!("[system] Process exited with code {}", code.unwrap_or(-1)),
            );
            if events.send(Event::ChildExited { id, pid, code }).await.is_err() {
                debug!("supervisor gone, dropping exit event");
            }
        });

        Ok(pid)
    }

    async fn stop(&self, pid: i32) {
        let pgid = Pid::from_raw(pid);
        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            debug!(pid, error = %e, "SIGTERM to process group failed");
        }
        tokio::time::sleep(STOP_GRACE).await;
        // ESRCH here just means the group died within the grace period.
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            debug!(pid, error = %e, "SIGKILL to process group failed");
        }
    }

    fn force_stop(&self, pid: i32) {
        let pgid = Pid::from_raw(pid);
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            debug!(pid, error = %e, "SIGKILL to process group failed");
        }
    }
}

/// Best-effort cleanup before a spawn: kill orphans from a previous
/// supervisor life that still match this server's working directory and
/// command word, and remove known stale lock files.
async fn preflight(req: &SpawnRequest, cwd: &std::path::Path) {
    let word = req.spec.command_word();
    if !word.is_empty() {
        let pattern = format!("{}.*{}", cwd.display(), word);
        match Command::new("pkill").arg("-f").arg(&pattern).status().await {
            Ok(status) if status.success() => {
                warn!(id = %req.id, pattern, "killed orphaned processes before spawn");
            }
            // Non-zero just means nothing matched.
            Ok(_) => {}
            Err(e) => debug!(error = %e, "pkill unavailable, skipping orphan sweep"),
        }
    }

    for rel in STALE_LOCKS {
        let lock = cwd.join(rel);
        if lock.exists() {
            match std::fs::remove_file(&lock) {
                Ok(()) => warn!(id = %req.id, lock = %lock.display(), "removed stale lock file"),
                Err(e) => debug!(lock = %lock.display(), error = %e, "stale lock removal failed"),
            }
        }
    }
}

/// Read one pipe to EOF, appending whole lines into the buffer.
///
/// Bytes are split at `\n`, decoded lossily, and a non-terminated tail
/// at EOF is flushed as a final line. Stderr lines carry a `[stderr] `
/// prefix so the merged buffer stays attributable.
async fn read_stream<R, C>(stream: R, logs: SharedLogBuffer, clock: C, is_stderr: bool)
where
    R: AsyncRead + Unpin,
    C: Clock,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf);
                if is_stderr {
                    logs.lock().append(clock.unix_ms(), &format!("[stderr] {line}"));
                } else {
                    logs.lock().append(clock.unix_ms(), &line);
                }
            }
            Err(e) => {
                debug!(error = %e, "pipe read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
