// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP liveness prober.
//!
//! One task per running server with a port. A probe is a bare connect:
//! it never writes application bytes, so the child's logs stay clean.
//! Results are posted as events; the prober never touches server state
//! itself.

use stagehand_core::Event;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Interval between probes.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Per-address connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before the first probe after a server reaches Running.
pub const FIRST_PROBE_DELAY: Duration = Duration::from_secs(3);

/// Spawn the periodic prober for one server. Cancelling the token ends
/// the task at its next suspension point; a result that loses the race
/// with cancellation is dropped by the engine's Running guard.
pub(crate) fn spawn_prober(
    id: String,
    hostname: String,
    port: u16,
    events: mpsc::Sender<Event>,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(FIRST_PROBE_DELAY) => {}
        }
        loop {
            let healthy = tokio::select! {
                _ = token.cancelled() => return,
                healthy = probe_once(&hostname, port, CONNECT_TIMEOUT) => healthy,
            };
            if events.send(Event::ProbeResult { id: id.clone(), healthy }).await.is_err() {
                return;
            }
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(PROBE_INTERVAL) => {}
            }
        }
    });
}

/// One probe: resolve the hostname (IPv4 and IPv6), walk the addresses
/// in resolution order, and report healthy iff any accepts a connection
/// within the timeout. The socket closes as soon as the connect lands.
pub async fn probe_once(hostname: &str, port: u16, timeout: Duration) -> bool {
    let addrs = match tokio::net::lookup_host((hostname, port)).await {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!(hostname, port, error = %e, "probe DNS lookup failed");
            return false;
        }
    };
    for addr in addrs {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                return true;
            }
            Ok(Err(e)) => debug!(%addr, error = %e, "probe connect refused"),
            Err(_) => debug!(%addr, "probe connect timed out"),
        }
    }
    false
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
