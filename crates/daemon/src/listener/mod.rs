// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP control surface on loopback.
//!
//! The accept loop runs as a spawned task, handling each connection in
//! its own task so a slow client never blocks the supervisor. Queries
//! read state snapshots directly; mutations go through the event
//! channel and wait for the supervisor's reply.

pub mod http;
mod routes;

use crate::engine::SupervisorState;
use http::MAX_REQUEST_BYTES;
use parking_lot::Mutex;
use stagehand_core::{ErrorResponse, Event};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Shared context for every connection handler.
pub struct ListenCtx {
    pub state: Arc<Mutex<SupervisorState>>,
    pub event_tx: mpsc::Sender<Event>,
}

/// Bind the control socket on loopback with local endpoint reuse, so a
/// restarting supervisor does not trip over TIME_WAIT.
pub fn bind(port: u16) -> std::io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(SocketAddr::from(([127, 0, 0, 1], port)))?;
    socket.listen(1024)
}

/// Accept connections until cancelled. Dropping the listener on return
/// releases the port for the next supervisor.
pub async fn run(listener: TcpListener, ctx: Arc<ListenCtx>, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("control listener stopped");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "connection accepted");
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        handle_connection(stream, &ctx).await;
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

/// One request, one response, close.
async fn handle_connection(mut stream: TcpStream, ctx: &ListenCtx) {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = match stream.read(&mut buf).await {
        Ok(0) => return,
        Ok(n) => n,
        Err(e) => {
            debug!(error = %e, "request read failed");
            return;
        }
    };

    let (status, body) = match http::parse_request(&buf[..n]) {
        Ok(req) => routes::dispatch(ctx, req).await,
        Err(e) => {
            debug!(error = %e, "rejecting malformed request");
            http::encode(400, &ErrorResponse { error: "Malformed request".to_string() })
        }
    };

    let bytes = http::response_bytes(status, &body);
    if let Err(e) = stream.write_all(&bytes).await {
        debug!(error = %e, "response write failed");
        return;
    }
    let _ = stream.shutdown().await;
}
