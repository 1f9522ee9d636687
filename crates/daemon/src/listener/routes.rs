// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing table for the control surface.

use super::http::{encode, Request};
use super::ListenCtx;
use stagehand_core::{
    ActionResponse, Command, ErrorResponse, Event, Op, OpError, ServersResponse,
};
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Mutating operations answer within the stop grace period plus margin;
/// anything slower means the supervisor is wedged.
const OP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default line count for the logs endpoint.
const DEFAULT_LOG_LINES: usize = 100;

/// Dispatch one parsed request to its handler.
pub(super) async fn dispatch(ctx: &ListenCtx, req: Request) -> (u16, String) {
    let segments: Vec<&str> =
        req.path.split('/').filter(|segment| !segment.is_empty()).collect();

    match (req.method.as_str(), segments.as_slice()) {
        ("GET", ["servers"]) => {
            let state = ctx.state.lock();
            let body = ServersResponse {
                servers: state.list_info(),
                config_error: state.config_error.clone(),
            };
            encode(200, &body)
        }
        ("GET", ["servers", id]) => {
            let state = ctx.state.lock();
            match state.get_info(id) {
                Some(info) => encode(200, &info),
                None => not_found(),
            }
        }
        ("GET", ["servers", id, "logs"]) => {
            let lines = req
                .query
                .get("lines")
                .and_then(|raw| raw.parse::<usize>().ok())
                .unwrap_or(DEFAULT_LOG_LINES);
            let logs = ctx.state.lock().get_logs(id, lines);
            match logs {
                Some(body) => encode(200, &body),
                None => not_found(),
            }
        }
        ("POST", ["servers", "start-all"]) => run_op(ctx, Op::StartAll).await,
        ("POST", ["servers", "stop-all"]) => run_op(ctx, Op::StopAll).await,
        ("POST", ["servers", "reload-settings"]) => run_op(ctx, Op::Reload).await,
        ("POST", ["servers", id, "start"]) => {
            run_op(ctx, Op::Start { id: id.to_string() }).await
        }
        ("POST", ["servers", id, "stop"]) => run_op(ctx, Op::Stop { id: id.to_string() }).await,
        ("POST", ["servers", id, "restart"]) => {
            run_op(ctx, Op::Restart { id: id.to_string() }).await
        }
        ("POST", ["servers", id, "clear-logs"]) => {
            run_op(ctx, Op::ClearLogs { id: id.to_string() }).await
        }
        _ => encode(
            404,
            &ErrorResponse { error: format!("Unknown route: {} {}", req.method, req.path) },
        ),
    }
}

fn not_found() -> (u16, String) {
    encode(404, &ErrorResponse { error: "Server not found".to_string() })
}

/// Inject a command into the supervisor and wait for its reply.
async fn run_op(ctx: &ListenCtx, op: Op) -> (u16, String) {
    let (cmd, reply) = Command::with_reply(op);
    if ctx.event_tx.send(Event::Command(cmd)).await.is_err() {
        return encode(500, &ErrorResponse { error: "Supervisor unavailable".to_string() });
    }
    match timeout(OP_TIMEOUT, reply).await {
        Ok(Ok(Ok(message))) => encode(200, &ActionResponse { success: true, message }),
        Ok(Ok(Err(OpError::NotFound))) => not_found(),
        Ok(Ok(Err(OpError::Failed(message)))) => {
            encode(200, &ActionResponse { success: false, message })
        }
        Ok(Err(_)) => {
            warn!("supervisor dropped a command reply");
            encode(500, &ErrorResponse { error: "Supervisor unavailable".to_string() })
        }
        Err(_) => {
            warn!("command timed out");
            encode(500, &ErrorResponse { error: "Operation timed out".to_string() })
        }
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
