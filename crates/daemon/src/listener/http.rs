// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 request parsing and response framing.
//!
//! The control surface speaks a deliberately small subset: one request
//! per connection, request line plus query string, headers ignored, no
//! body parsing, no keep-alive, no chunked encoding. That subset is the
//! contract, not a shortcut.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Cap on the first (and only) read of a request.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("malformed request line")]
    Malformed,
}

/// A parsed request line.
#[derive(Debug, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

/// Parse the request line out of a raw read. Everything after the first
/// line (headers, body) is ignored.
pub fn parse_request(buf: &[u8]) -> Result<Request, HttpError> {
    let end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let line = String::from_utf8_lossy(&buf[..end]);
    let line = line.trim_end_matches('\r');

    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(HttpError::Malformed)?;
    let target = parts.next().ok_or(HttpError::Malformed)?;
    let version = parts.next().ok_or(HttpError::Malformed)?;
    if !version.starts_with("HTTP/") || parts.next().is_some() || !target.starts_with('/') {
        return Err(HttpError::Malformed);
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    };
    Ok(Request { method: method.to_string(), path: path.to_string(), query })
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Serialize a body, downgrading to the fixed 500 envelope when
/// encoding itself fails.
pub fn encode<T: Serialize>(status: u16, value: &T) -> (u16, String) {
    match serde_json::to_string(value) {
        Ok(body) => (status, body),
        Err(_) => (500, r#"{"error":"JSON encoding failed"}"#.to_string()),
    }
}

/// Frame a complete response. Every reply carries the JSON content
/// type, an exact length, the permissive CORS header, and closes the
/// connection.
pub fn response_bytes(status: u16, body: &str) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    };
    format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
    .into_bytes()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
