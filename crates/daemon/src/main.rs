// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stagehand daemon entry point.
//!
//! Owns the engine loop: events are processed sequentially on this
//! task, timers fire through the scheduler tick, and SIGTERM/SIGINT
//! break the loop into the shutdown coordinator.

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stagehand_daemon::{env, lifecycle, listener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("stagehand {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: stagehand [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings_path = env::settings_path();
    info!(settings = %settings_path.display(), "starting supervisor");

    let lifecycle::Startup { supervisor, mut event_rx, listener, listener_ctx, api_port } =
        match lifecycle::startup(settings_path) {
            Ok(startup) => startup,
            Err(e) => {
                error!(error = %e, "startup failed");
                return Err(e.into());
            }
        };

    let accept_token = CancellationToken::new();
    tokio::spawn(listener::run(listener, listener_ctx, accept_token.clone()));
    info!(port = api_port, "control API listening on 127.0.0.1");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // NOTE: the interval lives outside the loop; tokio::select!
    // re-evaluates its branches each iteration, and a fresh sleep per
    // iteration would reset under load and starve the timers.
    let mut timer_check = tokio::time::interval(env::timer_check_interval());
    timer_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = event_rx.recv() => match maybe {
                Some(event) => supervisor.handle_event(event),
                None => {
                    info!("event channel closed, shutting down");
                    break;
                }
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = timer_check.tick() => supervisor.pump_timers(),
        }
    }

    lifecycle::shutdown(&supervisor, &accept_token).await;
    info!("supervisor stopped");
    Ok(())
}

fn print_help() {
    println!("stagehand {}", env!("CARGO_PKG_VERSION"));
    println!("Development-server supervisor");
    println!();
    println!("Reads the server list from ~/.servers/settings.json (override the");
    println!("directory with STAGEHAND_DIR), keeps the configured servers alive,");
    println!("and serves the HTTP control API on 127.0.0.1.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
