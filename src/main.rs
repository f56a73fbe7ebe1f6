mod actions;
mod api;
mod config;
mod entity;
mod ipc;
mod pipeline;
mod table;
mod view;

use anyhow::Context;
use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    // stdout carries responses, so logs must stay on stderr.
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("AGENCYD_LOG", "info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = config::load()?;
    log::info!(
        "agencyd {} using {} (token {})",
        env!("CARGO_PKG_VERSION"),
        config.api_base_url,
        if config.api_token.is_some() { "set" } else { "not set" }
    );
    let mut state = ipc::AppState::new(config).context("building API client")?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                log::warn!("stdin closed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        log::debug!("-> {} {}", req.id, req.method);
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    Ok(())
}
