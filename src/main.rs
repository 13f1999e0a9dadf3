mod appeals;
mod config;
mod dates;
mod db;
mod deadlines;
mod discipline;
mod exams;
mod holds;
mod ipc;
mod lookup;
mod records;
mod student_data;
mod summary;
mod transfer;

use std::io::{self, BufRead, Write};

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    // stdout carries the protocol; logs go to stderr. RUST_LOG overrides the level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = config::Config::load();
    let mut state = ipc::AppState::new(config.history_limit);
    if let Some(path) = config.workspace {
        if let Err(e) = ipc::open_workspace(&mut state, path.clone()) {
            warn!(workspace = %path.display(), error = %e, "could not open start-up workspace");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "stuadmd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                let _ = writeln!(stdout, "{}", ipc::bad_json(e.to_string()));
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
