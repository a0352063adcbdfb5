// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! smd: the sawmill daemon binary.

use sm_daemon::Daemon;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn config_path() -> PathBuf {
    if let Some(arg) = std::env::args().nth(1) {
        return PathBuf::from(arg);
    }
    if let Ok(env) = std::env::var("SMD_CONFIG") {
        return PathBuf::from(env);
    }
    if let Some(user) = dirs::config_dir().map(|d| d.join("sawmill/smd.toml")) {
        if user.exists() {
            return user;
        }
    }
    PathBuf::from("/etc/sawmill/smd.toml")
}

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("SMD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    match std::env::var("SMD_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "smd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let _guard = init_tracing();
    let path = config_path();
    tracing::info!(config = %path.display(), "smd starting");

    let daemon = match Daemon::start(&path).await {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = daemon.run().await {
        tracing::error!(error = %e, "daemon exited with error");
        std::process::exit(1);
    }
    tracing::info!("smd stopped");
}
