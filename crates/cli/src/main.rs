// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use gatekeys::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(gatekeys::EXIT_USAGE);
    }

    init_tracing(&config);

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&config, cancel.clone());

    match gatekeys::run(config, cancel).await {
        Ok(summary) => {
            for (account, reason) in &summary.failures {
                warn!(account = %account, "{reason}");
            }
            info!("{summary}");
            std::process::exit(gatekeys::exit_code(&summary));
        }
        Err(e) => {
            let code = gatekeys::error_exit_code(&e);
            if code == gatekeys::EXIT_FATAL {
                error!("fatal: {e:#}");
            } else {
                error!("{e:#}");
            }
            std::process::exit(code);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).init();
        }
    }
}

/// Cancel the run on Ctrl-C or when the optional deadline passes.
fn spawn_cancel_triggers(config: &Config, cancel: CancellationToken) {
    let deadline = config.deadline();
    tokio::spawn(async move {
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = wait_for_interrupt(tokio::signal::ctrl_c()) => {
                info!("received interrupt, cancelling");
            }
            _ = expired => {
                warn!("deadline reached, cancelling");
            }
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    });
}

/// Resolve when `signal` fires. If the listener cannot be installed, never
/// resolve, so only the other triggers can cancel the run.
async fn wait_for_interrupt<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("cannot listen for interrupts: {e}");
        std::future::pending::<()>().await;
    }
}
