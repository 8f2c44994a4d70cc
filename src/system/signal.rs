//! Shutdown signal handling
//!
//! The bootstrap itself is synchronous, so the listener runs on its own
//! thread with a small current-thread tokio runtime. On Ctrl+C or SIGTERM it
//! cancels the shared token; if the main thread is still blocked on a network
//! read after the grace period, the process is forced down.

use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use super::cancel::CancellationToken;

/// Spawn the detached shutdown listener thread
pub fn spawn_shutdown_listener(
    cancel: CancellationToken,
    grace: Duration,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("shutdown-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("Failed to build signal runtime, signals will not be handled: {}", e);
                    return;
                }
            };

            runtime.block_on(wait_for_signal());

            info!("Shutdown signal received, cancelling bootstrap...");
            cancel.cancel();

            thread::sleep(grace);
            error!(
                "Bootstrap did not stop within {} seconds! Forcing exit.",
                grace.as_secs()
            );
            std::process::exit(1);
        })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}. Only Ctrl+C is handled.", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        // 无法监听时永远挂起，不触发取消
        std::future::pending::<()>().await;
    }
}
