use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use comfyui_sidecar::cli::Cli;
use comfyui_sidecar::config::SidecarConfig;
use comfyui_sidecar::errors::SidecarError;
use comfyui_sidecar::runtime;
use comfyui_sidecar::system::{CancellationToken, init_logging, spawn_shutdown_listener};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.generate_config {
        print!("{}", SidecarConfig::generate_sample_config());
        return ExitCode::SUCCESS;
    }

    let config = match SidecarConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return ExitCode::FAILURE;
        }
    };

    // guard 必须存活到 main 返回，保证日志被刷新
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting user-watch v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    if let Err(e) = spawn_shutdown_listener(
        cancel.clone(),
        Duration::from_secs(config.shutdown.grace_secs),
    ) {
        warn!("Failed to start shutdown listener: {}", e);
    }

    match runtime::run(&config, cancel) {
        Ok(user) => {
            info!("User {} is ready, exiting", user);
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<SidecarError>() {
                Some(inner) => error!("[{}] {:#}", inner.code(), e),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
