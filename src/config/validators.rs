//! 配置值验证模块
//!
//! 在启动时一次性检查配置是否可用，避免带着错误的路径去删除目录。

use super::{RetryConfig, SDK_PORT_ENV, SidecarConfig};
use crate::errors::{Result, SidecarError};
use crate::utils::validate_segment;

/// 验证完整配置
pub fn validate_config(config: &SidecarConfig) -> Result<()> {
    if config.sdk.port.is_none() {
        return Err(SidecarError::config(format!(
            "Agones SDK port is not configured; set {} or sdk.port",
            SDK_PORT_ENV
        )));
    }

    if config.sdk.host.trim().is_empty() {
        return Err(SidecarError::config("sdk.host cannot be empty"));
    }

    if !config.sdk.watch_path.starts_with('/') {
        return Err(SidecarError::config(format!(
            "sdk.watch_path must start with '/': {}",
            config.sdk.watch_path
        )));
    }

    if !config.mount.root.is_absolute() {
        return Err(SidecarError::config(format!(
            "mount.root must be an absolute path: {}",
            config.mount.root.display()
        )));
    }

    if !config.mount.app_root.is_absolute() {
        return Err(SidecarError::config(format!(
            "mount.app_root must be an absolute path: {}",
            config.mount.app_root.display()
        )));
    }

    validate_segment(&config.mount.model_dir)
        .map_err(|e| SidecarError::config(format!("mount.model_dir: {}", e)))?;

    for dir in &config.mount.user_dirs {
        validate_segment(dir)
            .map_err(|e| SidecarError::config(format!("mount.user_dirs entry '{}': {}", dir, e)))?;
    }

    if config.watch.label_key.trim().is_empty() {
        return Err(SidecarError::config("watch.label_key cannot be empty"));
    }

    validate_retry(&config.retry)
}

/// 验证重试配置
pub fn validate_retry(retry: &RetryConfig) -> Result<()> {
    if retry.backoff_multiplier.is_nan() || retry.backoff_multiplier < 1.0 {
        return Err(SidecarError::config(format!(
            "retry.backoff_multiplier must be >= 1.0, got {}",
            retry.backoff_multiplier
        )));
    }

    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(SidecarError::config(format!(
            "retry.max_delay_ms ({}) is smaller than retry.initial_delay_ms ({})",
            retry.max_delay_ms, retry.initial_delay_ms
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config() -> SidecarConfig {
        let mut config = SidecarConfig::default();
        config.sdk.port = Some(9358);
        config
    }

    #[test]
    fn test_default_with_port_is_valid() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_relative_mount_root_rejected() {
        let mut config = valid_config();
        config.mount.root = PathBuf::from("nfs");
        assert!(matches!(
            validate_config(&config),
            Err(SidecarError::Config(_))
        ));
    }

    #[test]
    fn test_traversal_in_user_dirs_rejected() {
        let mut config = valid_config();
        config.mount.user_dirs = vec!["outputs".to_string(), "../etc".to_string()];
        let err = validate_config(&config).unwrap_err();
        assert!(err.message().contains("../etc"));
    }

    #[test]
    fn test_watch_path_must_be_absolute() {
        let mut config = valid_config();
        config.sdk.watch_path = "watch/gameserver".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_retry_bounds() {
        let mut retry = RetryConfig::default();
        retry.backoff_multiplier = 0.5;
        assert!(validate_retry(&retry).is_err());

        let mut retry = RetryConfig::default();
        retry.initial_delay_ms = 5000;
        retry.max_delay_ms = 1000;
        assert!(validate_retry(&retry).is_err());

        let mut retry = RetryConfig::default();
        retry.backoff_multiplier = f64::NAN;
        assert!(validate_retry(&retry).is_err());
    }
}
