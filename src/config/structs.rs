use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::validators::validate_config;
use crate::errors::{Result, SidecarError};

/// 默认配置文件（可选，位于当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "sidecar.toml";
/// 环境变量前缀，分隔符为 `__`，例如 `SIDECAR__MOUNT__ROOT`
pub const ENV_PREFIX: &str = "SIDECAR";
/// Agones 注入的 SDK HTTP 端口
pub const SDK_PORT_ENV: &str = "AGONES_SDK_HTTP_PORT";

/// Sidecar 配置
///
/// 优先级：AGONES_SDK_HTTP_PORT > SIDECAR__* 环境变量 > TOML 文件 > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SidecarConfig {
    #[serde(default)]
    pub mount: MountConfig,
    #[serde(default)]
    pub sdk: SdkConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl SidecarConfig {
    /// 从 TOML 文件和进程环境变量加载配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, std::env::vars().collect())
    }

    /// 从 TOML 文件和给定的环境变量集合加载配置
    ///
    /// `path` 为 `None` 时尝试读取 [`DEFAULT_CONFIG_FILE`]（不存在则忽略）；
    /// 显式给出的路径必须存在。
    pub fn load_from(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        use config::{Config, Environment, File};

        let file_source = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let env_source = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("mount.user_dirs")
            .source(Some(env.clone().into_iter().collect()));

        let settings = Config::builder()
            .add_source(file_source)
            .add_source(env_source)
            .build()?;

        let mut config: SidecarConfig = settings.try_deserialize()?;

        if let Some(raw) = env.get(SDK_PORT_ENV) {
            let port = raw.trim().parse::<u16>().map_err(|e| {
                SidecarError::config(format!("Invalid {}: '{}' ({})", SDK_PORT_ENV, raw, e))
            })?;
            config.sdk.port = Some(port);
        }

        validate_config(&config)?;
        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 挂载目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// 共享 NFS 挂载点
    #[serde(default = "default_mount_root")]
    pub root: PathBuf,
    /// ComfyUI 安装目录
    #[serde(default = "default_app_root")]
    pub app_root: PathBuf,
    /// 所有实例共享的模型目录名
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
    /// 按用户隔离的目录名，按顺序重新挂载
    #[serde(default = "default_user_dirs")]
    pub user_dirs: Vec<String>,
}

/// Agones SDK 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default = "default_sdk_host")]
    pub host: String,
    /// 通常由 AGONES_SDK_HTTP_PORT 提供
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_watch_path")]
    pub watch_path: String,
    /// 建立连接的超时时间（秒），0 表示不限制
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl SdkConfig {
    /// 拼接 watch URL，端口缺失时返回 None
    pub fn watch_url(&self) -> Option<String> {
        self.port
            .map(|port| format!("http://{}:{}{}", self.host, port, self.watch_path))
    }
}

/// 连接重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 最大尝试次数，0 表示不限制
    #[serde(default)]
    pub max_attempts: u32,
    /// 总等待时长上限（秒），0 表示不限制
    #[serde(default)]
    pub max_elapsed_secs: u64,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// 1.0 表示固定间隔
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// 是否附加 0-25% 的随机抖动
    #[serde(default)]
    pub jitter: bool,
}

/// Watch 流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_label_key")]
    pub label_key: String,
    /// 流在收到用户之前断开时是否重新连接
    #[serde(default = "default_reconnect_on_close")]
    pub reconnect_on_close: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 关闭配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 收到信号后等待主流程退出的时间（秒），超时强制退出
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

// ============================================================
// Default value functions
// ============================================================

fn default_mount_root() -> PathBuf {
    PathBuf::from("/comfyui_nfs_dir")
}

fn default_app_root() -> PathBuf {
    PathBuf::from("/app/ComfyUI")
}

fn default_model_dir() -> String {
    "models".to_string()
}

fn default_user_dirs() -> Vec<String> {
    vec![
        "outputs".to_string(),
        "output".to_string(),
        "inputs".to_string(),
    ]
}

fn default_sdk_host() -> String {
    "localhost".to_string()
}

fn default_watch_path() -> String {
    "/watch/gameserver".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_label_key() -> String {
    "user".to_string()
}

fn default_reconnect_on_close() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_grace_secs() -> u64 {
    5
}

// ============================================================
// Default implementations
// ============================================================

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            root: default_mount_root(),
            app_root: default_app_root(),
            model_dir: default_model_dir(),
            user_dirs: default_user_dirs(),
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            host: default_sdk_host(),
            port: None,
            watch_path: default_watch_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            max_elapsed_secs: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            label_key: default_label_key(),
            reconnect_on_close: default_reconnect_on_close(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_secs: default_grace_secs(),
        }
    }
}
