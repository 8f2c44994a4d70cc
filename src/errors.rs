use std::fmt;

#[derive(Debug, Clone)]
pub enum SidecarError {
    Config(String),
    Filesystem(String),
    Connection(String),
    RetriesExhausted(String),
    StreamClosed(String),
    Serialization(String),
    Validation(String),
    Cancelled(String),
}

impl SidecarError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SidecarError::Config(_) => "E001",
            SidecarError::Filesystem(_) => "E002",
            SidecarError::Connection(_) => "E003",
            SidecarError::RetriesExhausted(_) => "E004",
            SidecarError::StreamClosed(_) => "E005",
            SidecarError::Serialization(_) => "E006",
            SidecarError::Validation(_) => "E007",
            SidecarError::Cancelled(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SidecarError::Config(_) => "Configuration Error",
            SidecarError::Filesystem(_) => "Filesystem Error",
            SidecarError::Connection(_) => "Connection Error",
            SidecarError::RetriesExhausted(_) => "Retries Exhausted",
            SidecarError::StreamClosed(_) => "Watch Stream Closed",
            SidecarError::Serialization(_) => "Serialization Error",
            SidecarError::Validation(_) => "Validation Error",
            SidecarError::Cancelled(_) => "Cancelled",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SidecarError::Config(msg)
            | SidecarError::Filesystem(msg)
            | SidecarError::Connection(msg)
            | SidecarError::RetriesExhausted(msg)
            | SidecarError::StreamClosed(msg)
            | SidecarError::Serialization(msg)
            | SidecarError::Validation(msg)
            | SidecarError::Cancelled(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于日志）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for SidecarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for SidecarError {}

// 便捷的构造函数
impl SidecarError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        SidecarError::Config(msg.into())
    }

    pub fn filesystem<T: Into<String>>(msg: T) -> Self {
        SidecarError::Filesystem(msg.into())
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        SidecarError::Connection(msg.into())
    }

    pub fn retries_exhausted<T: Into<String>>(msg: T) -> Self {
        SidecarError::RetriesExhausted(msg.into())
    }

    pub fn stream_closed<T: Into<String>>(msg: T) -> Self {
        SidecarError::StreamClosed(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        SidecarError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        SidecarError::Validation(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        SidecarError::Cancelled(msg.into())
    }
}

impl From<std::io::Error> for SidecarError {
    fn from(err: std::io::Error) -> Self {
        SidecarError::Filesystem(err.to_string())
    }
}

impl From<serde_json::Error> for SidecarError {
    fn from(err: serde_json::Error) -> Self {
        SidecarError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SidecarError {
    fn from(err: config::ConfigError) -> Self {
        SidecarError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SidecarError>;
