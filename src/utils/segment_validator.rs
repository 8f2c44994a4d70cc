//! 路径段验证模块
//!
//! 外部输入（例如 Agones label）在拼接进文件系统路径之前必须是单一的路径段，
//! 不能包含分隔符或父目录引用。

/// 单个路径段允许的最大字节数（常见文件系统 NAME_MAX）
pub const MAX_SEGMENT_BYTES: usize = 255;

/// 路径段验证错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentValidationError {
    Empty,
    TooLong(usize),
    Separator(char),
    ParentReference,
    CurrentReference,
    ControlCharacter,
}

impl std::fmt::Display for SegmentValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "path segment cannot be empty"),
            Self::TooLong(len) => write!(
                f,
                "path segment is {} bytes, the limit is {}",
                len, MAX_SEGMENT_BYTES
            ),
            Self::Separator(c) => write!(f, "path segment contains separator {:?}", c),
            Self::ParentReference => write!(f, "path segment cannot be '..'"),
            Self::CurrentReference => write!(f, "path segment cannot be '.'"),
            Self::ControlCharacter => write!(f, "path segment contains control characters"),
        }
    }
}

impl std::error::Error for SegmentValidationError {}

/// 验证字符串能否安全地作为单一路径段使用
///
/// 检查项目：
/// 1. 非空（不能只有空白）
/// 2. 不超过 [`MAX_SEGMENT_BYTES`]
/// 3. 不是 `.` 或 `..`
/// 4. 不包含 `/` 或 `\`
/// 5. 不包含控制字符（包括 NUL）
pub fn validate_segment(segment: &str) -> Result<(), SegmentValidationError> {
    if segment.trim().is_empty() {
        return Err(SegmentValidationError::Empty);
    }

    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(SegmentValidationError::TooLong(segment.len()));
    }

    match segment {
        ".." => return Err(SegmentValidationError::ParentReference),
        "." => return Err(SegmentValidationError::CurrentReference),
        _ => {}
    }

    if let Some(c) = segment.chars().find(|c| *c == '/' || *c == '\\') {
        return Err(SegmentValidationError::Separator(c));
    }

    if segment.chars().any(char::is_control) {
        return Err(SegmentValidationError::ControlCharacter);
    }

    Ok(())
}
