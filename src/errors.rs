use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkmapError {
    InvalidInput(String),
    Conflict(String),
    NotFound(String),
    Storage(String),
    Serialization(String),
    Config(String),
}

impl LinkmapError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkmapError::InvalidInput(_) => "E001",
            LinkmapError::Conflict(_) => "E002",
            LinkmapError::NotFound(_) => "E003",
            LinkmapError::Storage(_) => "E004",
            LinkmapError::Serialization(_) => "E005",
            LinkmapError::Config(_) => "E006",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkmapError::InvalidInput(_) => "Invalid Input",
            LinkmapError::Conflict(_) => "Conflict",
            LinkmapError::NotFound(_) => "Resource Not Found",
            LinkmapError::Storage(_) => "Storage Error",
            LinkmapError::Serialization(_) => "Serialization Error",
            LinkmapError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkmapError::InvalidInput(msg) => msg,
            LinkmapError::Conflict(msg) => msg,
            LinkmapError::NotFound(msg) => msg,
            LinkmapError::Storage(msg) => msg,
            LinkmapError::Serialization(msg) => msg,
            LinkmapError::Config(msg) => msg,
        }
    }

    /// HTTP status the management API answers with for this error.
    pub fn http_status(&self) -> StatusCode {
        match self {
            LinkmapError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LinkmapError::Conflict(_) => StatusCode::CONFLICT,
            LinkmapError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkmapError::Storage(_)
            | LinkmapError::Serialization(_)
            | LinkmapError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors carry a message that is safe to return to the caller.
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// 格式化为彩色输出（用于 CLI 模式）
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

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkmapError {}

// 便捷的构造函数
impl LinkmapError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        LinkmapError::InvalidInput(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        LinkmapError::Conflict(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkmapError::NotFound(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        LinkmapError::Storage(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkmapError::Serialization(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        LinkmapError::Config(msg.into())
    }
}

impl From<serde_json::Error> for LinkmapError {
    fn from(err: serde_json::Error) -> Self {
        LinkmapError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for LinkmapError {
    fn from(err: std::io::Error) -> Self {
        LinkmapError::Storage(err.to_string())
    }
}

impl From<url::ParseError> for LinkmapError {
    fn from(err: url::ParseError) -> Self {
        LinkmapError::InvalidInput(format!("Invalid URL format: {}", err))
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for LinkmapError {
    fn from(err: redis::RedisError) -> Self {
        LinkmapError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkmapError>;
