//! SDK 统一错误类型
//!
//! 所有网络、鉴权、服务端校验和本地存储失败都收敛到 [`ApiError`]。
//! 面向用户展示时只使用 [`ApiError::user_message`]，不直接暴露底层异常文本。

use thiserror::Error;

/// 错误分类，对应客户端的失败处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 超时或网络不可达
    Network,
    /// 401，或登录响应中缺少 token
    Authentication,
    /// 其他非 2xx 响应（参数校验、冲突、服务端异常）
    Validation,
    /// 本地失败：未登录、存储读写、配置错误、响应解码
    Local,
}

/// 客户端 API 错误
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("请求超时")]
    Timeout,

    #[error("网络错误: {0}")]
    Network(String),

    #[error("HTTP 401: {}", .message.as_deref().unwrap_or("未授权"))]
    Unauthorized { message: Option<String> },

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("请求失败"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("解析响应失败: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidLogin(String),

    #[error("未登录")]
    NotAuthenticated,

    #[error("本地存储错误: {0}")]
    Storage(String),

    #[error("配置错误: {0}")]
    Config(String),
}

impl ApiError {
    /// 根据 HTTP 状态码和服务端错误文本构造错误
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        if status == 401 {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Server { status, message }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Timeout | ApiError::Network(_) => ErrorKind::Network,
            ApiError::Unauthorized { .. } | ApiError::InvalidLogin(_) => ErrorKind::Authentication,
            ApiError::Server { .. } => ErrorKind::Validation,
            ApiError::Decode(_)
            | ApiError::NotAuthenticated
            | ApiError::Storage(_)
            | ApiError::Config(_) => ErrorKind::Local,
        }
    }

    /// HTTP 状态码（仅在收到服务端响应时存在）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 服务端返回的错误文本
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Server { message, .. } => {
                message.as_deref().filter(|m| !m.is_empty())
            }
            _ => None,
        }
    }

    /// 面向用户的错误文本：优先使用服务端文本，否则使用本地化兜底文案
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::InvalidLogin(msg) => msg.clone(),
            ApiError::NotAuthenticated => self.to_string(),
            _ => self
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
