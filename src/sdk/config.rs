//! 客户端配置与 API 地址解析
//!
//! 同一份构建产物可以部署到任意主机：生产环境下 API 地址由页面自身的
//! 协议、主机名和端口推导，开发环境固定访问本机 8080 端口。

use crate::sdk::error::ApiError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// 开发环境下的固定 API 地址
pub const DEV_API_BASE_URL: &str = "http://localhost:8080/api";

/// 生产环境下既没有显式端口、页面也没有端口时使用的默认端口
pub const DEFAULT_API_PORT: &str = "8080";

/// API 路径前缀
pub const API_PATH: &str = "/api";

/// 所有请求共用的超时时间（不可按请求调整）
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 本地持久化 token 使用的键
pub const TOKEN_STORAGE_KEY: &str = "token";

/// 页面地址（对应浏览器中的 `window.location`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// 协议，带结尾的冒号，例如 `https:`
    pub protocol: String,
    pub hostname: String,
    /// 页面端口，缺省时为空字符串
    pub port: String,
}

impl PageLocation {
    pub fn new(
        protocol: impl Into<String>,
        hostname: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            port: port.into(),
        }
    }

    /// 从完整的页面 URL 解析
    ///
    /// 只保留 URL 中显式写出的端口，与浏览器 `location.port` 的行为一致：
    /// `https://example.com/` 的端口为空，`https://example.com:443/` 同样为空。
    pub fn parse(url: &str) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ApiError::Config(format!("无效的页面地址 {}: {}", url, e)))?;
        let hostname = parsed
            .host_str()
            .ok_or_else(|| ApiError::Config(format!("页面地址缺少主机名: {}", url)))?
            .to_string();
        Ok(Self {
            protocol: format!("{}:", parsed.scheme()),
            hostname,
            port: parsed.port().map(|p| p.to_string()).unwrap_or_default(),
        })
    }
}

/// 运行环境
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    Development,
    Production(PageLocation),
}

/// 更新成功但本地缓存中找不到该条目时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMissPolicy {
    /// 丢弃服务端返回的结果，不插入缓存（兼容旧客户端行为）
    #[default]
    Drop,
    /// 追加到缓存末尾
    Insert,
}

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 运行环境
    pub context: ExecutionContext,
    /// 显式配置的 API 端口，优先于页面端口
    pub api_port: Option<String>,
    /// token 持久化文件路径
    pub token_path: PathBuf,
    /// 更新时缓存未命中的处理方式
    pub update_miss_policy: UpdateMissPolicy,
}

impl ClientConfig {
    /// 开发环境默认配置
    pub fn development() -> Self {
        Self {
            context: ExecutionContext::Development,
            api_port: None,
            token_path: default_token_path(),
            update_miss_policy: UpdateMissPolicy::default(),
        }
    }

    /// 生产环境配置，API 地址由页面地址推导
    pub fn production(location: PageLocation) -> Self {
        Self {
            context: ExecutionContext::Production(location),
            ..Self::development()
        }
    }

    /// 从环境变量读取配置
    ///
    /// - `PSUB_ENV`: `development`（默认）或 `production`
    /// - `PSUB_PAGE_URL`: 生产环境下的页面地址
    /// - `PSUB_API_PORT`: 显式 API 端口
    /// - `PSUB_TOKEN_PATH`: token 文件路径
    pub fn from_env() -> Result<Self, ApiError> {
        let env = std::env::var("PSUB_ENV").unwrap_or_else(|_| "development".to_string());
        let mut config = match env.as_str() {
            "production" | "prod" => {
                let page_url = std::env::var("PSUB_PAGE_URL").map_err(|_| {
                    ApiError::Config("生产环境需要设置 PSUB_PAGE_URL".to_string())
                })?;
                Self::production(PageLocation::parse(&page_url)?)
            }
            "development" | "dev" => Self::development(),
            other => {
                return Err(ApiError::Config(format!("未知的运行环境: {}", other)));
            }
        };
        config.api_port = std::env::var("PSUB_API_PORT")
            .ok()
            .filter(|p| !p.is_empty());
        if let Ok(path) = std::env::var("PSUB_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn with_api_port(mut self, port: impl Into<String>) -> Self {
        self.api_port = Some(port.into());
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_update_miss_policy(mut self, policy: UpdateMissPolicy) -> Self {
        self.update_miss_policy = policy;
        self
    }

    /// 解析 API 基础地址（启动时调用一次）
    pub fn api_base_url(&self) -> String {
        let url = resolve_api_base_url(&self.context, self.api_port.as_deref());
        debug!("[Config] API 基础地址: {}", url);
        url
    }
}

/// 根据运行环境解析 API 基础地址
///
/// 生产环境端口优先级：显式配置端口 > 页面端口 > [`DEFAULT_API_PORT`]。
pub fn resolve_api_base_url(context: &ExecutionContext, api_port: Option<&str>) -> String {
    match context {
        ExecutionContext::Development => DEV_API_BASE_URL.to_string(),
        ExecutionContext::Production(location) => {
            let port = api_port
                .filter(|p| !p.is_empty())
                .or_else(|| Some(location.port.as_str()).filter(|p| !p.is_empty()))
                .unwrap_or(DEFAULT_API_PORT);
            format!(
                "{}//{}:{}{}",
                location.protocol, location.hostname, port, API_PATH
            )
        }
    }
}

/// 默认 token 文件路径：`<data_dir>/proxy-subscription/session.json`
pub fn default_token_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("proxy-subscription")
        .join("session.json")
}
