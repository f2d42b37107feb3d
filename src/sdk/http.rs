//! HTTP 传输层
//!
//! 分三层：
//! - [`Transport`]：发送一个 [`ApiRequest`]，返回原始状态码和响应体；
//!   [`HttpTransport`] 是基于 reqwest 的实现，默认 10 秒超时。
//! - [`BearerAuth`]：包装任意 `Transport`，每次发送前从 [`TokenSource`]
//!   重新读取 token 并覆盖 `Authorization` 头。认证头只在这里设置。
//! - [`ApiClient`]：按路径提供 get/post/put/delete，负责状态码检查和 JSON 解码。

use crate::sdk::config::{ClientConfig, REQUEST_TIMEOUT};
use crate::sdk::error::ApiError;
use crate::sdk::settings::MergedFormat;
use crate::sdk::types::parse_error_message;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 一次 API 请求
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// 相对于 API 基础地址的路径，例如 `/subscriptions/5`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    /// 匿名请求（登录）不携带认证头
    pub anonymous: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            anonymous: false,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// 当前携带的 Bearer token
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// 原始响应
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 请求发送器
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        (**self).execute(request).await
    }
}

/// 基于 reqwest 的发送器
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// 指定整个请求（连接、发送、读取响应）的超时时间
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::ClientBuilder::new()
            .timeout(timeout)
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers
            })
            .build()
            .map_err(|e| ApiError::Config(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, request.path);

        debug!(
            "[Http] {} {} (requestID: {}, 认证: {})",
            request.method,
            url,
            request_id,
            request.bearer_token().is_some()
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers)
            .header("X-Request-ID", &request_id);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = ApiError::from(e);
            error!("[Http] {} {} 请求失败: {}", request.method, url, err);
            err
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ApiError::from)?.to_vec();
        debug!(
            "[Http] {} {} -> {} ({} 字节)",
            request.method,
            url,
            status,
            body.len()
        );

        Ok(RawResponse { status, body })
    }
}

/// 认证 token 来源
///
/// 每次请求前调用，返回 `None` 表示匿名。
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    /// 携带 token 的请求收到 401 时调用，参数为该请求携带的 token
    fn on_unauthorized(&self, _rejected_token: &str) {}
}

/// 认证中间件：为每个非匿名请求注入最新的 Bearer token
pub struct BearerAuth<T> {
    inner: T,
    source: Arc<dyn TokenSource>,
}

impl<T: Transport> BearerAuth<T> {
    pub fn new(inner: T, source: Arc<dyn TokenSource>) -> Self {
        Self { inner, source }
    }
}

#[async_trait]
impl<T: Transport> Transport for BearerAuth<T> {
    async fn execute(&self, mut request: ApiRequest) -> Result<RawResponse, ApiError> {
        let mut sent_token = None;
        if request.anonymous {
            request.headers.remove(AUTHORIZATION);
        } else {
            match self.source.bearer_token() {
                Some(token) => {
                    let value = HeaderValue::from_str(&format!("Bearer {}", token))
                        .map_err(|_| ApiError::Config("token 含有非法字符".to_string()))?;
                    request.headers.insert(AUTHORIZATION, value);
                    sent_token = Some(token);
                }
                None => {
                    request.headers.remove(AUTHORIZATION);
                }
            }
        }

        let path = request.path.clone();
        let response = self.inner.execute(request).await?;
        if let Some(token) = sent_token.filter(|_| response.status == 401) {
            warn!("[Http] {} 返回 401，当前 token 已失效", path);
            self.source.on_unauthorized(&token);
        }
        Ok(response)
    }
}

/// 通用 API 客户端
///
/// 克隆成本很低，各个 store 各持有一份。
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl ApiClient {
    /// 根据配置创建带认证中间件的客户端
    pub fn new(config: &ClientConfig, source: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let base_url = config.api_base_url();
        if source.bearer_token().is_some() {
            info!("[Http] 检测到已保存的 token，后续请求将自动携带");
        }
        let transport = BearerAuth::new(HttpTransport::new(base_url.clone())?, source);
        Ok(Self::with_transport(base_url, Arc::new(transport)))
    }

    /// 使用自定义发送器创建客户端
    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 合并订阅导出链接（无需认证，由调用方直接打开，不经过 store）
    pub fn merged_subscription_url(&self, format: MergedFormat) -> String {
        format!(
            "{}/merged?format={}",
            self.base_url,
            urlencoding::encode(format.as_str())
        )
    }

    /// 发送请求并把成功响应解码为 `R`
    pub async fn send<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let label = format!("{} {}", request.method, request.path);
        let response = self.transport.execute(request).await?;
        handle_http_response(response, &label)
    }

    /// 发送请求，只检查状态码，忽略响应体
    pub async fn send_no_content(&self, request: ApiRequest) -> Result<(), ApiError> {
        let label = format!("{} {}", request.method, request.path);
        let response = self.transport.execute(request).await?;
        check_status(&response, &label)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn get_with_query<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R, ApiError> {
        let request = query
            .iter()
            .fold(ApiRequest::new(Method::GET, path), |req, (k, v)| {
                req.query(*k, v)
            });
        self.send(request).await
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::new(Method::POST, path).json(body)?)
            .await
    }

    /// 不带请求体的 POST，例如刷新订阅
    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.send(ApiRequest::new(Method::POST, path)).await
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ApiRequest::new(Method::PUT, path).json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_no_content(ApiRequest::new(Method::DELETE, path))
            .await
    }
}

fn check_status(response: &RawResponse, label: &str) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let message = parse_error_message(&response.body);
    error!(
        "[Http] {} 请求失败，HTTP状态: {}, 错误信息: {}",
        label,
        response.status,
        message.as_deref().unwrap_or("-")
    );
    Err(ApiError::from_status(response.status, message))
}

/// 通用响应处理：检查状态码，再把响应体反序列化为 `R`
pub fn handle_http_response<R: DeserializeOwned>(
    response: RawResponse,
    label: &str,
) -> Result<R, ApiError> {
    check_status(&response, label)?;
    serde_json::from_slice(&response.body).map_err(|e| {
        error!(
            "[Http] {} 反序列化失败: {}，原始响应: {}",
            label,
            e,
            String::from_utf8_lossy(&response.body)
        );
        ApiError::Decode(format!("{}: {}", label, e))
    })
}
