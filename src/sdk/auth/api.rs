//! 认证 HTTP API 客户端

use crate::sdk::auth::models::{ChangePasswordRequest, LoginRequest, LoginResponse, User};
use crate::sdk::error::ApiError;
use crate::sdk::http::{ApiClient, ApiRequest};
use crate::sdk::types::MessageResponse;
use reqwest::Method;
use tracing::debug;

/// 认证相关的 HTTP API 客户端
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 登录（匿名请求，不携带旧 token）
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        debug!("[AuthAPI] 📡 登录请求，用户名: {}", username);
        let request = ApiRequest::new(Method::POST, "/auth/login")
            .json(&LoginRequest { username, password })?
            .anonymous();
        self.client.send(request).await
    }

    /// 获取当前用户
    pub async fn current_user(&self) -> Result<User, ApiError> {
        debug!("[AuthAPI] 📡 获取当前用户");
        self.client.get("/auth/user").await
    }

    /// 修改密码
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        debug!("[AuthAPI] 📡 修改密码");
        self.client
            .post(
                "/auth/change-password",
                &ChangePasswordRequest {
                    old_password,
                    new_password,
                },
            )
            .await
    }
}
