//! 会话相关数据结构

use serde::{Deserialize, Serialize};

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "ID")]
    pub id: i64,
    pub username: String,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
}

/// 登录请求
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// 登录响应（原样返回给调用方）
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// 修改密码请求
#[derive(Debug, Serialize)]
pub struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// 没有 token
    #[default]
    Anonymous,
    /// 登录请求进行中
    Authenticating,
    /// 持有 token（用户信息可能尚未获取）
    Authenticated,
}
