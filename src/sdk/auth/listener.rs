//! 会话监听器回调接口

use crate::sdk::auth::models::User;
use async_trait::async_trait;

/// 会话监听器
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// 登录成功
    async fn on_login(&self, user: Option<User>);

    /// 会话被清除（主动登出、token 失效）
    async fn on_logout(&self);
}

/// 默认空实现（无操作）
pub struct EmptySessionListener;

#[async_trait]
impl SessionListener for EmptySessionListener {
    async fn on_login(&self, _user: Option<User>) {
        // 默认不做任何处理
    }

    async fn on_logout(&self) {
        // 默认不做任何处理
    }
}
