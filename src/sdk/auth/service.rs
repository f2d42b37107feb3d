//! 会话服务层
//!
//! [`SessionState`] 是 token 和当前用户的唯一持有者，同时作为认证中间件的
//! [`TokenSource`]；[`SessionManager`] 在其上实现登录、登出、恢复会话和修改密码。

use crate::sdk::auth::api::AuthApi;
use crate::sdk::auth::listener::{EmptySessionListener, SessionListener};
use crate::sdk::auth::models::{LoginResponse, SessionPhase, User};
use crate::sdk::error::ApiError;
use crate::sdk::http::{ApiClient, TokenSource};
use crate::sdk::storage::TokenStorage;
use crate::sdk::types::MessageResponse;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// 登录失败且服务端没有返回错误文本时的提示
pub const LOGIN_FAILED: &str = "登录失败";

/// 修改密码失败且服务端没有返回错误文本时的提示
pub const CHANGE_PASSWORD_FAILED: &str = "修改密码失败";

#[derive(Debug, Default)]
struct SessionInner {
    token: Option<String>,
    user: Option<User>,
    phase: SessionPhase,
    loading: bool,
}

/// 会话状态
pub struct SessionState {
    storage: Arc<dyn TokenStorage>,
    inner: Mutex<SessionInner>,
    listener: Mutex<Arc<dyn SessionListener>>,
}

impl SessionState {
    /// 从持久化存储恢复会话（只恢复 token，用户信息由 `init` 获取）
    pub fn restore(storage: Arc<dyn TokenStorage>) -> Arc<Self> {
        let token = storage.load();
        let phase = if token.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        };
        debug!("[Session] 恢复会话，已保存 token: {}", token.is_some());
        Arc::new(Self {
            storage,
            inner: Mutex::new(SessionInner {
                token,
                phase,
                ..Default::default()
            }),
            listener: Mutex::new(Arc::new(EmptySessionListener)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listener(&self) -> Arc<dyn SessionListener> {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn set_listener(&self, listener: Arc<dyn SessionListener>) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = listener;
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.lock().user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    fn begin_login(&self) {
        let mut inner = self.lock();
        inner.phase = SessionPhase::Authenticating;
        inner.loading = true;
    }

    /// 结束登录；未提交时阶段由当前是否持有 token 决定
    ///
    /// 登录期间会话可能已被 401 清除，不能回退到登录前记录的阶段。
    fn finish_login(&self, committed: bool) {
        let mut inner = self.lock();
        if !committed {
            inner.phase = if inner.token.is_some() {
                SessionPhase::Authenticated
            } else {
                SessionPhase::Anonymous
            };
        }
        inner.loading = false;
    }

    /// 先写持久化存储，成功后再更新内存状态
    fn commit_login(&self, token: &str, user: Option<User>) -> Result<(), ApiError> {
        self.storage.save(token)?;
        let mut inner = self.lock();
        inner.token = Some(token.to_string());
        inner.user = user;
        inner.phase = SessionPhase::Authenticated;
        Ok(())
    }

    fn set_user(&self, user: User) {
        self.lock().user = Some(user);
    }

    /// 清除内存和持久化存储中的会话，返回之前是否持有 token
    fn clear(&self) -> bool {
        self.clear_if(|_| true)
    }

    /// 当前 token 满足条件时清除会话，返回是否清除
    fn clear_if<F>(&self, predicate: F) -> bool
    where
        F: FnOnce(Option<&str>) -> bool,
    {
        {
            let mut inner = self.lock();
            if inner.token.is_none() || !predicate(inner.token.as_deref()) {
                return false;
            }
            inner.token = None;
            inner.user = None;
            inner.phase = SessionPhase::Anonymous;
        }
        // 存储清除失败时内存中已是匿名，后续请求不会再携带旧 token
        if let Err(e) = self.storage.clear() {
            warn!("[Session] 清除本地 token 失败: {}", e);
        }
        true
    }
}

impl TokenSource for SessionState {
    /// 每次请求都读取当前会话中的 token
    ///
    /// 内存状态只在持久化存储写入成功后更新，因此两者一致；
    /// 存储清除失败时以内存中的匿名状态为准。
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }

    fn on_unauthorized(&self, rejected_token: &str) {
        if !self.clear_if(|current| current == Some(rejected_token)) {
            debug!("[Session] 被拒绝的 token 已不是当前 token，忽略此次 401");
            return;
        }
        warn!("[Session] 请求返回 401，会话已清除");
        let listener = self.listener();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                listener.on_logout().await;
            });
        }
    }
}

/// 未提交的登录尝试；drop 时结束登录（包括 future 被中途丢弃）
struct LoginAttempt<'a> {
    state: &'a SessionState,
    committed: bool,
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        self.state.finish_login(self.committed);
    }
}

/// 会话管理器
pub struct SessionManager {
    api: AuthApi,
    state: Arc<SessionState>,
}

impl SessionManager {
    /// `client` 应该使用同一个 `state` 作为认证中间件的 token 来源
    pub fn new(client: ApiClient, state: Arc<SessionState>) -> Self {
        Self {
            api: AuthApi::new(client),
            state,
        }
    }

    /// 注册会话监听器
    pub fn set_listener(&self, listener: Arc<dyn SessionListener>) {
        self.state.set_listener(listener);
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.is_admin()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn token(&self) -> Option<String> {
        self.state.token()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.current_user()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// 登录
    ///
    /// 成功时保存 token 和用户并返回服务端原始响应。失败时会话保持调用前的状态；
    /// 面向用户的提示使用 `err.user_message(LOGIN_FAILED)`。
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        info!("[Session] 🔐 正在登录，用户名: {}", username);
        self.state.begin_login();
        let mut attempt = LoginAttempt {
            state: &self.state,
            committed: false,
        };

        let response = self.api.login(username, password).await.map_err(|e| {
            error!("[Session] ❌ 登录失败: {}", e);
            e
        })?;

        let token = match response.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                error!("[Session] ❌ 登录响应中缺少 token");
                return Err(ApiError::InvalidLogin(format!(
                    "{}: 无效的响应",
                    LOGIN_FAILED
                )));
            }
        };

        self.state.commit_login(token, response.user.clone())?;
        attempt.committed = true;
        drop(attempt);

        info!(
            "[Session] ✅ 登录成功，用户: {}",
            response
                .user
                .as_ref()
                .map(|u| u.username.as_str())
                .unwrap_or("-")
        );
        self.state.listener().on_login(response.user.clone()).await;
        Ok(response)
    }

    /// 登出：清除内存和持久化存储中的 token 与用户，可重复调用
    pub async fn logout(&self) {
        if self.state.clear() {
            info!("[Session] 👋 已登出");
            self.state.listener().on_logout().await;
        } else {
            debug!("[Session] 当前未登录，无需登出");
        }
    }

    /// 获取当前用户
    ///
    /// 未登录时返回 `Ok(None)`。请求失败视为 token 失效：先登出，再返回原始错误。
    pub async fn fetch_current_user(&self) -> Result<Option<User>, ApiError> {
        if self.state.token().is_none() {
            debug!("[Session] 未登录，跳过获取用户信息");
            return Ok(None);
        }

        match self.api.current_user().await {
            Ok(user) => {
                debug!("[Session] 当前用户: {} (管理员: {})", user.username, user.is_admin);
                self.state.set_user(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!("[Session] 获取用户信息失败，token 可能已过期: {}", e);
                self.logout().await;
                Err(e)
            }
        }
    }

    /// 修改密码，不改变会话状态
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        if self.state.token().is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        let response = self
            .api
            .change_password(old_password, new_password)
            .await
            .map_err(|e| {
                error!("[Session] ❌ 修改密码失败: {}", e);
                e
            })?;
        info!("[Session] ✅ 密码已修改");
        Ok(response)
    }

    /// 启动时调用一次：存在已保存的 token 时尝试获取用户信息
    ///
    /// token 过期不会让启动失败，只会登出。
    pub async fn init(&self) {
        if self.state.token().is_none() {
            debug!("[Session] 没有已保存的 token，以匿名身份启动");
            return;
        }
        info!("[Session] 🔄 检测到已保存的 token，正在恢复会话");
        if let Err(e) = self.fetch_current_user().await {
            warn!("[Session] 恢复会话失败，已切换为匿名: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::http::BearerAuth;
    use crate::sdk::storage::MemoryTokenStorage;
    use crate::sdk::testing::{init_test_logger, MockTransport};
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixture {
        mock: Arc<MockTransport>,
        storage: Arc<MemoryTokenStorage>,
        client: ApiClient,
        manager: SessionManager,
    }

    fn fixture(stored_token: Option<&str>) -> Fixture {
        init_test_logger();
        let mock = Arc::new(MockTransport::new());
        let storage = Arc::new(match stored_token {
            Some(t) => MemoryTokenStorage::with_token(t),
            None => MemoryTokenStorage::new(),
        });
        let state = SessionState::restore(storage.clone());
        let transport = BearerAuth::new(mock.clone(), state.clone());
        let client = ApiClient::with_transport("http://localhost:8080/api", Arc::new(transport));
        Fixture {
            mock,
            storage,
            manager: SessionManager::new(client.clone(), state),
            client,
        }
    }

    fn admin_login() -> serde_json::Value {
        json!({"token": "abc123", "user": {"id": 1, "username": "admin", "is_admin": true}})
    }

    #[derive(Default)]
    struct CountingListener {
        logins: AtomicUsize,
        logouts: AtomicUsize,
    }

    #[async_trait]
    impl SessionListener for CountingListener {
        async fn on_login(&self, _user: Option<User>) {
            self.logins.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_logout(&self) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn login_success_stores_token_and_user() {
        let f = fixture(None);
        f.mock.reply(Method::POST, "/auth/login", 200, admin_login());

        let response = f.manager.login("admin", "admin").await.unwrap();

        assert_eq!(response.token.as_deref(), Some("abc123"));
        assert_eq!(f.manager.token().as_deref(), Some("abc123"));
        assert!(f.manager.is_authenticated());
        assert!(f.manager.is_admin());
        assert!(!f.manager.is_loading());
        assert_eq!(f.manager.phase(), SessionPhase::Authenticated);
        assert_eq!(f.storage.load().as_deref(), Some("abc123"));
        assert_eq!(
            f.manager.current_user(),
            Some(User {
                id: 1,
                username: "admin".to_string(),
                is_admin: true
            })
        );

        let request = f.mock.last_request().unwrap();
        assert!(request.anonymous);
        assert_eq!(request.body.unwrap(), json!({"username": "admin", "password": "admin"}));
    }

    #[tokio::test]
    async fn next_request_uses_new_token() {
        let f = fixture(None);
        f.mock.reply(Method::POST, "/auth/login", 200, admin_login());
        f.mock.reply(
            Method::GET,
            "/auth/user",
            200,
            json!({"id": 1, "username": "admin", "is_admin": true}),
        );

        f.manager.login("admin", "admin").await.unwrap();
        f.manager.fetch_current_user().await.unwrap();

        assert_eq!(f.mock.last_request().unwrap().bearer_token(), Some("abc123"));
    }

    #[tokio::test]
    async fn failed_login_leaves_anonymous_session_unchanged() {
        let f = fixture(None);
        f.mock.reply(
            Method::POST,
            "/auth/login",
            401,
            json!({"error": "用户名或密码错误"}),
        );

        let err = f.manager.login("admin", "wrong").await.unwrap_err();

        assert_eq!(err.user_message(LOGIN_FAILED), "用户名或密码错误");
        assert!(!f.manager.is_authenticated());
        assert_eq!(f.manager.phase(), SessionPhase::Anonymous);
        assert!(!f.manager.is_loading());
        assert_eq!(f.storage.load(), None);
    }

    #[tokio::test]
    async fn failed_login_keeps_existing_session() {
        let f = fixture(Some("old-token"));
        f.mock.reply(
            Method::POST,
            "/auth/login",
            401,
            json!({"error": "用户名或密码错误"}),
        );

        f.manager.login("other", "wrong").await.unwrap_err();

        assert_eq!(f.manager.token().as_deref(), Some("old-token"));
        assert_eq!(f.manager.phase(), SessionPhase::Authenticated);
        assert_eq!(f.storage.load().as_deref(), Some("old-token"));
    }

    #[tokio::test]
    async fn login_without_token_is_rejected() {
        let f = fixture(None);
        f.mock.reply(Method::POST, "/auth/login", 200, json!({"user": null}));

        let err = f.manager.login("admin", "admin").await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidLogin(_)));
        assert_eq!(err.user_message(LOGIN_FAILED), "登录失败: 无效的响应");
        assert!(!f.manager.is_authenticated());
        assert_eq!(f.storage.load(), None);
    }

    #[tokio::test]
    async fn login_network_error_uses_generic_message() {
        let f = fixture(None);
        f.mock.fail(Method::POST, "/auth/login", ApiError::Timeout);

        let err = f.manager.login("admin", "admin").await.unwrap_err();
        assert_eq!(err.user_message(LOGIN_FAILED), LOGIN_FAILED);
        assert_eq!(f.manager.phase(), SessionPhase::Anonymous);
    }

    #[tokio::test]
    async fn dropped_login_ends_authenticating() {
        let f = fixture(None);
        f.mock.reply_after(
            Method::POST,
            "/auth/login",
            Duration::from_millis(200),
            200,
            admin_login(),
        );

        let result =
            tokio::time::timeout(Duration::from_millis(20), f.manager.login("admin", "admin"))
                .await;

        assert!(result.is_err());
        assert_eq!(f.manager.phase(), SessionPhase::Anonymous);
        assert!(!f.manager.is_loading());
        assert!(!f.manager.is_authenticated());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let f = fixture(Some("abc123"));
        let listener = Arc::new(CountingListener::default());
        f.manager.set_listener(listener.clone());

        f.manager.logout().await;
        let after_first = (f.manager.token(), f.manager.current_user(), f.manager.phase());
        f.manager.logout().await;
        let after_second = (f.manager.token(), f.manager.current_user(), f.manager.phase());

        assert_eq!(after_first, after_second);
        assert_eq!(after_second, (None, None, SessionPhase::Anonymous));
        assert_eq!(f.storage.load(), None);
        assert_eq!(listener.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_current_user_without_token_is_noop() {
        let f = fixture(None);
        assert_eq!(f.manager.fetch_current_user().await.unwrap(), None);
        assert!(f.mock.requests().is_empty());
    }

    #[tokio::test]
    async fn fetch_current_user_401_logs_out_and_reraises() {
        let f = fixture(Some("expired"));
        let listener = Arc::new(CountingListener::default());
        f.manager.set_listener(listener.clone());
        f.mock.reply(
            Method::GET,
            "/auth/user",
            401,
            json!({"error": "认证令牌已过期或无效"}),
        );

        let err = f.manager.fetch_current_user().await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(err.is_unauthorized());
        assert_eq!(err.server_message(), Some("认证令牌已过期或无效"));
        assert_eq!(f.manager.phase(), SessionPhase::Anonymous);
        assert_eq!(f.manager.token(), None);
        assert_eq!(f.storage.load(), None);
        assert_eq!(listener.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_current_user_network_error_also_logs_out() {
        let f = fixture(Some("abc123"));
        f.mock.fail(
            Method::GET,
            "/auth/user",
            ApiError::Network("connection refused".to_string()),
        );

        let err = f.manager.fetch_current_user().await.unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert!(!f.manager.is_authenticated());
    }

    #[tokio::test]
    async fn change_password_requires_session() {
        let f = fixture(None);
        let err = f.manager.change_password("old", "newpass").await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        assert!(f.mock.requests().is_empty());
    }

    #[tokio::test]
    async fn change_password_posts_both_values() {
        let f = fixture(Some("abc123"));
        f.mock.reply(
            Method::POST,
            "/auth/change-password",
            200,
            json!({"message": "密码修改成功"}),
        );

        let response = f.manager.change_password("old", "newpass").await.unwrap();

        assert_eq!(response.message.as_deref(), Some("密码修改成功"));
        let request = f.mock.last_request().unwrap();
        assert_eq!(request.bearer_token(), Some("abc123"));
        assert_eq!(
            request.body.clone().unwrap(),
            json!({"old_password": "old", "new_password": "newpass"})
        );
        assert_eq!(f.manager.token().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn change_password_surfaces_server_message() {
        let f = fixture(Some("abc123"));
        f.mock.reply(
            Method::POST,
            "/auth/change-password",
            400,
            json!({"error": "原密码错误"}),
        );

        let err = f.manager.change_password("bad", "newpass").await.unwrap_err();
        assert_eq!(err.user_message(CHANGE_PASSWORD_FAILED), "原密码错误");
        assert!(f.manager.is_authenticated());
    }

    #[tokio::test]
    async fn init_restores_user() {
        let f = fixture(Some("abc123"));
        f.mock.reply(
            Method::GET,
            "/auth/user",
            200,
            json!({"id": 1, "username": "admin", "is_admin": true}),
        );

        f.manager.init().await;

        assert!(f.manager.is_authenticated());
        assert_eq!(f.manager.current_user().unwrap().username, "admin");
    }

    #[tokio::test]
    async fn init_with_expired_token_falls_back_to_anonymous() {
        let f = fixture(Some("expired"));
        f.mock.reply(Method::GET, "/auth/user", 401, json!({"error": "无效的认证令牌"}));

        f.manager.init().await;

        assert!(!f.manager.is_authenticated());
        assert_eq!(f.storage.load(), None);
    }

    #[tokio::test]
    async fn init_without_token_sends_nothing() {
        let f = fixture(None);
        f.manager.init().await;
        assert!(f.mock.requests().is_empty());
    }

    #[tokio::test]
    async fn login_notifies_listener() {
        let f = fixture(None);
        let listener = Arc::new(CountingListener::default());
        f.manager.set_listener(listener.clone());
        f.mock.reply(Method::POST, "/auth/login", 200, admin_login());

        f.manager.login("admin", "admin").await.unwrap();
        assert_eq!(listener.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_login_after_concurrent_401_stays_anonymous() {
        let f = fixture(Some("old"));
        f.mock.reply_after(
            Method::POST,
            "/auth/login",
            Duration::from_millis(50),
            401,
            json!({"error": "用户名或密码错误"}),
        );
        f.mock.reply_after(
            Method::GET,
            "/subscriptions",
            Duration::from_millis(10),
            401,
            json!({"error": "无效的认证令牌"}),
        );

        let (login, list) = tokio::join!(
            f.manager.login("admin", "wrong"),
            f.client.get::<serde_json::Value>("/subscriptions"),
        );

        assert!(login.is_err());
        assert!(list.is_err());
        assert_eq!(f.manager.token(), None);
        assert_eq!(f.manager.phase(), SessionPhase::Anonymous);
        assert!(!f.manager.is_authenticated());
        assert!(!f.manager.is_loading());
    }

    #[tokio::test]
    async fn late_401_for_old_token_keeps_fresh_login() {
        let f = fixture(Some("old"));
        f.mock.reply_after(
            Method::GET,
            "/subscriptions",
            Duration::from_millis(50),
            401,
            json!({"error": "无效的认证令牌"}),
        );
        f.mock.reply_after(
            Method::POST,
            "/auth/login",
            Duration::from_millis(10),
            200,
            admin_login(),
        );

        let (list, login) = tokio::join!(
            f.client.get::<serde_json::Value>("/subscriptions"),
            f.manager.login("admin", "admin"),
        );

        assert!(list.is_err());
        assert!(login.is_ok());
        let sent = f.mock.requests()[0].bearer_token().map(str::to_string);
        assert_eq!(sent.as_deref(), Some("old"));
        assert_eq!(f.manager.token().as_deref(), Some("abc123"));
        assert_eq!(f.storage.load().as_deref(), Some("abc123"));
        assert_eq!(f.manager.phase(), SessionPhase::Authenticated);
    }

    #[tokio::test]
    async fn unauthorized_current_token_clears_session() {
        let f = fixture(Some("old"));
        f.mock
            .reply(Method::GET, "/subscriptions", 401, json!({"error": "无效的认证令牌"}));

        let _ = f.client.get::<serde_json::Value>("/subscriptions").await;

        assert_eq!(f.manager.token(), None);
        assert_eq!(f.storage.load(), None);
    }

    /// 清除总是失败的存储
    struct StuckStorage(MemoryTokenStorage);

    impl TokenStorage for StuckStorage {
        fn load(&self) -> Option<String> {
            self.0.load()
        }

        fn save(&self, token: &str) -> Result<(), ApiError> {
            self.0.save(token)
        }

        fn clear(&self) -> Result<(), ApiError> {
            Err(ApiError::Storage("只读文件系统".to_string()))
        }
    }

    #[tokio::test]
    async fn logout_with_failing_storage_stops_sending_token() {
        init_test_logger();
        let mock = Arc::new(MockTransport::new());
        let storage = Arc::new(StuckStorage(MemoryTokenStorage::with_token("abc123")));
        let state = SessionState::restore(storage.clone());
        let transport = BearerAuth::new(mock.clone(), state.clone());
        let client = ApiClient::with_transport("http://localhost:8080/api", Arc::new(transport));
        let manager = SessionManager::new(client.clone(), state);
        mock.reply(Method::GET, "/subscriptions", 200, json!([]));

        manager.logout().await;
        client
            .get::<serde_json::Value>("/subscriptions")
            .await
            .unwrap();

        assert_eq!(storage.load().as_deref(), Some("abc123"));
        assert!(!manager.is_authenticated());
        assert_eq!(mock.requests()[0].bearer_token(), None);
    }
}
