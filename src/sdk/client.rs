//! 面板客户端
//!
//! 按配置组装存储、会话、HTTP 客户端和各个 store。
//! 调用方持有 `PanelClient` 实例并按需传递，不存在全局单例。

use crate::sdk::auth::{SessionManager, SessionState};
use crate::sdk::config::ClientConfig;
use crate::sdk::error::ApiError;
use crate::sdk::guard::{NavigationDecision, NavigationGuard};
use crate::sdk::http::ApiClient;
use crate::sdk::proxy::ProxyStore;
use crate::sdk::settings::{MergedFormat, SettingsStore};
use crate::sdk::storage::{FileTokenStorage, TokenStorage};
use crate::sdk::subscription::SubscriptionStore;
use std::sync::Arc;
use tracing::info;

pub struct PanelClient {
    config: ClientConfig,
    client: ApiClient,
    session: SessionManager,
    subscriptions: SubscriptionStore,
    proxies: ProxyStore,
    settings: SettingsStore,
    guard: NavigationGuard,
}

impl PanelClient {
    /// 使用文件存储 token 创建客户端
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let storage: Arc<dyn TokenStorage> = Arc::new(FileTokenStorage::new(&config.token_path));
        let state = SessionState::restore(storage);
        let client = ApiClient::new(&config, state.clone())?;
        info!(
            "[Panel] 🚀 API 地址: {}，token 文件: {}",
            client.base_url(),
            config.token_path.display()
        );
        Ok(Self::with_parts(config, client, state))
    }

    /// 使用已构建好的 HTTP 客户端和会话状态组装
    ///
    /// `client` 应当以 `state` 作为 token 来源。
    pub fn with_parts(config: ClientConfig, client: ApiClient, state: Arc<SessionState>) -> Self {
        Self {
            session: SessionManager::new(client.clone(), state),
            subscriptions: SubscriptionStore::with_miss_policy(
                client.clone(),
                config.update_miss_policy,
            ),
            proxies: ProxyStore::new(client.clone()),
            settings: SettingsStore::new(client.clone()),
            guard: NavigationGuard::default(),
            client,
            config,
        }
    }

    /// 启动时恢复会话
    pub async fn init(&self) {
        self.session.init().await;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }

    pub fn proxies(&self) -> &ProxyStore {
        &self.proxies
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// 按当前会话状态判定一次导航
    pub fn navigate(&self, full_path: &str) -> NavigationDecision {
        self.guard
            .check(full_path, self.session.is_authenticated())
    }

    pub fn merged_subscription_url(&self, format: MergedFormat) -> String {
        self.client.merged_subscription_url(format)
    }
}
