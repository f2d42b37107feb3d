//! 代理节点 store（只读）

use crate::sdk::error::ApiError;
use crate::sdk::http::ApiClient;
use crate::sdk::proxy::api::ProxyApi;
use crate::sdk::proxy::listener::{EmptyProxyListener, ProxyListener};
use crate::sdk::proxy::models::Proxy;
use crate::sdk::store::{CollectionCache, StoreSnapshot};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

const FETCH_FAILED: &str = "获取代理节点失败";
const FETCH_ONE_FAILED: &str = "获取代理节点详情失败";

pub struct ProxyStore {
    api: ProxyApi,
    cache: CollectionCache<Proxy>,
    listener: Mutex<Arc<dyn ProxyListener>>,
}

impl ProxyStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            api: ProxyApi::new(client),
            cache: CollectionCache::new(),
            listener: Mutex::new(Arc::new(EmptyProxyListener)),
        }
    }

    pub fn set_listener(&self, listener: Arc<dyn ProxyListener>) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = listener;
    }

    async fn notify(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        listener.on_proxies_changed(self.cache.items()).await;
    }

    fn record(&self, err: &ApiError, fallback: &str) {
        error!("[ProxyStore] ❌ {}: {}", fallback, err);
        self.cache.set_error(err.user_message(fallback));
    }

    pub fn snapshot(&self) -> StoreSnapshot<Proxy> {
        self.cache.snapshot()
    }

    pub fn proxies(&self) -> Vec<Proxy> {
        self.cache.items()
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.cache.error()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn get_by_id(&self, id: i64) -> Option<Proxy> {
        self.cache.find(id)
    }

    /// 属于指定订阅的节点
    pub fn by_subscription(&self, subscription_id: i64) -> Vec<Proxy> {
        self.cache.filter(|p| p.subscription_id == subscription_id)
    }

    /// 获取节点列表并整体替换本地缓存
    ///
    /// 带订阅过滤时，缓存中只剩该订阅的节点。
    pub async fn fetch_all(&self, subscription_id: Option<i64>) {
        let _loading = self.cache.begin();
        match self.api.get_all(subscription_id).await {
            Ok(list) => {
                info!(
                    "[ProxyStore] ✅ 获取节点列表，共 {} 个 (订阅: {:?})",
                    list.len(),
                    subscription_id
                );
                self.cache.replace_all(list);
                self.notify().await;
            }
            Err(e) => self.record(&e, FETCH_FAILED),
        }
    }

    pub async fn fetch_by_id(&self, id: i64) -> Option<Proxy> {
        let _loading = self.cache.begin();
        match self.api.get_by_id(id).await {
            Ok(proxy) => {
                debug!("[ProxyStore] 获取节点 {} 成功", id);
                self.cache.upsert(proxy.clone());
                self.notify().await;
                Some(proxy)
            }
            Err(e) => {
                self.record(&e, FETCH_ONE_FAILED);
                None
            }
        }
    }
}
