//! 订阅 store
//!
//! 每个操作开始时 loading=true、error 清空，结束时 loading=false。
//! 读操作失败只记录到 error；写操作失败记录后继续向调用方返回错误。

use crate::sdk::config::UpdateMissPolicy;
use crate::sdk::error::ApiError;
use crate::sdk::http::ApiClient;
use crate::sdk::store::{CollectionCache, StoreSnapshot};
use crate::sdk::subscription::api::SubscriptionApi;
use crate::sdk::subscription::listener::{EmptySubscriptionListener, SubscriptionListener};
use crate::sdk::subscription::models::{CreatedSubscription, RefreshResponse, Subscription};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

const FETCH_FAILED: &str = "获取订阅失败";
const FETCH_ONE_FAILED: &str = "获取订阅详情失败";
const CREATE_FAILED: &str = "添加订阅失败";
const UPDATE_FAILED: &str = "更新订阅失败";
const DELETE_FAILED: &str = "删除订阅失败";
const REFRESH_FAILED: &str = "刷新订阅失败";

/// 订阅 store
pub struct SubscriptionStore {
    api: SubscriptionApi,
    cache: CollectionCache<Subscription>,
    miss_policy: UpdateMissPolicy,
    listener: Mutex<Arc<dyn SubscriptionListener>>,
}

impl SubscriptionStore {
    pub fn new(client: ApiClient) -> Self {
        Self::with_miss_policy(client, UpdateMissPolicy::default())
    }

    pub fn with_miss_policy(client: ApiClient, miss_policy: UpdateMissPolicy) -> Self {
        Self {
            api: SubscriptionApi::new(client),
            cache: CollectionCache::new(),
            miss_policy,
            listener: Mutex::new(Arc::new(EmptySubscriptionListener)),
        }
    }

    /// 注册订阅监听器
    pub fn set_listener(&self, listener: Arc<dyn SubscriptionListener>) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = listener;
    }

    async fn notify(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        listener.on_subscriptions_changed(self.cache.items()).await;
    }

    fn record(&self, err: &ApiError, fallback: &str) {
        error!("[SubStore] ❌ {}: {}", fallback, err);
        self.cache.set_error(err.user_message(fallback));
    }

    // ========== 状态读取 ==========

    pub fn snapshot(&self) -> StoreSnapshot<Subscription> {
        self.cache.snapshot()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
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

    /// 按 ID 查找
    pub fn get_by_id(&self, id: i64) -> Option<Subscription> {
        self.cache.find(id)
    }

    /// 已启用的订阅
    pub fn enabled(&self) -> Vec<Subscription> {
        self.cache.filter(|s| s.enabled)
    }

    // ========== 操作 ==========

    /// 用服务端列表整体替换本地缓存；失败只记录
    pub async fn fetch_all(&self) {
        let _loading = self.cache.begin();
        match self.api.get_all().await {
            Ok(list) => {
                info!("[SubStore] ✅ 获取订阅列表，共 {} 个", list.len());
                self.cache.replace_all(list);
                self.notify().await;
            }
            Err(e) => self.record(&e, FETCH_FAILED),
        }
    }

    /// 获取单个订阅：已存在则原位替换，否则追加；失败只记录
    pub async fn fetch_by_id(&self, id: i64) -> Option<Subscription> {
        let _loading = self.cache.begin();
        match self.api.get_by_id(id).await {
            Ok(sub) => {
                debug!("[SubStore] 获取订阅 {} 成功", id);
                self.cache.upsert(sub.clone());
                self.notify().await;
                Some(sub)
            }
            Err(e) => {
                self.record(&e, FETCH_ONE_FAILED);
                None
            }
        }
    }

    /// 创建订阅，成功后把服务端返回的订阅追加到末尾
    pub async fn create(&self, draft: &Subscription) -> Result<CreatedSubscription, ApiError> {
        let _loading = self.cache.begin();
        let created = self.api.create(draft).await.map_err(|e| {
            self.record(&e, CREATE_FAILED);
            e
        })?;

        if let Some(warning) = &created.warning {
            warn!("[SubStore] ⚠️ {}", warning);
        }
        info!(
            "[SubStore] ✅ 新增订阅 {} (ID: {:?})",
            created.subscription.name, created.subscription.id
        );
        self.cache.push(created.subscription.clone());
        self.notify().await;
        Ok(created)
    }

    /// 更新订阅
    ///
    /// 本地缓存中找不到该 ID 时按 [`UpdateMissPolicy`] 处理，不视为错误。
    pub async fn update(&self, id: i64, subscription: &Subscription) -> Result<Subscription, ApiError> {
        let _loading = self.cache.begin();
        let updated = self.api.update(id, subscription).await.map_err(|e| {
            self.record(&e, UPDATE_FAILED);
            e
        })?;

        if self.cache.replace_existing(id, updated.clone()) {
            info!("[SubStore] ✅ 更新订阅 {}", id);
            self.notify().await;
        } else {
            match self.miss_policy {
                UpdateMissPolicy::Drop => {
                    warn!("[SubStore] 本地缓存中没有订阅 {}，服务端已更新但不写入缓存", id);
                }
                UpdateMissPolicy::Insert => {
                    warn!("[SubStore] 本地缓存中没有订阅 {}，追加到末尾", id);
                    self.cache.push(updated.clone());
                    self.notify().await;
                }
            }
        }
        Ok(updated)
    }

    /// 删除订阅；本地没有该条目不是错误
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let _loading = self.cache.begin();
        self.api.delete(id).await.map_err(|e| {
            self.record(&e, DELETE_FAILED);
            e
        })?;

        if self.cache.remove(id) {
            info!("[SubStore] ✅ 删除订阅 {}", id);
            self.notify().await;
        } else {
            debug!("[SubStore] 订阅 {} 不在本地缓存中", id);
        }
        Ok(())
    }

    /// 让服务端重新拉取订阅内容，并用响应中的订阅替换本地条目
    pub async fn refresh(&self, id: i64) -> Result<RefreshResponse, ApiError> {
        let _loading = self.cache.begin();
        let response = self.api.refresh(id).await.map_err(|e| {
            self.record(&e, REFRESH_FAILED);
            e
        })?;

        if self.cache.replace_existing(id, response.subscription.clone()) {
            info!(
                "[SubStore] ✅ 刷新订阅 {}，有效节点: {:?}",
                id, response.subscription.valid_proxy_count
            );
            self.notify().await;
        } else {
            debug!("[SubStore] 订阅 {} 不在本地缓存中，刷新结果不写入缓存", id);
        }
        Ok(response)
    }
}
