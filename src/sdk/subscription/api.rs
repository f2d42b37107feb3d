//! 订阅 HTTP API 客户端

use crate::sdk::error::ApiError;
use crate::sdk::http::ApiClient;
use crate::sdk::subscription::models::{
    CreateSubscriptionResponse, CreatedSubscription, RefreshResponse, Subscription,
};
use tracing::debug;

/// 订阅相关的 HTTP API 客户端
#[derive(Clone)]
pub struct SubscriptionApi {
    client: ApiClient,
}

impl SubscriptionApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 获取全部订阅
    pub async fn get_all(&self) -> Result<Vec<Subscription>, ApiError> {
        debug!("[SubAPI] 📡 获取全部订阅");
        let list: Option<Vec<Subscription>> = self.client.get("/subscriptions").await?;
        Ok(list.unwrap_or_default())
    }

    /// 获取单个订阅
    pub async fn get_by_id(&self, id: i64) -> Result<Subscription, ApiError> {
        debug!("[SubAPI] 📡 获取订阅 {}", id);
        self.client.get(&format!("/subscriptions/{}", id)).await
    }

    /// 创建订阅
    pub async fn create(&self, subscription: &Subscription) -> Result<CreatedSubscription, ApiError> {
        debug!("[SubAPI] 📡 创建订阅: {}", subscription.name);
        let resp: CreateSubscriptionResponse =
            self.client.post("/subscriptions", subscription).await?;
        Ok(resp.into())
    }

    /// 更新订阅（整体替换）
    pub async fn update(&self, id: i64, subscription: &Subscription) -> Result<Subscription, ApiError> {
        debug!("[SubAPI] 📡 更新订阅 {}", id);
        self.client
            .put(&format!("/subscriptions/{}", id), subscription)
            .await
    }

    /// 删除订阅
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        debug!("[SubAPI] 📡 删除订阅 {}", id);
        self.client.delete(&format!("/subscriptions/{}", id)).await
    }

    /// 让服务端重新拉取订阅内容
    pub async fn refresh(&self, id: i64) -> Result<RefreshResponse, ApiError> {
        debug!("[SubAPI] 📡 刷新订阅 {}", id);
        self.client
            .post_empty(&format!("/subscriptions/{}/refresh", id))
            .await
    }
}
