//! 订阅监听器回调接口

use crate::sdk::subscription::models::Subscription;
use async_trait::async_trait;

/// 订阅监听器
#[async_trait]
pub trait SubscriptionListener: Send + Sync {
    /// 本地订阅列表发生变更，参数为变更后的完整列表
    async fn on_subscriptions_changed(&self, subscriptions: Vec<Subscription>);
}

/// 默认空实现（无操作）
pub struct EmptySubscriptionListener;

#[async_trait]
impl SubscriptionListener for EmptySubscriptionListener {
    async fn on_subscriptions_changed(&self, _subscriptions: Vec<Subscription>) {
        // 默认不做任何处理
    }
}
