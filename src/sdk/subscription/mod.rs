//! 订阅模块
//!
//! 本地缓存服务端的订阅列表，并提供增删改查和刷新。

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use api::SubscriptionApi;
pub use listener::{EmptySubscriptionListener, SubscriptionListener};
pub use models::{CreatedSubscription, RefreshResponse, Subscription, SubscriptionType};
pub use service::SubscriptionStore;
