//! 代理节点模块
//!
//! 节点由服务端从订阅内容中解析得到，客户端只读。

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

pub use api::ProxyApi;
pub use listener::{EmptyProxyListener, ProxyListener};
pub use models::Proxy;
pub use service::ProxyStore;
