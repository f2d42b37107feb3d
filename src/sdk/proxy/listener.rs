//! 代理节点监听器回调接口

use crate::sdk::proxy::models::Proxy;
use async_trait::async_trait;

/// 代理节点监听器
#[async_trait]
pub trait ProxyListener: Send + Sync {
    /// 本地节点列表发生变更
    async fn on_proxies_changed(&self, proxies: Vec<Proxy>);
}

/// 默认空实现
pub struct EmptyProxyListener;

#[async_trait]
impl ProxyListener for EmptyProxyListener {
    async fn on_proxies_changed(&self, _proxies: Vec<Proxy>) {}
}
