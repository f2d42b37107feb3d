//! 代理节点 HTTP API 客户端

use crate::sdk::error::ApiError;
use crate::sdk::http::ApiClient;
use crate::sdk::proxy::models::Proxy;
use tracing::debug;

#[derive(Clone)]
pub struct ProxyApi {
    client: ApiClient,
}

impl ProxyApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 获取节点列表，可按订阅过滤
    pub async fn get_all(&self, subscription_id: Option<i64>) -> Result<Vec<Proxy>, ApiError> {
        debug!("[ProxyAPI] 📡 获取节点列表 (订阅: {:?})", subscription_id);
        let list: Option<Vec<Proxy>> = match subscription_id {
            Some(id) => {
                self.client
                    .get_with_query("/proxies", &[("subscription_id", id.to_string())])
                    .await?
            }
            None => self.client.get("/proxies").await?,
        };
        Ok(list.unwrap_or_default())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Proxy, ApiError> {
        debug!("[ProxyAPI] 📡 获取节点 {}", id);
        self.client.get(&format!("/proxies/{}", id)).await
    }
}
