//! 设置 HTTP API 客户端

use crate::sdk::error::ApiError;
use crate::sdk::http::ApiClient;
use crate::sdk::settings::models::Settings;
use crate::sdk::types::MessageResponse;
use tracing::debug;

#[derive(Clone)]
pub struct SettingsApi {
    client: ApiClient,
}

impl SettingsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<Settings, ApiError> {
        debug!("[SettingsAPI] 📡 获取设置");
        self.client.get("/settings").await
    }

    pub async fn save(&self, settings: &Settings) -> Result<MessageResponse, ApiError> {
        debug!("[SettingsAPI] 📡 保存设置: {:?}", settings);
        self.client.post("/settings", settings).await
    }
}
