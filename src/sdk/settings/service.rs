//! 设置 store
//!
//! 与集合 store 遵循同样的约定：读失败只记录，写失败记录并返回。

use crate::sdk::error::ApiError;
use crate::sdk::http::ApiClient;
use crate::sdk::settings::api::SettingsApi;
use crate::sdk::settings::models::Settings;
use crate::sdk::types::MessageResponse;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info};

const FETCH_FAILED: &str = "获取设置失败";
const SAVE_FAILED: &str = "保存设置失败";

/// 设置 store 状态快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    pub loading: bool,
    pub error: Option<String>,
    /// 尚未从服务端获取时为 `None`
    pub settings: Option<Settings>,
}

pub struct SettingsStore {
    api: SettingsApi,
    state: Mutex<SettingsSnapshot>,
}

struct Loading<'a>(&'a SettingsStore);

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.lock().loading = false;
    }
}

impl SettingsStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            api: SettingsApi::new(client),
            state: Mutex::new(SettingsSnapshot::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SettingsSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self) -> Loading<'_> {
        let mut state = self.lock();
        state.loading = true;
        state.error = None;
        Loading(self)
    }

    fn record(&self, err: &ApiError, fallback: &str) {
        error!("[Settings] ❌ {}: {}", fallback, err);
        self.lock().error = Some(err.user_message(fallback));
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        self.lock().clone()
    }

    pub fn settings(&self) -> Option<Settings> {
        self.lock().settings.clone()
    }

    /// 当前设置，尚未获取时返回默认值
    pub fn current_or_default(&self) -> Settings {
        self.settings().unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// 从服务端获取设置；失败只记录
    pub async fn fetch(&self) -> Option<Settings> {
        let _loading = self.begin();
        match self.api.get().await {
            Ok(settings) => {
                info!("[Settings] ✅ 获取设置: {:?}", settings);
                self.lock().settings = Some(settings.clone());
                Some(settings)
            }
            Err(e) => {
                self.record(&e, FETCH_FAILED);
                None
            }
        }
    }

    /// 保存设置，成功后本地缓存即为提交的值
    pub async fn save(&self, settings: &Settings) -> Result<MessageResponse, ApiError> {
        let _loading = self.begin();
        let response = self.api.save(settings).await.map_err(|e| {
            self.record(&e, SAVE_FAILED);
            e
        })?;
        info!("[Settings] ✅ 设置已保存");
        self.lock().settings = Some(settings.clone());
        Ok(response)
    }
}
