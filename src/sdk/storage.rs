//! token 持久化存储
//!
//! 只保存一个键（[`TOKEN_STORAGE_KEY`]），键不存在即视为匿名。
//! 读写都是同步的。

use crate::sdk::config::TOKEN_STORAGE_KEY;
use crate::sdk::error::ApiError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// 持久化 token 存储
pub trait TokenStorage: Send + Sync {
    /// 读取已保存的 token
    fn load(&self) -> Option<String>;

    /// 保存 token，覆盖旧值
    fn save(&self, token: &str) -> Result<(), ApiError>;

    /// 删除 token，已删除时不报错
    fn clear(&self) -> Result<(), ApiError>;
}

/// 内存存储（测试或临时会话）
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| ApiError::Storage("token 锁已损坏".to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| ApiError::Storage("token 锁已损坏".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// 文件存储：JSON 对象 `{"token": "..."}`
///
/// 文件中的其他键原样保留。
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, ApiError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(ApiError::Storage(format!(
                    "读取 {} 失败: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => Err(ApiError::Storage(format!(
                "{} 不是有效的 JSON 对象",
                self.path.display()
            ))),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::Storage(format!("创建目录 {} 失败: {}", parent.display(), e))
            })?;
        }
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| ApiError::Storage(format!("序列化存储内容失败: {}", e)))?;
        std::fs::write(&self.path, content).map_err(|e| {
            ApiError::Storage(format!("写入 {} 失败: {}", self.path.display(), e))
        })
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Option<String> {
        match self.read_map() {
            Ok(map) => map
                .get(TOKEN_STORAGE_KEY)
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            Err(e) => {
                warn!("[Storage] 读取 token 失败，按匿名处理: {}", e);
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        // 文件损坏时直接覆盖
        let mut map = self.read_map().unwrap_or_default();
        map.insert(TOKEN_STORAGE_KEY.to_string(), Value::String(token.to_string()));
        self.write_map(&map)?;
        debug!("[Storage] token 已保存到 {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut map = self.read_map().unwrap_or_default();
        if map.remove(TOKEN_STORAGE_KEY).is_none() {
            return Ok(());
        }
        self.write_map(&map)?;
        debug!("[Storage] token 已从 {} 删除", self.path.display());
        Ok(())
    }
}
