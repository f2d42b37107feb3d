//! 设置数据模型

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 合并订阅的导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergedFormat {
    #[default]
    Base64,
    Clash,
    Json,
}

impl MergedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergedFormat::Base64 => "base64",
            MergedFormat::Clash => "clash",
            MergedFormat::Json => "json",
        }
    }
}

impl FromStr for MergedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base64" => Ok(MergedFormat::Base64),
            "clash" => Ok(MergedFormat::Clash),
            "json" => Ok(MergedFormat::Json),
            other => Err(format!("不支持的格式: {}", other)),
        }
    }
}

impl fmt::Display for MergedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_refresh_interval() -> u32 {
    6
}

/// 系统设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub auto_refresh: bool,
    /// 自动刷新间隔（小时）
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u32,
    #[serde(default)]
    pub default_format: MergedFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_refresh: false,
            refresh_interval: default_refresh_interval(),
            default_format: MergedFormat::default(),
        }
    }
}
