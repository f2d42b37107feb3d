//! 订阅数据模型

use crate::sdk::proxy::models::Proxy;
use crate::sdk::store::Identified;
use crate::sdk::types::deserialize_vec_or_null;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// 订阅类型
///
/// 未识别的类型原样保留，更新时按原值回传给服务端。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionType {
    V2ray,
    Ss,
    Trojan,
    Mixed,
    Sip002,
    Sip008,
    Clash,
    Surge,
    Quantumult,
    Json,
    Other(String),
}

impl SubscriptionType {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionType::V2ray => "v2ray",
            SubscriptionType::Ss => "ss",
            SubscriptionType::Trojan => "trojan",
            SubscriptionType::Mixed => "mixed",
            SubscriptionType::Sip002 => "sip002",
            SubscriptionType::Sip008 => "sip008",
            SubscriptionType::Clash => "clash",
            SubscriptionType::Surge => "surge",
            SubscriptionType::Quantumult => "quantumult",
            SubscriptionType::Json => "json",
            SubscriptionType::Other(s) => s,
        }
    }
}

impl From<String> for SubscriptionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "v2ray" => SubscriptionType::V2ray,
            "ss" => SubscriptionType::Ss,
            "trojan" => SubscriptionType::Trojan,
            "mixed" => SubscriptionType::Mixed,
            "sip002" => SubscriptionType::Sip002,
            "sip008" => SubscriptionType::Sip008,
            "clash" => SubscriptionType::Clash,
            "surge" => SubscriptionType::Surge,
            "quantumult" => SubscriptionType::Quantumult,
            "json" => SubscriptionType::Json,
            _ => SubscriptionType::Other(s),
        }
    }
}

impl From<SubscriptionType> for String {
    fn from(t: SubscriptionType) -> Self {
        match t {
            SubscriptionType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for SubscriptionType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SubscriptionType::from(s.to_string()))
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_enabled() -> bool {
    true
}

/// 订阅
///
/// `id` 由服务端分配；没有 `id` 的订阅是尚未提交的本地草稿。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default, alias = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: SubscriptionType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(
        rename = "createdAt",
        alias = "created_at",
        alias = "CreatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "updatedAt",
        alias = "updated_at",
        alias = "UpdatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "valid_proxy_count",
        alias = "validProxyCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_proxy_count: Option<i64>,
    /// 服务端随订阅一起返回的节点（只读，不回传）
    #[serde(default, deserialize_with = "deserialize_vec_or_null", skip_serializing)]
    pub proxies: Vec<Proxy>,
}

impl Subscription {
    /// 创建本地草稿（默认启用）
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: SubscriptionType) -> Self {
        Self {
            id: None,
            name: name.into(),
            url: url.into(),
            kind,
            enabled: true,
            last_updated: None,
            created_at: None,
            updated_at: None,
            valid_proxy_count: None,
            proxies: Vec::new(),
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }
}

impl Identified for Subscription {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

/// 创建订阅的响应
///
/// 服务端在创建后立即刷新订阅：刷新成功返回订阅本身（201），
/// 刷新失败返回 `{subscription, warning}`（200）。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreateSubscriptionResponse {
    Envelope {
        subscription: Subscription,
        #[serde(default)]
        warning: Option<String>,
    },
    Bare(Subscription),
}

/// 创建成功的订阅
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSubscription {
    pub subscription: Subscription,
    /// 已创建但首次刷新失败时的提示
    pub warning: Option<String>,
}

impl From<CreateSubscriptionResponse> for CreatedSubscription {
    fn from(resp: CreateSubscriptionResponse) -> Self {
        match resp {
            CreateSubscriptionResponse::Envelope {
                subscription,
                warning,
            } => Self {
                subscription,
                warning: warning.filter(|w| !w.is_empty()),
            },
            CreateSubscriptionResponse::Bare(subscription) => Self {
                subscription,
                warning: None,
            },
        }
    }
}

/// 刷新订阅的响应
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub subscription: Subscription,
}
