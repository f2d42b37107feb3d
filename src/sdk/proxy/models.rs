//! 代理节点数据模型

use crate::sdk::store::Identified;
use serde::{Deserialize, Serialize};

/// 代理节点
///
/// 协议相关字段（uuid、password、method 等）按节点类型可选。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(default, alias = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// 所属订阅 ID
    #[serde(rename = "subscriptionId", alias = "subscription_id")]
    pub subscription_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub server: String,
    /// 服务端按原样保存解析出的端口，不保证在 1-65535 范围内
    pub port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<String>,
    #[serde(rename = "rawConfig", alias = "raw_config", default, skip_serializing_if = "Option::is_none")]
    pub raw_config: Option<String>,
    /// 列表接口联表带回的订阅名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
}

impl Proxy {
    /// `server:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

impl Identified for Proxy {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_item_with_join_fields() {
        let proxy: Proxy = serde_json::from_value(json!({
            "ID": 11,
            "CreatedAt": "2024-05-01T00:00:00Z",
            "subscriptionId": 2,
            "name": "香港 01",
            "type": "vmess",
            "server": "hk.example.net",
            "port": 443,
            "uuid": "b831381d-6324-4d53-ad4f-8cda48b30811",
            "network": "ws",
            "tls": true,
            "rawConfig": "vmess://...",
            "subscription_name": "机场A"
        }))
        .unwrap();

        assert_eq!(proxy.id, Some(11));
        assert_eq!(proxy.subscription_id, 2);
        assert_eq!(proxy.kind, "vmess");
        assert_eq!(proxy.tls, Some(true));
        assert_eq!(proxy.password, None);
        assert_eq!(proxy.subscription_name.as_deref(), Some("机场A"));
        assert_eq!(proxy.address(), "hk.example.net:443");
    }

    #[test]
    fn snake_case_foreign_key_is_accepted() {
        let proxy: Proxy = serde_json::from_value(json!({
            "id": 3,
            "subscription_id": 9,
            "name": "ss-node",
            "type": "ss",
            "server": "1.2.3.4",
            "port": 8388,
            "method": "aes-256-gcm",
            "password": "secret"
        }))
        .unwrap();

        assert_eq!(proxy.subscription_id, 9);
        assert_eq!(proxy.method.as_deref(), Some("aes-256-gcm"));
    }

    #[test]
    fn out_of_range_port_still_decodes() {
        let proxy: Proxy = serde_json::from_value(json!({
            "id": 4,
            "subscriptionId": 1,
            "name": "broken",
            "type": "trojan",
            "server": "bad.example.net",
            "port": 70000
        }))
        .unwrap();

        assert_eq!(proxy.port, 70000);
        assert_eq!(proxy.address(), "bad.example.net:70000");
    }
}
