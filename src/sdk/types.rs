use serde::{Deserialize, Deserializer, Serialize};

/// 服务端错误响应体：`{"error": "..."}`，少数接口使用 `message`
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 只包含提示信息的响应，例如删除订阅、修改密码、保存设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// 从错误响应体中提取服务端错误文本
///
/// 响应体不是 JSON 时返回 `None`，不把原始响应文本当作错误信息。
pub fn parse_error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .error
        .or(parsed.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_is_preferred() {
        let body = r#"{"error":"用户名或密码错误","message":"ignored"}"#.as_bytes();
        assert_eq!(parse_error_message(body).as_deref(), Some("用户名或密码错误"));
    }

    #[test]
    fn message_field_is_fallback() {
        let body = r#"{"message":"订阅不存在"}"#.as_bytes();
        assert_eq!(parse_error_message(body).as_deref(), Some("订阅不存在"));
    }

    #[test]
    fn non_json_body_has_no_message() {
        assert_eq!(parse_error_message(b"<html>502 Bad Gateway</html>"), None);
        assert_eq!(parse_error_message(b""), None);
        assert_eq!(parse_error_message(br#"{"error":"  "}"#), None);
    }
}
