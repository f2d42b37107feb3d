//! 测试用的脚本化服务端

use crate::sdk::error::ApiError;
use crate::sdk::http::{ApiClient, ApiRequest, RawResponse, Transport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

pub(crate) fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter_layer = EnvFilter::new("info,proxy_subscription_sdk=debug");
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}

#[derive(Clone)]
enum Reply {
    Json {
        status: u16,
        body: Value,
        delay: Option<Duration>,
    },
    Fail(ApiError),
}

/// 单个路径上排队的响应
#[derive(Default)]
struct Route {
    queue: VecDeque<Reply>,
    /// 最近一次返回的响应，队列为空时重复返回
    last: Option<Reply>,
}

/// 按 (方法, 路径) 返回预设响应，并记录收到的所有请求
///
/// 同一路径可排队多条响应，依次返回；队列取空后重复最近返回的那条。
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .queue
            .push_back(reply);
    }

    pub(crate) fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            Reply::Json {
                status,
                body,
                delay: None,
            },
        );
    }

    pub(crate) fn reply_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        status: u16,
        body: Value,
    ) {
        self.push(
            method,
            path,
            Reply::Json {
                status,
                body,
                delay: Some(delay),
            },
        );
    }

    pub(crate) fn fail(&self, method: Method, path: &str, err: ApiError) {
        self.push(method, path, Reply::Fail(err));
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub(crate) fn request_count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.get_mut(&(method.clone(), path.to_string()))?;
        match route.queue.pop_front() {
            Some(reply) => {
                route.last = Some(reply.clone());
                Some(reply)
            }
            None => route.last.clone(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let reply = self.next_reply(&request.method, &request.path);
        self.requests.lock().unwrap().push(request);

        match reply {
            Some(Reply::Json {
                status,
                body,
                delay,
            }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(RawResponse {
                    status,
                    body: serde_json::to_vec(&body).unwrap(),
                })
            }
            Some(Reply::Fail(err)) => Err(err),
            None => Ok(RawResponse {
                status: 404,
                body: br#"{"error":"not found"}"#.to_vec(),
            }),
        }
    }
}

/// 不带认证中间件的客户端
pub(crate) fn plain_client(mock: &Arc<MockTransport>) -> ApiClient {
    ApiClient::with_transport("http://localhost:8080/api", mock.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn status_of(mock: &MockTransport, path: &str) -> u16 {
        mock.execute(ApiRequest::new(Method::GET, path))
            .await
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn replies_queued_later_are_served_next() {
        let mock = MockTransport::new();
        mock.reply(Method::GET, "/subscriptions", 200, json!([]));
        assert_eq!(status_of(&mock, "/subscriptions").await, 200);
        assert_eq!(status_of(&mock, "/subscriptions").await, 200);

        mock.reply(Method::GET, "/subscriptions", 500, json!({"error": "boom"}));
        assert_eq!(status_of(&mock, "/subscriptions").await, 500);
        assert_eq!(status_of(&mock, "/subscriptions").await, 500);
        assert_eq!(status_of(&mock, "/unknown").await, 404);
    }
}
