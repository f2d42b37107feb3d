pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod proxy;
pub mod settings;
pub mod storage;
pub mod store;
pub mod subscription;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出会话相关类型
pub use auth::{SessionListener, SessionManager, SessionState};

// 重新导出 HTTP 层类型
pub use http::{ApiClient, BearerAuth, HttpTransport, TokenSource, Transport};
