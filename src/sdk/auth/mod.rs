//! 会话（登录认证）模块
//!
//! 维护 token 与当前用户，负责登录、登出、启动时恢复会话和修改密码。

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use api::AuthApi;
pub use listener::{EmptySessionListener, SessionListener};
pub use models::{ChangePasswordRequest, LoginRequest, LoginResponse, SessionPhase, User};
pub use service::{SessionManager, SessionState};
