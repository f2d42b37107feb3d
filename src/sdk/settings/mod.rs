//! 系统设置模块

pub mod api;
pub mod models;
pub mod service;

pub use api::SettingsApi;
pub use models::{MergedFormat, Settings};
pub use service::{SettingsSnapshot, SettingsStore};
