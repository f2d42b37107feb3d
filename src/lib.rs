pub mod sdk;

// 重新导出常用类型，方便外部使用
pub use sdk::{
    auth::{SessionManager, SessionPhase, SessionState, User},
    client::PanelClient,
    config::{ClientConfig, ExecutionContext, PageLocation, UpdateMissPolicy},
    error::{ApiError, ErrorKind},
    guard::{NavigationDecision, NavigationGuard, RouteTarget},
    proxy::{Proxy, ProxyStore},
    settings::{MergedFormat, Settings, SettingsStore},
    storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage},
    subscription::{Subscription, SubscriptionStore, SubscriptionType},
};
