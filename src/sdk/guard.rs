//! 导航守卫
//!
//! 与具体路由实现无关：输入目标路由和当前是否已登录，输出放行或重定向。
//! 守卫只读取会话状态，不做任何修改。

use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
const REDIRECT_QUERY_KEY: &str = "redirect";

/// 导航目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// 路由路径，例如 `/subscriptions`
    pub path: String,
    /// 含查询参数的完整路径，登录后据此跳回
    pub full_path: String,
    pub name: Option<String>,
    pub requires_auth: bool,
}

impl RouteTarget {
    pub fn new(path: impl Into<String>, requires_auth: bool) -> Self {
        let path = path.into();
        Self {
            full_path: path.clone(),
            path,
            name: None,
            requires_auth,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_full_path(mut self, full_path: impl Into<String>) -> Self {
        self.full_path = full_path.into();
        self
    }
}

/// 守卫判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect {
        path: String,
        query: Vec<(String, String)>,
    },
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }

    /// 重定向地址（查询参数已编码）；放行时返回 `None`
    pub fn location(&self) -> Option<String> {
        match self {
            NavigationDecision::Allow => None,
            NavigationDecision::Redirect { path, query } if query.is_empty() => Some(path.clone()),
            NavigationDecision::Redirect { path, query } => {
                let query = query
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&");
                Some(format!("{}?{}", path, query))
            }
        }
    }
}

/// 守卫规则，按顺序：
/// 1. 需要登录但未登录：跳转登录页，并带上原目标地址
/// 2. 已登录但访问登录页：跳转首页
/// 3. 其他情况放行
pub fn decide(
    requires_auth: bool,
    is_authenticated: bool,
    is_login_target: bool,
    full_path: &str,
) -> NavigationDecision {
    if requires_auth && !is_authenticated {
        return NavigationDecision::Redirect {
            path: LOGIN_PATH.to_string(),
            query: vec![(REDIRECT_QUERY_KEY.to_string(), full_path.to_string())],
        };
    }
    if is_login_target && is_authenticated {
        return NavigationDecision::Redirect {
            path: HOME_PATH.to_string(),
            query: Vec::new(),
        };
    }
    NavigationDecision::Allow
}

/// 带路由表的守卫
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    routes: Vec<RouteTarget>,
    login_path: String,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new(vec![
            RouteTarget::new(HOME_PATH, true).named("home"),
            RouteTarget::new(LOGIN_PATH, false).named("login"),
            RouteTarget::new("/subscriptions", true).named("Subscriptions"),
            RouteTarget::new("/proxies", true).named("proxies"),
            RouteTarget::new("/settings", true).named("settings"),
        ])
    }
}

impl NavigationGuard {
    pub fn new(routes: Vec<RouteTarget>) -> Self {
        Self {
            routes,
            login_path: LOGIN_PATH.to_string(),
        }
    }

    pub fn routes(&self) -> &[RouteTarget] {
        &self.routes
    }

    /// 按完整路径匹配路由表
    ///
    /// 未登记的路径不要求登录。
    pub fn resolve(&self, full_path: &str) -> RouteTarget {
        let path = full_path
            .split(['?', '#'])
            .next()
            .unwrap_or(full_path);
        let path = match path.trim_end_matches('/') {
            "" => HOME_PATH,
            trimmed => trimmed,
        };

        self.routes
            .iter()
            .find(|r| r.path == path)
            .cloned()
            .unwrap_or_else(|| RouteTarget::new(path, false))
            .with_full_path(full_path)
    }

    pub fn is_login_target(&self, target: &RouteTarget) -> bool {
        target.path == self.login_path
    }

    pub fn decide(&self, target: &RouteTarget, is_authenticated: bool) -> NavigationDecision {
        let decision = decide(
            target.requires_auth,
            is_authenticated,
            self.is_login_target(target),
            &target.full_path,
        );
        debug!(
            "[Guard] {} (已登录: {}) -> {:?}",
            target.full_path, is_authenticated, decision
        );
        decision
    }

    /// 解析路径并判定
    pub fn check(&self, full_path: &str, is_authenticated: bool) -> NavigationDecision {
        self.decide(&self.resolve(full_path), is_authenticated)
    }
}
