//! 订阅管理面板命令行客户端
//!
//! 每次执行一个命令：登录状态保存在 token 文件中，后续命令自动携带。

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use proxy_subscription_sdk::{
    ClientConfig, MergedFormat, NavigationDecision, PageLocation, PanelClient, Subscription,
    SubscriptionType, UpdateMissPolicy,
};
use serde::Serialize;
use tracing::{info, warn};

/// 订阅管理面板 CLI
#[derive(Parser, Debug)]
#[command(name = "psub-cli")]
#[command(about = "代理订阅管理面板 CLI", long_about = None)]
struct Cli {
    /// 运行环境：development 或 production（默认读取 PSUB_ENV）
    #[arg(long)]
    env: Option<String>,

    /// 生产环境下的页面地址，API 地址由它推导（默认读取 PSUB_PAGE_URL）
    #[arg(long)]
    page_url: Option<String>,

    /// 显式指定 API 端口（默认读取 PSUB_API_PORT）
    #[arg(long)]
    api_port: Option<String>,

    /// token 文件路径（默认读取 PSUB_TOKEN_PATH）
    #[arg(long)]
    token_path: Option<std::path::PathBuf>,

    /// 更新时本地缓存没有该订阅则追加
    #[arg(long)]
    insert_on_miss: bool,

    /// 日志级别
    #[arg(long, default_value = "warn,proxy_subscription_sdk=info")]
    log_level: String,

    /// 日志文件
    #[arg(long, default_value = "psub-cli.log")]
    log_file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录并保存 token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// 清除本地会话
    Logout,
    /// 显示当前用户
    Whoami,
    /// 修改密码
    Passwd {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// 订阅管理
    #[command(subcommand)]
    Subs(SubsCommand),
    /// 查看代理节点
    Proxies {
        /// 只显示指定订阅的节点
        #[arg(short, long)]
        subscription: Option<i64>,
        /// 显示单个节点详情
        #[arg(long)]
        id: Option<i64>,
    },
    /// 系统设置
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// 输出合并订阅链接
    MergedUrl {
        /// base64、clash 或 json，默认使用服务端设置
        #[arg(short, long)]
        format: Option<MergedFormat>,
    },
    /// 以当前会话判定一次页面导航
    Route { path: String },
}

#[derive(Subcommand, Debug)]
enum SubsCommand {
    /// 列出全部订阅
    List {
        /// 只显示已启用的订阅
        #[arg(long)]
        enabled: bool,
    },
    /// 查看单个订阅
    Get { id: i64 },
    /// 添加订阅
    Add(SubscriptionArgs),
    /// 修改订阅
    Update {
        id: i64,
        #[command(flatten)]
        changes: SubscriptionChanges,
    },
    /// 删除订阅
    Delete { id: i64 },
    /// 让服务端重新拉取订阅内容
    Refresh { id: i64 },
}

#[derive(Args, Debug)]
struct SubscriptionArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    url: String,
    #[arg(long = "type", default_value = "v2ray")]
    kind: SubscriptionType,
    #[arg(long)]
    disabled: bool,
}

#[derive(Args, Debug)]
struct SubscriptionChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long = "type")]
    kind: Option<SubscriptionType>,
    #[arg(long)]
    enabled: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Get,
    Set {
        #[arg(long)]
        auto_refresh: Option<bool>,
        /// 自动刷新间隔（小时）
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long)]
        format: Option<MergedFormat>,
    },
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str, log_path: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    // 只给出页面地址时按生产环境处理
    let env = cli
        .env
        .clone()
        .or_else(|| cli.page_url.as_ref().map(|_| "production".to_string()));
    let mut config = match env.as_deref() {
        None => ClientConfig::from_env().context("读取环境变量配置失败")?,
        Some("development" | "dev") => ClientConfig::development(),
        Some("production" | "prod") => {
            let page_url = cli
                .page_url
                .clone()
                .or_else(|| std::env::var("PSUB_PAGE_URL").ok())
                .context("生产环境需要 --page-url 或 PSUB_PAGE_URL")?;
            ClientConfig::production(PageLocation::parse(&page_url)?)
        }
        Some(other) => bail!("未知的运行环境: {}", other),
    };

    if let Some(port) = &cli.api_port {
        config = config.with_api_port(port.clone());
    }
    if let Some(path) = &cli.token_path {
        config = config.with_token_path(path.clone());
    }
    if cli.insert_on_miss {
        config = config.with_update_miss_policy(UpdateMissPolicy::Insert);
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, &cli.log_file)?;

    let config = build_config(&cli)?;
    let panel = PanelClient::new(config).context("创建客户端失败")?;
    info!("[CLI] 🚀 API: {}", panel.api().base_url());

    match cli.command {
        Command::Login { username, password } => {
            let response = panel
                .session()
                .login(&username, &password)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("登录失败")))?;
            print_json(&response.user)?;
        }
        Command::Logout => {
            panel.session().logout().await;
            println!("已登出");
        }
        Command::Whoami => match panel.session().fetch_current_user().await {
            Ok(Some(user)) => print_json(&user)?,
            Ok(None) => println!("未登录"),
            Err(e) => bail!("会话已失效: {}", e.user_message("获取用户信息失败")),
        },
        Command::Passwd { old, new } => {
            let response = panel
                .session()
                .change_password(&old, &new)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("修改密码失败")))?;
            println!("{}", response.message.unwrap_or_else(|| "密码已修改".to_string()));
        }
        Command::Subs(cmd) => run_subs(&panel, cmd).await?,
        Command::Proxies { subscription, id } => {
            let store = panel.proxies();
            match id {
                Some(id) => match store.fetch_by_id(id).await {
                    Some(proxy) => print_json(&proxy)?,
                    None => bail!(store.error().unwrap_or_default()),
                },
                None => {
                    store.fetch_all(subscription).await;
                    if let Some(err) = store.error() {
                        bail!(err);
                    }
                    print_json(&store.proxies())?;
                }
            }
        }
        Command::Settings(cmd) => run_settings(&panel, cmd).await?,
        Command::MergedUrl { format } => {
            let format = match format {
                Some(format) => format,
                None => match panel.settings().fetch().await {
                    Some(settings) => settings.default_format,
                    None => {
                        warn!("[CLI] 读取设置失败，使用默认格式");
                        MergedFormat::default()
                    }
                },
            };
            println!("{}", panel.merged_subscription_url(format));
        }
        Command::Route { path } => {
            panel.init().await;
            match panel.navigate(&path) {
                NavigationDecision::Allow => println!("allow {}", path),
                decision => println!(
                    "redirect {}",
                    decision.location().unwrap_or_default()
                ),
            }
        }
    }

    Ok(())
}

async fn run_subs(panel: &PanelClient, cmd: SubsCommand) -> Result<()> {
    let store = panel.subscriptions();
    match cmd {
        SubsCommand::List { enabled } => {
            store.fetch_all().await;
            if let Some(err) = store.error() {
                bail!(err);
            }
            let list = if enabled {
                store.enabled()
            } else {
                store.subscriptions()
            };
            print_json(&list)?;
        }
        SubsCommand::Get { id } => match store.fetch_by_id(id).await {
            Some(sub) => print_json(&sub)?,
            None => bail!(store.error().unwrap_or_default()),
        },
        SubsCommand::Add(args) => {
            let mut draft = Subscription::new(args.name, args.url, args.kind);
            draft.enabled = !args.disabled;
            let created = store
                .create(&draft)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("添加订阅失败")))?;
            if let Some(warning) = &created.warning {
                eprintln!("⚠️  {}", warning);
            }
            print_json(&created.subscription)?;
        }
        SubsCommand::Update { id, changes } => {
            let Some(mut sub) = store.fetch_by_id(id).await else {
                bail!(store.error().unwrap_or_default());
            };
            if let Some(name) = changes.name {
                sub.name = name;
            }
            if let Some(url) = changes.url {
                sub.url = url;
            }
            if let Some(kind) = changes.kind {
                sub.kind = kind;
            }
            if let Some(enabled) = changes.enabled {
                sub.enabled = enabled;
            }
            let updated = store
                .update(id, &sub)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("更新订阅失败")))?;
            print_json(&updated)?;
        }
        SubsCommand::Delete { id } => {
            store
                .delete(id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("删除订阅失败")))?;
            println!("订阅 {} 已删除", id);
        }
        SubsCommand::Refresh { id } => {
            let response = store
                .refresh(id)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("刷新订阅失败")))?;
            if let Some(message) = &response.message {
                eprintln!("{}", message);
            }
            print_json(&response.subscription)?;
        }
    }
    Ok(())
}

async fn run_settings(panel: &PanelClient, cmd: SettingsCommand) -> Result<()> {
    let store = panel.settings();
    let Some(mut settings) = store.fetch().await else {
        bail!(store.error().unwrap_or_default());
    };
    match cmd {
        SettingsCommand::Get => print_json(&settings)?,
        SettingsCommand::Set {
            auto_refresh,
            interval,
            format,
        } => {
            if let Some(auto_refresh) = auto_refresh {
                settings.auto_refresh = auto_refresh;
            }
            if let Some(interval) = interval {
                settings.refresh_interval = interval;
            }
            if let Some(format) = format {
                settings.default_format = format;
            }
            let response = store
                .save(&settings)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("保存设置失败")))?;
            println!("{}", response.message.unwrap_or_else(|| "设置已保存".to_string()));
            print_json(&settings)?;
        }
    }
    Ok(())
}
