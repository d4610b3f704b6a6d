//! cfbot - Telegram 上的 Cloudflare 管理机器人
//!
//! 入口：初始化日志、加载配置、组装会话引擎，并运行长轮询直到收到关闭信号。
//!
//! 环境变量:
//! - BOT_TOKEN 或 CFBOT__TELEGRAM__BOT_TOKEN: Telegram Bot Token（必需）
//! - CFBOT__*: 覆盖 config/default.toml 中的任意项
//!
//! 启动: cargo run -- [config.toml]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cfbot::bot::{BotEngine, Lanes};
use cfbot::cloudflare::HttpCloudflareClient;
use cfbot::config::load_config;
use cfbot::core::{ShutdownCoordinator, ShutdownManager, ShutdownReason};
use cfbot::deploy::WranglerDeployer;
use cfbot::session::SessionRegistry;
use cfbot::telegram::{menu_commands, run_polling, TelegramClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cfbot::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let Some(bot_token) = cfg.bot_token() else {
        tracing::error!("Bot token missing");
        anyhow::bail!("BOT_TOKEN (or CFBOT__TELEGRAM__BOT_TOKEN) must be set");
    };

    let telegram = Arc::new(
        TelegramClient::new(&cfg.telegram.api_base, &bot_token)
            .context("Failed to create Telegram client")?,
    );
    let me = telegram
        .get_me()
        .await
        .context("Telegram getMe failed, check the bot token")?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or("(unnamed)"),
        "Connected to Telegram"
    );
    if let Err(e) = telegram.set_my_commands(&menu_commands()).await {
        tracing::warn!("Failed to publish command menu: {}", e);
    }

    let cloudflare = Arc::new(
        HttpCloudflareClient::new(&cfg.cloudflare.api_base, cfg.cloudflare.request_timeout_secs)
            .context("Invalid Cloudflare API base URL")?,
    );
    let deployer = Arc::new(WranglerDeployer::new(&cfg.deploy));
    let registry = Arc::new(SessionRegistry::new());
    let engine = Arc::new(BotEngine::new(
        registry,
        cloudflare,
        deployer,
        telegram.clone(),
    ));
    let lanes = Arc::new(Lanes::new(Arc::clone(&engine)));

    let shutdown = ShutdownManager::new();
    shutdown.install_signal_handlers();

    let result = run_polling(telegram, Arc::clone(&lanes), &cfg.telegram, shutdown.token()).await;
    if let Err(ref e) = result {
        shutdown.shutdown(ShutdownReason::FatalError(e.to_string()));
    }
    tracing::info!(reason = ?shutdown.reason(), "Shutting down");

    // 先处理完已排队的消息，再等后台部署
    let mut coordinator = ShutdownCoordinator::new().with_timeout(cfg.app.shutdown_grace_secs);
    coordinator.register(lanes);
    coordinator.register(engine);
    let report = coordinator.run_cleanup().await;
    if !report.is_clean() {
        tracing::warn!(
            failed = ?report.failed,
            timed_out = ?report.timed_out,
            "Shutdown finished with unfinished work"
        );
    }

    result.context("Telegram polling failed")
}
