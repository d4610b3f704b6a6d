//! cfbot - Telegram 上的 Cloudflare 管理机器人
//!
//! 模块划分：
//! - **bot**: 会话引擎（命令分发、步骤解释、按用户串行队列、文案与 MarkdownV2 转义）
//! - **cloudflare**: Cloudflare 控制面 API（KV 创建 / 绑定 / 列表，Worker 列表）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、优雅关闭
//! - **deploy**: git clone + wrangler 部署
//! - **observability**: tracing 初始化
//! - **session**: 每个用户的凭据与工作流步骤、会话注册表
//! - **telegram**: Bot API 客户端与长轮询

pub mod bot;
pub mod cloudflare;
pub mod config;
pub mod core;
pub mod deploy;
pub mod observability;
pub mod session;
pub mod telegram;

pub use bot::BotEngine;
pub use session::SessionRegistry;
