//! Telegram 集成：Bot API 客户端、长轮询、回复发送（实现 `Outbox`）

pub mod client;
pub mod runner;
pub mod types;

pub use client::{TelegramClient, TelegramError};
pub use runner::{menu_commands, run_polling};
