//! 会话引擎：命令分发、步骤解释、按用户串行的消息队列
//!
//! 引擎不直接依赖 Telegram：入站消息是 [`InboundMessage`]，回复通过 [`Outbox`] 发出。

pub mod command;
pub mod engine;
pub mod lanes;
pub mod markdown;
pub mod texts;

use async_trait::async_trait;

use crate::session::UserId;

pub use command::{Command, Parsed};
pub use engine::BotEngine;
pub use lanes::Lanes;
pub use markdown::{escape_markdown, Markdown, ParseMode, Reply};

/// 聊天 id（回复发往这里）
pub type ChatId = i64;

/// 一条入站文本消息
#[derive(Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub text: String,
}

// 文本可能是 API Token，不进日志
impl std::fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundMessage")
            .field("user_id", &self.user_id)
            .field("chat_id", &self.chat_id)
            .field("text_len", &self.text.len())
            .finish()
    }
}

/// 回复发送端
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, chat_id: ChatId, reply: Reply) -> anyhow::Result<()>;
}
