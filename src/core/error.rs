//! 机器人错误类型
//!
//! 与会话引擎配合：根据 BotError 决定是否把当前工作流复位到 Idle、给用户回什么。
//! 外部调用（Cloudflare API、部署子进程）的失败在调用点就地处理，不经过这里。

use thiserror::Error;

/// 返回给用户的错误详情最大字符数
const MAX_DETAIL_CHARS: usize = 1500;

/// 消息处理过程中冒泡到处理边界的错误
#[derive(Error, Debug)]
pub enum BotError {
    /// 受保护命令在登录前被调用
    #[error("not logged in")]
    NotLoggedIn,

    /// 必填字段为空
    #[error("incomplete input: {0}")]
    IncompleteInput(&'static str),

    /// 回复消息发送失败
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// 是否终止当前工作流；前置条件错误不改动会话
    pub fn aborts_workflow(&self) -> bool {
        !matches!(self, Self::NotLoggedIn)
    }
}

/// 清洗外部错误文本：去掉凭据、首尾空白，过长时截断
pub fn sanitize_detail(raw: &str, secrets: &[&str]) -> String {
    let mut text = raw.trim().to_string();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        text = text.replace(secret, "***");
    }
    if text.chars().count() > MAX_DETAIL_CHARS {
        let mut cut: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        cut.push('…');
        cut
    } else {
        text
    }
}
