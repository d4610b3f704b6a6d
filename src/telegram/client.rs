//! Telegram Bot API 客户端（reqwest，JSON POST）
//!
//! 请求 URL 中含 Bot Token，错误信息一律去掉 URL 再返回。

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::types::{
    ApiResponse, BotCommand, GetUpdatesRequest, SendMessageRequest, SetMyCommandsRequest, Update,
    User,
};
use crate::bot::{ChatId, Outbox, ParseMode, Reply};

/// Telegram 单条消息上限 4096，留余量
const MAX_MESSAGE_CHARS: usize = 4000;

/// 非轮询请求的超时
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("network error: {0}")]
    Network(String),

    #[error("Telegram API error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Network(e.without_url().to_string())
    }
}

impl TelegramError {
    /// Token 无效，继续轮询没有意义
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TelegramError::Api { code: 401, .. })
    }
}

pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api_base>/bot<token>`
    base: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(TelegramError::from)?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base, method);
        let resp = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            TelegramError::Decode(format!("{} (HTTP {})", e, status.as_u16()))
        })?;

        if !parsed.ok {
            return Err(TelegramError::Api {
                code: parsed.error_code.unwrap_or(status.as_u16() as i64),
                description: parsed.description.unwrap_or_default(),
                retry_after: parsed.parameters.and_then(|p| p.retry_after),
            });
        }
        parsed
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{method}: missing result")))
    }

    /// 校验 Token 并取得机器人信息
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .await
    }

    /// 长轮询；HTTP 超时比轮询等待多留 10 秒
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let req = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &req, Duration::from_secs(timeout_secs + 10))
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), TelegramError> {
        let req = SendMessageRequest {
            chat_id,
            text,
            parse_mode: match parse_mode {
                ParseMode::Plain => None,
                ParseMode::MarkdownV2 => Some("MarkdownV2"),
            },
        };
        self.call::<_, serde_json::Value>(
            "sendMessage",
            &req,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .await?;
        Ok(())
    }

    /// 发布命令菜单
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        self.call::<_, bool>(
            "setMyCommands",
            &SetMyCommandsRequest { commands },
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Outbox for TelegramClient {
    async fn send(&self, chat_id: ChatId, reply: Reply) -> anyhow::Result<()> {
        for chunk in split_message(&reply.text, MAX_MESSAGE_CHARS) {
            self.send_message(chat_id, &chunk, reply.parse_mode).await?;
        }
        Ok(())
    }
}

/// 按行切分超长消息；单行超长时按字符硬切
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in text.split('\n') {
        let line_len = line.chars().count();
        if current_len > 0 && current_len + 1 + line_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_single_chunk() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(
            split_message(text, 9),
            vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]
        );
    }

    #[test]
    fn test_overlong_line_hard_split() {
        let text = "abcdefghij";
        assert_eq!(
            split_message(text, 4),
            vec!["abcd".to_string(), "efgh".to_string(), "ij".to_string()]
        );
    }

    #[test]
    fn test_base_url_trims_slash() {
        let client = TelegramClient::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(client.base, "https://api.telegram.org/bot123:abc");
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = TelegramError::Api {
            code: 401,
            description: "Unauthorized".into(),
            retry_after: None,
        };
        assert!(err.is_unauthorized());
        assert!(!TelegramError::Network("reset".into()).is_unauthorized());
    }
}
