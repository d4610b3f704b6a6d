//! Telegram Bot API 数据结构（只保留用到的字段）

use serde::{Deserialize, Serialize};

use crate::bot::InboundMessage;

/// Bot API 响应信封
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// 429 时需要等待的秒数
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// 只处理来自真人用户的文本消息
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let from = message.from.filter(|u| !u.is_bot)?;
        let text = message.text?;
        Some(InboundMessage {
            user_id: from.id,
            chat_id: message.chat.id,
            text,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SetMyCommandsRequest<'a> {
    pub commands: &'a [BotCommand],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_update_to_inbound() {
        let raw = r#"{"update_id":10,"message":{"message_id":5,"from":{"id":42,"is_bot":false,"first_name":"A"},"chat":{"id":4200,"type":"private"},"date":0,"text":"/login"}}"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let inbound = update.into_inbound().unwrap();
        assert_eq!(inbound.user_id, 42);
        assert_eq!(inbound.chat_id, 4200);
        assert_eq!(inbound.text, "/login");
    }

    #[test]
    fn test_non_text_and_bot_updates_ignored() {
        let sticker = r#"{"update_id":11,"message":{"message_id":6,"from":{"id":42,"is_bot":false},"chat":{"id":42},"sticker":{}}}"#;
        let update: Update = serde_json::from_str(sticker).unwrap();
        assert!(update.into_inbound().is_none());

        let bot = r#"{"update_id":12,"message":{"message_id":7,"from":{"id":9,"is_bot":true},"chat":{"id":42},"text":"hi"}}"#;
        let update: Update = serde_json::from_str(bot).unwrap();
        assert!(update.into_inbound().is_none());

        let edited = r#"{"update_id":13}"#;
        let update: Update = serde_json::from_str(edited).unwrap();
        assert!(update.into_inbound().is_none());
    }
}
