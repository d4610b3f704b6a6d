//! 长轮询主循环
//!
//! getUpdates 拉取 → 逐条按顺序送入 [`Lanes`]；收到关闭信号即停止拉取。
//! 网络或 API 临时错误等待后重试，Token 无效（401）直接返回错误。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::client::{TelegramClient, TelegramError};
use super::types::BotCommand;
use crate::bot::{Command, Lanes};
use crate::config::TelegramSection;

/// 命令菜单（/start 不列出）
pub fn menu_commands() -> Vec<BotCommand> {
    Command::ALL
        .iter()
        .filter(|c| **c != Command::Start)
        .map(|c| BotCommand {
            command: c.token().to_string(),
            description: c.description().to_string(),
        })
        .collect()
}

pub async fn run_polling(
    client: Arc<TelegramClient>,
    lanes: Arc<Lanes>,
    cfg: &TelegramSection,
    shutdown: CancellationToken,
) -> Result<(), TelegramError> {
    let mut offset: Option<i64> = None;
    tracing::info!(poll_timeout_secs = cfg.poll_timeout_secs, "Polling started");

    loop {
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = client.get_updates(offset, cfg.poll_timeout_secs) => result,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(msg) = update.into_inbound() {
                        lanes.submit(msg).await;
                    }
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::error!("Bot token rejected by Telegram: {}", e);
                return Err(e);
            }
            Err(e) => {
                let delay = match &e {
                    TelegramError::Api {
                        retry_after: Some(secs),
                        ..
                    } => *secs,
                    _ => cfg.retry_delay_secs,
                };
                tracing::warn!(retry_in_secs = delay, "getUpdates failed: {}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
                }
            }
        }
    }

    tracing::info!("Polling stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_commands_skip_start() {
        let commands = menu_commands();
        assert_eq!(commands.len(), Command::ALL.len() - 1);
        assert!(commands.iter().all(|c| c.command != "start"));
        assert!(commands.iter().any(|c| c.command == "buat_kv"));
    }
}
