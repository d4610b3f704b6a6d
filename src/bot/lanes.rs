//! 按用户串行的消息队列
//!
//! 每个 user_id 一条无界 mpsc 通道 + 一个 worker 任务：同一用户的消息按到达顺序逐条处理，
//! 不同用户互不阻塞。轮询循环按 Telegram 投递顺序调用 `submit`，顺序即在此确定。
//!
//! 队列不做空闲回收：每个出现过的用户保留一个 sender 和一个挂起的 worker，与会话注册表一样
//! 随用户数增长，直到 `close` 或进程退出。

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::task::TaskTracker;

use super::{BotEngine, InboundMessage};
use crate::core::error::BotError;
use crate::core::ShutdownCleanup;
use crate::session::UserId;

pub struct Lanes {
    engine: Arc<BotEngine>,
    senders: Mutex<HashMap<UserId, mpsc::UnboundedSender<InboundMessage>>>,
    workers: TaskTracker,
}

impl Lanes {
    pub fn new(engine: Arc<BotEngine>) -> Self {
        Self {
            engine,
            senders: Mutex::new(HashMap::new()),
            workers: TaskTracker::new(),
        }
    }

    /// 把消息排进该用户的队列；队列不存在时创建并启动 worker
    pub async fn submit(&self, msg: InboundMessage) {
        let mut senders = self.senders.lock().await;
        let user_id = msg.user_id;

        let msg = match senders.get(&user_id) {
            Some(tx) => match tx.send(msg) {
                Ok(()) => return,
                // worker 已退出，重建
                Err(mpsc::error::SendError(msg)) => msg,
            },
            None => msg,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(msg).is_err() {
            return;
        }
        senders.insert(user_id, tx);
        tracing::debug!(user_id, "Lane started");
        self.workers
            .spawn(run_lane(Arc::clone(&self.engine), user_id, rx));
    }

    /// 当前队列数
    pub async fn lane_count(&self) -> usize {
        self.senders.lock().await.len()
    }

    /// 关闭所有队列并等待已排队的消息处理完
    pub async fn close(&self) {
        self.senders.lock().await.clear();
        self.workers.close();
        self.workers.wait().await;
    }
}

async fn run_lane(
    engine: Arc<BotEngine>,
    user_id: UserId,
    mut rx: mpsc::UnboundedReceiver<InboundMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let outcome = AssertUnwindSafe(engine.handle_message(&msg))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            tracing::error!(user_id, "Message handler panicked");
            engine
                .handle_failure(&msg, BotError::Internal("internal error".to_string()))
                .await;
        }
    }
    tracing::debug!(user_id, "Lane closed");
}

#[async_trait::async_trait]
impl ShutdownCleanup for Lanes {
    async fn cleanup(&self) -> anyhow::Result<()> {
        self.close().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "UserLanes"
    }
}
