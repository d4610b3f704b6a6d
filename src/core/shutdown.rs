//! 优雅关闭
//!
//! 收到 Ctrl+C / SIGTERM 或轮询致命错误后：
//! 1. 取消 token，长轮询停止拉取新消息
//! 2. 按注册顺序执行收尾阶段（先排空用户队列，再等后台部署）
//!
//! 所有阶段共用一个宽限期，超时的阶段被放弃并记录在 [`CleanupReport`] 里。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM
    Signal,
    FatalError(String),
}

/// 关闭信号：一个取消 token 加上第一次触发时的原因
#[derive(Clone, Default)]
pub struct ShutdownManager {
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发关闭；重复触发只保留第一次的原因
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(reason = ?self.reason.get(), "Shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().cloned()
    }

    /// 后台等待 Ctrl+C 或 SIGTERM
    pub fn install_signal_handlers(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let reason = tokio::select! {
                _ = manager.token.cancelled() => return,
                reason = wait_for_signal() => reason,
            };
            manager.shutdown(reason);
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            _ = tokio::signal::ctrl_c() => ShutdownReason::UserInitiated,
            _ = sigterm.recv() => ShutdownReason::Signal,
        },
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            ShutdownReason::UserInitiated
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownReason {
    let _ = tokio::signal::ctrl_c().await;
    ShutdownReason::UserInitiated
}

/// 关闭时的一个收尾阶段
#[async_trait::async_trait]
pub trait ShutdownCleanup: Send + Sync {
    async fn cleanup(&self) -> anyhow::Result<()>;

    /// 日志里的阶段名
    fn name(&self) -> &'static str;
}

/// 收尾结果
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub completed: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    pub timed_out: Vec<&'static str>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.timed_out.is_empty()
    }
}

/// 按注册顺序执行收尾阶段，共用一个宽限期
pub struct ShutdownCoordinator {
    stages: Vec<Arc<dyn ShutdownCleanup>>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            grace: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.grace = Duration::from_secs(secs);
        self
    }

    pub fn register(&mut self, stage: Arc<dyn ShutdownCleanup>) {
        self.stages.push(stage);
    }

    pub async fn run_cleanup(&self) -> CleanupReport {
        let deadline = Instant::now() + self.grace;
        let mut report = CleanupReport::default();
        tracing::info!(
            stages = self.stages.len(),
            grace_secs = self.grace.as_secs(),
            "Running shutdown stages"
        );

        for stage in &self.stages {
            let name = stage.name();
            match tokio::time::timeout_at(deadline, stage.cleanup()).await {
                Ok(Ok(())) => {
                    tracing::info!(stage = name, "Shutdown stage finished");
                    report.completed.push(name);
                }
                Ok(Err(e)) => {
                    tracing::warn!(stage = name, "Shutdown stage failed: {:#}", e);
                    report.failed.push(name);
                }
                Err(_) => {
                    tracing::warn!(stage = name, "Shutdown stage abandoned: grace period over");
                    report.timed_out.push(name);
                }
            }
        }
        report
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
