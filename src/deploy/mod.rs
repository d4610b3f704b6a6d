//! Worker 部署：克隆远程仓库并用 wrangler 发布
//!
//! 会话引擎只依赖 `Deployer` trait；默认实现见 [`wrangler::WranglerDeployer`]。

pub mod wrangler;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::UserId;

pub use wrangler::WranglerDeployer;

/// 一次部署需要的全部参数
#[derive(Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// 工作目录按用户隔离
    pub user_id: UserId,
    pub repo_url: String,
    pub worker_name: String,
    pub account_id: String,
    pub api_token: String,
}

impl std::fmt::Debug for DeployRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployRequest")
            .field("user_id", &self.user_id)
            .field("repo_url", &self.repo_url)
            .field("worker_name", &self.worker_name)
            .field("account_id", &self.account_id)
            .field("api_token", &"***")
            .finish()
    }
}

/// 部署失败
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid repository URL: {0}")]
    InvalidRepository(String),

    #[error("invalid worker name: {0}")]
    InvalidWorkerName(String),

    #[error("deploy timed out after {0}s")]
    Timeout(u64),

    /// 子进程非 0 退出；output 为 stderr（为空时取 stdout）
    #[error("{stage} failed ({status}): {output}")]
    Process {
        stage: &'static str,
        status: String,
        output: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 部署执行器
#[async_trait]
pub trait Deployer: Send + Sync {
    /// 返回发布命令的输出
    async fn deploy(&self, req: &DeployRequest) -> Result<String, DeployError>;
}
