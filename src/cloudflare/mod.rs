//! Cloudflare 控制面 API：KV 命名空间的创建 / 绑定 / 列表，Worker 列表
//!
//! 会话引擎只依赖 `CloudflareApi` trait，测试里可替换为内存实现。

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::HttpCloudflareClient;
pub use types::{AccountAuth, KvBinding, KvNamespace, WorkerService};

/// API 调用失败
#[derive(Error, Debug)]
pub enum ApiError {
    /// Cloudflare 返回的错误（HTTP 非 2xx 或 success=false），message 取 errors[0].message
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            // 不带 URL，避免把账户路径带进用户消息
            ApiError::Network(e.without_url().to_string())
        }
    }
}

/// Cloudflare 控制面操作
#[async_trait]
pub trait CloudflareApi: Send + Sync {
    /// POST accounts/{id}/storage/kv/namespaces
    async fn create_kv_namespace(&self, auth: &AccountAuth, title: &str)
        -> Result<KvNamespace, ApiError>;

    /// PUT accounts/{id}/workers/services/{name}/environments/production/bindings
    async fn bind_kv_namespace(&self, auth: &AccountAuth, binding: &KvBinding)
        -> Result<(), ApiError>;

    /// GET accounts/{id}/workers/services
    async fn list_workers(&self, auth: &AccountAuth) -> Result<Vec<WorkerService>, ApiError>;

    /// GET accounts/{id}/storage/kv/namespaces
    async fn list_kv_namespaces(&self, auth: &AccountAuth) -> Result<Vec<KvNamespace>, ApiError>;
}
