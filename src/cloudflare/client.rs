//! Cloudflare API HTTP 客户端（reqwest）
//!
//! Bearer Token 鉴权；账户 id、Worker 名等用户输入只通过 `path_segments_mut` 追加为路径段，不做字符串拼接。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::types::{
    AccountAuth, BindingsRequest, CreateNamespaceRequest, Envelope, KvBinding, KvNamespace,
    WorkerService,
};
use super::{ApiError, CloudflareApi};

/// 基于 reqwest 的 Cloudflare 客户端
pub struct HttpCloudflareClient {
    http: reqwest::Client,
    base: Url,
}

impl HttpCloudflareClient {
    pub fn new(api_base: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let base = Url::parse(api_base).map_err(|_| ApiError::InvalidUrl(api_base.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_base.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, base })
    }

    /// `<base>/accounts/<account_id>/<segments...>`
    pub fn account_url(&self, account_id: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("accounts")
            .push(account_id)
            .extend(segments);
        Ok(url)
    }

    /// 发送请求并拆信封：HTTP 非 2xx 或 success=false 都转为 ApiError::Api
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        let envelope: Option<Envelope<T>> = serde_json::from_str(&body).ok();
        let failed = !status.is_success() || envelope.as_ref().map_or(false, |e| !e.success);
        if failed {
            let message = envelope
                .as_ref()
                .and_then(|e| e.first_error())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::warn!(status = status.as_u16(), "Cloudflare API call failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match envelope {
            Some(envelope) => Ok(envelope.result),
            None => Err(ApiError::Decode(format!(
                "response is not a Cloudflare envelope ({} bytes)",
                body.len()
            ))),
        }
    }
}

#[async_trait]
impl CloudflareApi for HttpCloudflareClient {
    async fn create_kv_namespace(
        &self,
        auth: &AccountAuth,
        title: &str,
    ) -> Result<KvNamespace, ApiError> {
        let url = self.account_url(&auth.account_id, &["storage", "kv", "namespaces"])?;
        tracing::info!(account_id = %auth.account_id, "Creating KV namespace");
        let req = self
            .http
            .post(url)
            .bearer_auth(&auth.api_token)
            .json(&CreateNamespaceRequest { title });
        self.send(req)
            .await?
            .ok_or_else(|| ApiError::Decode("missing result".to_string()))
    }

    async fn bind_kv_namespace(
        &self,
        auth: &AccountAuth,
        binding: &KvBinding,
    ) -> Result<(), ApiError> {
        let url = self.account_url(
            &auth.account_id,
            &[
                "workers",
                "services",
                binding.worker_name.as_str(),
                "environments",
                "production",
                "bindings",
            ],
        )?;
        tracing::info!(
            account_id = %auth.account_id,
            worker = %binding.worker_name,
            "Binding KV namespace"
        );
        let req = self
            .http
            .put(url)
            .bearer_auth(&auth.api_token)
            .json(&BindingsRequest::kv(binding));
        self.send::<serde_json::Value>(req).await?;
        Ok(())
    }

    async fn list_workers(&self, auth: &AccountAuth) -> Result<Vec<WorkerService>, ApiError> {
        let url = self.account_url(&auth.account_id, &["workers", "services"])?;
        let req = self.http.get(url).bearer_auth(&auth.api_token);
        Ok(self.send(req).await?.unwrap_or_default())
    }

    async fn list_kv_namespaces(&self, auth: &AccountAuth) -> Result<Vec<KvNamespace>, ApiError> {
        let url = self.account_url(&auth.account_id, &["storage", "kv", "namespaces"])?;
        let req = self.http.get(url).bearer_auth(&auth.api_token);
        Ok(self.send(req).await?.unwrap_or_default())
    }
}
