//! Cloudflare v4 API 的请求 / 响应结构
//!
//! 所有接口都返回统一信封：`{ success, errors: [{code, message}], messages, result }`。

use serde::{Deserialize, Serialize};

/// 调用 API 需要的账户凭据
#[derive(Clone)]
pub struct AccountAuth {
    pub account_id: String,
    pub api_token: String,
}

impl std::fmt::Debug for AccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountAuth")
            .field("account_id", &self.account_id)
            .field("api_token", &"***")
            .finish()
    }
}

/// 响应信封
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    /// 第一条错误信息
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .first()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// KV 命名空间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvNamespace {
    pub id: String,
    pub title: String,
}

/// POST storage/kv/namespaces 请求体
#[derive(Debug, Serialize)]
pub struct CreateNamespaceRequest<'a> {
    pub title: &'a str,
}

/// 把 KV 绑定到 Worker 的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvBinding {
    pub binding_name: String,
    pub namespace_id: String,
    pub worker_name: String,
}

/// PUT workers/services/{name}/environments/production/bindings 请求体
#[derive(Debug, Serialize)]
pub struct BindingsRequest<'a> {
    pub bindings: Vec<BindingEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct BindingEntry<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub namespace_id: &'a str,
}

impl<'a> BindingsRequest<'a> {
    pub fn kv(binding: &'a KvBinding) -> Self {
        Self {
            bindings: vec![BindingEntry {
                name: &binding.binding_name,
                kind: "kv_namespace",
                namespace_id: &binding.namespace_id,
            }],
        }
    }
}

/// GET workers/services 的单项
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerService {
    #[serde(default)]
    pub id: String,
    pub default_environment: Option<WorkerEnvironment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerEnvironment {
    pub environment: Option<String>,
    pub script: Option<String>,
}

impl WorkerService {
    /// 展示名：默认环境的脚本名，没有则用服务 id
    pub fn display_name(&self) -> &str {
        self.default_environment
            .as_ref()
            .and_then(|env| env.script.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_envelope() {
        let raw = r#"{"success":false,"errors":[{"code":10014,"message":"namespace already exists"}],"messages":[],"result":null}"#;
        let env: Envelope<KvNamespace> = serde_json::from_str(raw).unwrap();
        assert!(!env.success);
        assert_eq!(env.first_error(), Some("namespace already exists"));
        assert!(env.result.is_none());
    }

    #[test]
    fn test_worker_display_name_falls_back_to_id() {
        let raw = r#"[
            {"id":"svc-a","default_environment":{"environment":"production","script":"svc-a-script"}},
            {"id":"svc-b","default_environment":null}
        ]"#;
        let services: Vec<WorkerService> = serde_json::from_str(raw).unwrap();
        assert_eq!(services[0].display_name(), "svc-a-script");
        assert_eq!(services[1].display_name(), "svc-b");
    }

    #[test]
    fn test_bindings_request_shape() {
        let binding = KvBinding {
            binding_name: "MY_KV".into(),
            namespace_id: "ns-1".into(),
            worker_name: "svc1".into(),
        };
        let body = serde_json::to_value(BindingsRequest::kv(&binding)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "bindings": [{"name": "MY_KV", "type": "kv_namespace", "namespace_id": "ns-1"}]
            })
        );
    }
}
