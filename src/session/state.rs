//! 会话状态定义：Step（工作流步骤）、Credentials、UserSession
//!
//! 工作流中途收集的参数直接挂在对应的 Step 变体上：离开某条工作流链时参数随旧 Step 一起丢弃，
//! 其它工作流无从读取。

/// 用户标识（Telegram user id）
pub type UserId = i64;

/// 登录完成后的 Cloudflare 凭据
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub account_id: String,
    /// 用户选择跳过时为 None
    pub zone_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"***")
            .field("account_id", &self.account_id)
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

/// 当前所处的工作流步骤
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    Idle,
    /// 登录 1/3
    AwaitingToken,
    /// 登录 2/3
    AwaitingAccountId { api_token: String },
    /// 登录 3/3
    AwaitingZoneId { api_token: String, account_id: String },
    /// 部署 1/2
    AwaitingRepoUrl,
    /// 部署 2/2
    AwaitingBundleName { repo_url: String },
    AwaitingStorageName,
    /// 绑定 1/3
    AwaitingBindingName,
    /// 绑定 2/3
    AwaitingNamespaceId { binding_name: String },
    /// 绑定 3/3
    AwaitingWorkerName { binding_name: String, namespace_id: String },
}

impl Step {
    /// 步骤名（日志用，不含收集到的值）
    pub fn name(&self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::AwaitingToken => "awaiting_token",
            Step::AwaitingAccountId { .. } => "awaiting_account_id",
            Step::AwaitingZoneId { .. } => "awaiting_zone_id",
            Step::AwaitingRepoUrl => "awaiting_repo_url",
            Step::AwaitingBundleName { .. } => "awaiting_bundle_name",
            Step::AwaitingStorageName => "awaiting_storage_name",
            Step::AwaitingBindingName => "awaiting_binding_name",
            Step::AwaitingNamespaceId { .. } => "awaiting_namespace_id",
            Step::AwaitingWorkerName { .. } => "awaiting_worker_name",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Step::Idle)
    }
}

// 登录步骤里带着 token，Debug 只输出步骤名
impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个用户的会话
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    pub step: Step,
    pub credentials: Option<Credentials>,
}

impl UserSession {
    /// /login 之后的初始会话：旧凭据作废
    pub fn login() -> Self {
        Self {
            step: Step::AwaitingToken,
            credentials: None,
        }
    }

    /// 受保护命令的前置条件：已保存非空 API Token
    pub fn authenticated(&self) -> Option<&Credentials> {
        self.credentials
            .as_ref()
            .filter(|c| !c.api_token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_token() {
        let session = UserSession {
            step: Step::AwaitingAccountId {
                api_token: "secret-token".into(),
            },
            credentials: Some(Credentials {
                api_token: "secret-token".into(),
                account_id: "acc".into(),
                zone_id: None,
            }),
        };
        let dump = format!("{:?}", session);
        assert!(!dump.contains("secret-token"));
        assert!(dump.contains("awaiting_account_id"));
    }

    #[test]
    fn test_authenticated_requires_token() {
        let mut session = UserSession::login();
        assert!(session.authenticated().is_none());
        session.credentials = Some(Credentials {
            api_token: String::new(),
            account_id: "acc".into(),
            zone_id: None,
        });
        assert!(session.authenticated().is_none());
    }
}
