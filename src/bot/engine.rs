//! 会话引擎
//!
//! - 命令（`/` 开头）走 `dispatch`：立即回复、受保护命令的登录检查、或进入多步工作流
//! - 普通文本走 `advance`：按当前 Step 穷举匹配，推进工作流并在终点调用外部操作
//! - 任何冒泡到 `handle_message` 的错误都在这里兜底：复位到 Idle 并告知用户
//!
//! `advance` 先把 Step 从会话里取走（会话留在 Idle），成功时才写回下一步，
//! 所以任何失败路径都不会让会话卡在无法继续的步骤上。
//! 同一用户的消息由 [`super::Lanes`] 串行送入，这里不再加锁。
//! 部署在队列之外运行，每个用户同一时间最多一个（共用同一个工作目录）。

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use super::command::{self, Command, Parsed};
use super::texts;
use super::{ChatId, InboundMessage, Outbox, Reply};
use crate::cloudflare::{AccountAuth, CloudflareApi, KvBinding};
use crate::core::error::{sanitize_detail, BotError};
use crate::core::ShutdownCleanup;
use crate::deploy::{DeployRequest, Deployer};
use crate::session::{Credentials, SessionRegistry, Step, UserId, UserSession};

/// 会话引擎
pub struct BotEngine {
    registry: Arc<SessionRegistry>,
    cloudflare: Arc<dyn CloudflareApi>,
    deployer: Arc<dyn Deployer>,
    outbox: Arc<dyn Outbox>,
    /// 后台部署任务
    background: TaskTracker,
    /// 正在部署的用户
    deploying: Arc<Mutex<HashSet<UserId>>>,
}

impl BotEngine {
    pub fn new(
        registry: Arc<SessionRegistry>,
        cloudflare: Arc<dyn CloudflareApi>,
        deployer: Arc<dyn Deployer>,
        outbox: Arc<dyn Outbox>,
    ) -> Self {
        Self {
            registry,
            cloudflare,
            deployer,
            outbox,
            background: TaskTracker::new(),
            deploying: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// 处理一条入站消息（处理边界）
    pub async fn handle_message(&self, msg: &InboundMessage) {
        let result = match command::parse(&msg.text) {
            Parsed::FreeText => self.advance(msg).await,
            Parsed::Command(cmd) => self.dispatch(msg, cmd).await,
            Parsed::Unknown(token) => {
                tracing::debug!(user_id = msg.user_id, token = %token, "Unknown command");
                self.send(msg.chat_id, texts::unknown_command()).await
            }
        };
        if let Err(err) = result {
            self.handle_failure(msg, err).await;
        }
    }

    /// 兜底：按错误类型决定是否复位工作流，并回复用户
    pub async fn handle_failure(&self, msg: &InboundMessage, err: BotError) {
        if err.aborts_workflow() {
            self.registry.reset_step(msg.user_id).await;
        }
        let reply = match &err {
            BotError::NotLoggedIn => texts::not_logged_in(),
            BotError::IncompleteInput(field) => {
                tracing::info!(user_id = msg.user_id, field, "Workflow aborted: empty input");
                texts::incomplete_input(field)
            }
            BotError::Transport(e) => {
                tracing::error!(user_id = msg.user_id, "Failed to deliver reply: {:#}", e);
                return;
            }
            BotError::Internal(detail) => {
                tracing::error!(user_id = msg.user_id, "Unexpected error: {}", detail);
                texts::unexpected_error(&sanitize_detail(detail, &[]))
            }
        };
        if let Err(e) = self.outbox.send(msg.chat_id, reply).await {
            tracing::error!(user_id = msg.user_id, "Failed to deliver error reply: {:#}", e);
        }
    }

    /// 等待所有后台部署结束
    pub async fn drain(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    async fn send(&self, chat_id: ChatId, reply: Reply) -> Result<(), BotError> {
        self.outbox.send(chat_id, reply).await?;
        Ok(())
    }

    /// 取出已登录用户的 API 凭据
    async fn require_auth(&self, user_id: UserId) -> Result<AccountAuth, BotError> {
        self.registry
            .get(user_id)
            .await
            .as_ref()
            .and_then(UserSession::authenticated)
            .map(|c| AccountAuth {
                account_id: c.account_id.clone(),
                api_token: c.api_token.clone(),
            })
            .ok_or(BotError::NotLoggedIn)
    }

    // ---------------------------------------------------------------- 命令分发

    async fn dispatch(&self, msg: &InboundMessage, cmd: Command) -> Result<(), BotError> {
        let user_id = msg.user_id;
        tracing::info!(user_id, command = cmd.token(), "Command received");

        // 未登录时直接拒绝，不创建也不修改会话
        let auth = if cmd.is_guarded() {
            Some(self.require_auth(user_id).await?)
        } else {
            None
        };

        match (cmd, auth) {
            (Command::Start | Command::Menu, _) => self.send(msg.chat_id, texts::welcome()).await,
            (Command::Login, _) => {
                self.registry.insert(user_id, UserSession::login()).await;
                self.send(msg.chat_id, texts::ask_token()).await
            }
            (Command::Logout, _) => {
                let existed = self.registry.delete(user_id).await;
                tracing::info!(user_id, existed, "Session deleted");
                self.send(msg.chat_id, texts::logged_out()).await
            }
            (Command::Deploy, _) => {
                self.enter_workflow(msg, Step::AwaitingRepoUrl, texts::ask_repo_url())
                    .await
            }
            (Command::CreateKv, _) => {
                self.enter_workflow(msg, Step::AwaitingStorageName, texts::ask_kv_name())
                    .await
            }
            (Command::Binding, _) => {
                self.enter_workflow(msg, Step::AwaitingBindingName, texts::ask_binding_name())
                    .await
            }
            (Command::ListWorkers, Some(auth)) => {
                self.registry.reset_step(user_id).await;
                self.list_workers(msg.chat_id, &auth).await
            }
            (Command::ListKv, Some(auth)) => {
                self.registry.reset_step(user_id).await;
                self.list_kv(msg.chat_id, &auth).await
            }
            (Command::ListWorkers | Command::ListKv, None) => Err(BotError::NotLoggedIn),
        }
    }

    /// 进入工作流的第一步（替换任何进行中的工作流）
    async fn enter_workflow(
        &self,
        msg: &InboundMessage,
        step: Step,
        prompt: Reply,
    ) -> Result<(), BotError> {
        tracing::debug!(user_id = msg.user_id, step = step.name(), "Workflow started");
        self.registry.set_step(msg.user_id, step).await;
        self.send(msg.chat_id, prompt).await
    }

    async fn list_workers(&self, chat_id: ChatId, auth: &AccountAuth) -> Result<(), BotError> {
        let reply = match self.cloudflare.list_workers(auth).await {
            Ok(services) => {
                let names: Vec<&str> = services.iter().map(|s| s.display_name()).collect();
                texts::worker_list(&names)
            }
            Err(e) => {
                tracing::warn!(account_id = %auth.account_id, "List workers failed: {}", e);
                texts::list_workers_failed(&sanitize_detail(&e.to_string(), &[&auth.api_token]))
            }
        };
        self.send(chat_id, reply).await
    }

    async fn list_kv(&self, chat_id: ChatId, auth: &AccountAuth) -> Result<(), BotError> {
        let reply = match self.cloudflare.list_kv_namespaces(auth).await {
            Ok(namespaces) => texts::kv_list(&namespaces),
            Err(e) => {
                tracing::warn!(account_id = %auth.account_id, "List KV failed: {}", e);
                texts::list_kv_failed(&sanitize_detail(&e.to_string(), &[&auth.api_token]))
            }
        };
        self.send(chat_id, reply).await
    }

    // ---------------------------------------------------------------- 步骤解释

    async fn advance(&self, msg: &InboundMessage) -> Result<(), BotError> {
        let user_id = msg.user_id;
        // 无会话或 Idle：忽略
        let Some(step) = self.registry.take_step(user_id).await else {
            return Ok(());
        };
        let input = msg.text.trim();
        tracing::debug!(user_id, step = step.name(), "Advancing workflow");

        match step {
            Step::Idle => Ok(()),
            Step::AwaitingToken => {
                let api_token = required(input, "api_token")?;
                self.next(msg, Step::AwaitingAccountId { api_token }, texts::ask_account_id())
                    .await
            }
            Step::AwaitingAccountId { api_token } => {
                let account_id = required(input, "account_id")?;
                self.next(
                    msg,
                    Step::AwaitingZoneId {
                        api_token,
                        account_id,
                    },
                    texts::ask_zone_id(),
                )
                .await
            }
            Step::AwaitingZoneId {
                api_token,
                account_id,
            } => {
                let credentials = Credentials {
                    api_token,
                    account_id,
                    zone_id: parse_zone_id(input),
                };
                self.registry
                    .with_session(user_id, |s| s.credentials = Some(credentials))
                    .await;
                tracing::info!(user_id, "Login completed");
                self.send(msg.chat_id, texts::login_done()).await
            }
            Step::AwaitingRepoUrl => {
                let repo_url = required(input, "repo_url")?;
                self.next(msg, Step::AwaitingBundleName { repo_url }, texts::ask_deploy_name())
                    .await
            }
            Step::AwaitingBundleName { repo_url } => {
                let worker_name = required(input, "worker_name")?;
                let repo_url = required(&repo_url, "repo_url")?;
                let auth = self.workflow_auth(user_id).await?;
                let req = DeployRequest {
                    user_id,
                    repo_url,
                    worker_name,
                    account_id: auth.account_id,
                    api_token: auth.api_token,
                };
                self.start_deploy(msg.chat_id, req).await
            }
            Step::AwaitingStorageName => {
                let title = required(input, "storage_name")?;
                let auth = self.workflow_auth(user_id).await?;
                self.create_kv(msg.chat_id, &auth, &title).await
            }
            Step::AwaitingBindingName => {
                let binding_name = required(input, "binding_name")?;
                self.next(
                    msg,
                    Step::AwaitingNamespaceId { binding_name },
                    texts::ask_namespace_id(),
                )
                .await
            }
            Step::AwaitingNamespaceId { binding_name } => {
                let namespace_id = required(input, "namespace_id")?;
                self.next(
                    msg,
                    Step::AwaitingWorkerName {
                        binding_name,
                        namespace_id,
                    },
                    texts::ask_binding_worker(),
                )
                .await
            }
            Step::AwaitingWorkerName {
                binding_name,
                namespace_id,
            } => {
                let binding = KvBinding {
                    binding_name: required(&binding_name, "binding_name")?,
                    namespace_id: required(&namespace_id, "namespace_id")?,
                    worker_name: required(input, "worker_name")?,
                };
                let auth = self.workflow_auth(user_id).await?;
                self.bind_kv(msg.chat_id, &auth, &binding).await
            }
        }
    }

    /// 写回下一步并发出提示
    async fn next(&self, msg: &InboundMessage, step: Step, prompt: Reply) -> Result<(), BotError> {
        self.registry.set_step(msg.user_id, step).await;
        self.send(msg.chat_id, prompt).await
    }

    /// 工作流终点的凭据检查；缺失按输入不完整处理
    async fn workflow_auth(&self, user_id: UserId) -> Result<AccountAuth, BotError> {
        let auth = self
            .require_auth(user_id)
            .await
            .map_err(|_| BotError::IncompleteInput("credentials"))?;
        if auth.account_id.is_empty() {
            return Err(BotError::IncompleteInput("account_id"));
        }
        Ok(auth)
    }

    /// 该用户是否有部署在进行
    pub async fn is_deploying(&self, user_id: UserId) -> bool {
        self.deploying.lock().await.contains(&user_id)
    }

    /// 部署在后台执行：会话已回到 Idle，先告知"正在部署"，完成后再回报结果。
    /// 同一用户已有部署在进行时直接回复忙碌，不调用部署器。
    async fn start_deploy(&self, chat_id: ChatId, req: DeployRequest) -> Result<(), BotError> {
        let user_id = req.user_id;
        if !self.deploying.lock().await.insert(user_id) {
            tracing::info!(user_id, worker = %req.worker_name, "Deploy rejected: previous deploy still running");
            return self.send(chat_id, texts::deploy_busy()).await;
        }
        if let Err(e) = self.send(chat_id, texts::deploying()).await {
            self.deploying.lock().await.remove(&user_id);
            return Err(e);
        }

        let deployer = Arc::clone(&self.deployer);
        let outbox = Arc::clone(&self.outbox);
        let deploying = Arc::clone(&self.deploying);
        self.background.spawn(async move {
            let outcome = AssertUnwindSafe(deployer.deploy(&req)).catch_unwind().await;
            // 成功、失败、超时、panic 都走到这里
            deploying.lock().await.remove(&req.user_id);
            let reply = match outcome {
                Ok(Ok(_)) => {
                    tracing::info!(user_id = req.user_id, worker = %req.worker_name, "Deploy succeeded");
                    texts::deploy_ok(&req.worker_name)
                }
                Ok(Err(e)) => {
                    tracing::warn!(user_id = req.user_id, worker = %req.worker_name, "Deploy failed: {}", e);
                    texts::deploy_failed(&sanitize_detail(&e.to_string(), &[&req.api_token]))
                }
                Err(_) => {
                    tracing::error!(user_id = req.user_id, "Deployer panicked");
                    texts::deploy_failed("internal error")
                }
            };
            if let Err(e) = outbox.send(chat_id, reply).await {
                tracing::error!(user_id = req.user_id, "Failed to deliver deploy result: {:#}", e);
            }
        });
        Ok(())
    }

    async fn create_kv(&self, chat_id: ChatId, auth: &AccountAuth, title: &str) -> Result<(), BotError> {
        let reply = match self.cloudflare.create_kv_namespace(auth, title).await {
            Ok(namespace) => {
                tracing::info!(account_id = %auth.account_id, namespace_id = %namespace.id, "KV namespace created");
                texts::kv_created(&namespace)
            }
            Err(e) => {
                tracing::warn!(account_id = %auth.account_id, "Create KV failed: {}", e);
                texts::kv_failed(&sanitize_detail(&e.to_string(), &[&auth.api_token]))
            }
        };
        self.send(chat_id, reply).await
    }

    async fn bind_kv(&self, chat_id: ChatId, auth: &AccountAuth, binding: &KvBinding) -> Result<(), BotError> {
        let reply = match self.cloudflare.bind_kv_namespace(auth, binding).await {
            Ok(()) => {
                tracing::info!(account_id = %auth.account_id, worker = %binding.worker_name, "KV namespace bound");
                texts::binding_ok(&binding.worker_name, &binding.binding_name)
            }
            Err(e) => {
                tracing::warn!(account_id = %auth.account_id, "Bind KV failed: {}", e);
                texts::binding_failed(&sanitize_detail(&e.to_string(), &[&auth.api_token]))
            }
        };
        self.send(chat_id, reply).await
    }
}

#[async_trait::async_trait]
impl ShutdownCleanup for BotEngine {
    async fn cleanup(&self) -> anyhow::Result<()> {
        self.drain().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "BackgroundDeploys"
    }
}

/// 修剪后的非空输入
fn required(input: &str, field: &'static str) -> Result<String, BotError> {
    let value = input.trim();
    if value.is_empty() {
        Err(BotError::IncompleteInput(field))
    } else {
        Ok(value.to_string())
    }
}

/// 跳过关键词（不区分大小写）→ None。
/// 空输入也按跳过处理，不会保存空字符串作为 Zone ID。
fn parse_zone_id(input: &str) -> Option<String> {
    let value = input.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(texts::SKIP_KEYWORD) {
        None
    } else {
        Some(value.to_string())
    }
}
