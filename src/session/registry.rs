//! 会话注册表
//!
//! 进程内 user_id -> UserSession 映射，由组合根创建并注入，不使用全局状态。
//! 不做过期清理：会话表随用户数增长，进程退出即丢弃。

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::state::{Step, UserId, UserSession};

/// 会话注册表
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<UserId, UserSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取会话快照
    pub async fn get(&self, user_id: UserId) -> Option<UserSession> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// 获取或创建用户的会话，返回快照
    pub async fn get_or_create(&self, user_id: UserId) -> UserSession {
        self.sessions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .clone()
    }

    /// 覆盖写入整个会话
    pub async fn insert(&self, user_id: UserId, session: UserSession) {
        self.sessions.write().await.insert(user_id, session);
    }

    /// 删除会话；会话不存在时什么也不做，返回是否删除了
    pub async fn delete(&self, user_id: UserId) -> bool {
        self.sessions.write().await.remove(&user_id).is_some()
    }

    /// 在写锁内修改会话（闭包内不能 await）；会话不存在返回 None
    pub async fn with_session<F, R>(&self, user_id: UserId, f: F) -> Option<R>
    where
        F: FnOnce(&mut UserSession) -> R,
    {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&user_id).map(f)
    }

    /// 取出当前步骤，会话留在 Idle；无会话或已是 Idle 时返回 None
    pub async fn take_step(&self, user_id: UserId) -> Option<Step> {
        self.with_session(user_id, |s| std::mem::take(&mut s.step))
            .await
            .filter(|step| !step.is_idle())
    }

    /// 设置步骤；会话不存在时返回 false
    pub async fn set_step(&self, user_id: UserId, step: Step) -> bool {
        self.with_session(user_id, |s| s.step = step).await.is_some()
    }

    /// 复位到 Idle（保留凭据）
    pub async fn reset_step(&self, user_id: UserId) {
        self.set_step(user_id, Step::Idle).await;
    }

    /// 当前会话数
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_and_delete() {
        let registry = SessionRegistry::new();
        assert!(registry.get(1).await.is_none());

        let session = registry.get_or_create(1).await;
        assert!(session.step.is_idle());
        assert!(registry.get(1).await.is_some());

        assert!(registry.delete(1).await);
        assert!(registry.get(1).await.is_none());
        // 重复删除不报错
        assert!(!registry.delete(1).await);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let registry = SessionRegistry::new();
        registry.insert(1, UserSession::login()).await;
        registry.get_or_create(2).await;

        assert_eq!(registry.get(1).await.unwrap().step, Step::AwaitingToken);
        assert!(registry.get(2).await.unwrap().step.is_idle());

        registry.delete(2).await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get(1).await.unwrap().step, Step::AwaitingToken);
    }

    #[tokio::test]
    async fn test_take_step_leaves_idle() {
        let registry = SessionRegistry::new();
        assert!(registry.take_step(7).await.is_none());

        registry.insert(7, UserSession::login()).await;
        assert_eq!(registry.take_step(7).await, Some(Step::AwaitingToken));
        assert!(registry.get(7).await.unwrap().step.is_idle());
        assert!(registry.take_step(7).await.is_none());
    }

    #[tokio::test]
    async fn test_set_step_without_session() {
        let registry = SessionRegistry::new();
        assert!(!registry.set_step(3, Step::AwaitingRepoUrl).await);
        assert!(registry.is_empty().await);
    }
}
