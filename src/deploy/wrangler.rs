//! wrangler 部署执行器
//!
//! 流程：清空 `<workdir_root>/worker-<user_id>` → `git clone --depth 1 -- <repo> <dir>` →
//! 在该目录执行 `<publish_program> <publish_args..> --name=<worker>`。
//! 全部用参数向量调用，不经过 shell；凭据通过子进程环境变量传入；整个流程受同一个超时约束，
//! 超时后子进程随 future 一起被 kill。

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;

use super::{DeployError, DeployRequest, Deployer};
use crate::config::DeploySection;
use crate::session::UserId;

/// Worker 名最大长度（Cloudflare 限制）
const MAX_WORKER_NAME_LEN: usize = 63;

pub struct WranglerDeployer {
    workdir_root: PathBuf,
    timeout_secs: u64,
    git_program: String,
    publish_program: String,
    publish_args: Vec<String>,
}

impl WranglerDeployer {
    pub fn new(cfg: &DeploySection) -> Self {
        Self {
            workdir_root: cfg.workdir_root.clone(),
            timeout_secs: cfg.timeout_secs,
            git_program: cfg.git_program.clone(),
            publish_program: cfg.publish_program.clone(),
            publish_args: cfg.publish_args.clone(),
        }
    }

    /// 用户专属的克隆目录
    pub fn workdir(&self, user_id: UserId) -> PathBuf {
        self.workdir_root.join(format!("worker-{}", user_id))
    }

    async fn run_deploy(&self, req: &DeployRequest) -> Result<String, DeployError> {
        let dir = self.workdir(req.user_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&dir).await?;

        let mut clone = Command::new(&self.git_program);
        clone
            .args(["clone", "--depth", "1", "--"])
            .arg(&req.repo_url)
            .arg(&dir)
            .env("GIT_TERMINAL_PROMPT", "0");
        run_stage("git clone", clone).await?;

        let mut publish = Command::new(&self.publish_program);
        publish
            .args(&self.publish_args)
            .arg(format!("--name={}", req.worker_name))
            .current_dir(&dir)
            .env("CLOUDFLARE_API_TOKEN", &req.api_token)
            .env("CLOUDFLARE_ACCOUNT_ID", &req.account_id);
        run_stage("wrangler deploy", publish).await
    }
}

#[async_trait]
impl Deployer for WranglerDeployer {
    async fn deploy(&self, req: &DeployRequest) -> Result<String, DeployError> {
        validate_repo_url(&req.repo_url)?;
        validate_worker_name(&req.worker_name)?;

        tracing::info!(
            user_id = req.user_id,
            repo = %req.repo_url,
            worker = %req.worker_name,
            "Deploy started"
        );

        tokio::time::timeout(Duration::from_secs(self.timeout_secs), self.run_deploy(req))
            .await
            .map_err(|_| DeployError::Timeout(self.timeout_secs))?
    }
}

/// 执行一个阶段；非 0 退出时带上 stderr（为空则 stdout）
async fn run_stage(stage: &'static str, mut cmd: Command) -> Result<String, DeployError> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    let output = cmd.output().await?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        tracing::warn!(stage, status = %output.status, "Deploy stage failed");
        return Err(DeployError::Process {
            stage,
            status: output.status.to_string(),
            output: if stderr.is_empty() { stdout } else { stderr },
        });
    }
    Ok(stdout)
}

/// 只接受 http(s) 远程仓库
fn validate_repo_url(raw: &str) -> Result<(), DeployError> {
    let url = Url::parse(raw).map_err(|_| DeployError::InvalidRepository(raw.to_string()))?;
    let remote = matches!(url.scheme(), "http" | "https") && url.host_str().is_some();
    if remote {
        Ok(())
    } else {
        Err(DeployError::InvalidRepository(raw.to_string()))
    }
}

fn validate_worker_name(name: &str) -> Result<(), DeployError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_WORKER_NAME_LEN
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DeployError::InvalidWorkerName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: UserId) -> DeployRequest {
        DeployRequest {
            user_id,
            repo_url: "https://example.com/r.git".into(),
            worker_name: "svc1".into(),
            account_id: "acc".into(),
            api_token: "tok".into(),
        }
    }

    fn deployer(root: &std::path::Path, script: &str, timeout_secs: u64) -> WranglerDeployer {
        WranglerDeployer::new(&DeploySection {
            workdir_root: root.to_path_buf(),
            timeout_secs,
            git_program: "true".into(),
            publish_program: "sh".into(),
            publish_args: vec!["-c".into(), script.into()],
        })
    }

    #[test]
    fn test_validate_repo_url() {
        assert!(validate_repo_url("https://github.com/user/repo.git").is_ok());
        assert!(validate_repo_url("http://example.com/r").is_ok());
        assert!(validate_repo_url("--upload-pack=touch /tmp/pwned").is_err());
        assert!(validate_repo_url("file:///etc").is_err());
        assert!(validate_repo_url("ext::sh -c id").is_err());
    }

    #[test]
    fn test_validate_worker_name() {
        assert!(validate_worker_name("svc1").is_ok());
        assert!(validate_worker_name("my-worker_2").is_ok());
        assert!(validate_worker_name("-rf").is_err());
        assert!(validate_worker_name("a b").is_err());
        assert!(validate_worker_name("x;rm").is_err());
        assert!(validate_worker_name(&"a".repeat(64)).is_err());
    }

    #[tokio::test]
    async fn test_invalid_repo_rejected_before_workdir() {
        let root = tempfile::tempdir().unwrap();
        let d = deployer(root.path(), "exit 0", 5);
        let mut req = request(1);
        req.repo_url = "not a url".into();

        let err = d.deploy(&req).await.unwrap_err();
        assert!(matches!(err, DeployError::InvalidRepository(_)));
        assert!(!d.workdir(1).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_publish_gets_credentials_from_env() {
        let root = tempfile::tempdir().unwrap();
        let d = deployer(
            root.path(),
            "echo \"deployed $0 to $CLOUDFLARE_ACCOUNT_ID\"",
            5,
        );

        let out = d.deploy(&request(1)).await.unwrap();
        assert_eq!(out, "deployed --name=svc1 to acc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_workdir_is_wiped() {
        let root = tempfile::tempdir().unwrap();
        let d = deployer(root.path(), "ls", 5);
        let stale = d.workdir(9).join("stale.txt");
        std::fs::create_dir_all(d.workdir(9)).unwrap();
        std::fs::write(&stale, "old").unwrap();

        let out = d.deploy(&request(9)).await.unwrap();
        assert_eq!(out, "");
        assert!(!stale.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_publish_failure_reports_stderr() {
        let root = tempfile::tempdir().unwrap();
        let d = deployer(root.path(), "echo progress; echo boom >&2; exit 3", 5);

        match d.deploy(&request(2)).await.unwrap_err() {
            DeployError::Process { stage, output, .. } => {
                assert_eq!(stage, "wrangler deploy");
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deploy_timeout() {
        let root = tempfile::tempdir().unwrap();
        let d = deployer(root.path(), "sleep 5", 1);

        let err = d.deploy(&request(3)).await.unwrap_err();
        assert!(matches!(err, DeployError::Timeout(1)));
    }
}
