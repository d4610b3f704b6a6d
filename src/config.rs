//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CFBOT__*` 覆盖（双下划线表示嵌套，如 `CFBOT__DEPLOY__TIMEOUT_SECS=600`）。
//! Bot Token 额外兼容旧的 `BOT_TOKEN` 环境变量。

use std::path::PathBuf;

use serde::Deserialize;

/// 旧版部署方式使用的 Bot Token 环境变量
pub const LEGACY_BOT_TOKEN_ENV: &str = "BOT_TOKEN";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub cloudflare: CloudflareSection,
    #[serde(default)]
    pub deploy: DeploySection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 关闭时等待后台部署任务结束的时间（秒）
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// [telegram] 段：Bot Token、API 地址、长轮询参数
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// getUpdates 长轮询等待时间（秒）
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// 轮询失败后的重试间隔（秒）
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    3
}

/// [cloudflare] 段
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareSection {
    #[serde(default = "default_cloudflare_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CloudflareSection {
    fn default() -> Self {
        Self {
            api_base: default_cloudflare_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_cloudflare_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// [deploy] 段：工作目录、超时、git 与发布命令
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// 每个用户的仓库会克隆到 `<workdir_root>/worker-<user_id>`
    #[serde(default = "default_workdir_root")]
    pub workdir_root: PathBuf,
    /// 整个部署（clone + publish）的硬超时
    #[serde(default = "default_deploy_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_git_program")]
    pub git_program: String,
    #[serde(default = "default_publish_program")]
    pub publish_program: String,
    /// 发布命令参数，最后会追加 `--name=<worker>`
    #[serde(default = "default_publish_args")]
    pub publish_args: Vec<String>,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            workdir_root: default_workdir_root(),
            timeout_secs: default_deploy_timeout_secs(),
            git_program: default_git_program(),
            publish_program: default_publish_program(),
            publish_args: default_publish_args(),
        }
    }
}

fn default_workdir_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_deploy_timeout_secs() -> u64 {
    5 * 60
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_publish_program() -> String {
    "npx".to_string()
}

fn default_publish_args() -> Vec<String> {
    vec!["--yes".into(), "wrangler".into(), "deploy".into()]
}

impl AppConfig {
    /// 解析 Bot Token：配置项优先，其次 `BOT_TOKEN`；空字符串视为未设置
    pub fn bot_token(&self) -> Option<String> {
        resolve_bot_token(
            self.telegram.bot_token.as_deref(),
            std::env::var(LEGACY_BOT_TOKEN_ENV).ok().as_deref(),
        )
    }
}

fn resolve_bot_token(configured: Option<&str>, legacy: Option<&str>) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| legacy.map(str::trim).filter(|t| !t.is_empty()))
        .map(str::to_string)
}

/// 从 config 目录加载配置，环境变量 CFBOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CFBOT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CFBOT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.deploy.timeout_secs, 300);
        assert_eq!(cfg.cloudflare.api_base, "https://api.cloudflare.com/client/v4");
        assert_eq!(cfg.telegram.api_base, "https://api.telegram.org");
        assert_eq!(cfg.deploy.publish_args.last().map(String::as_str), Some("deploy"));
    }

    #[test]
    fn test_resolve_bot_token_prefers_configured() {
        assert_eq!(
            resolve_bot_token(Some("cfg-token"), Some("legacy")),
            Some("cfg-token".to_string())
        );
        assert_eq!(
            resolve_bot_token(Some("  "), Some(" legacy ")),
            Some("legacy".to_string())
        );
        assert_eq!(resolve_bot_token(None, Some("")), None);
        assert_eq!(resolve_bot_token(None, None), None);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.toml");
        std::fs::write(
            &path,
            "[telegram]\nbot_token = \"123:abc\"\n\n[deploy]\ntimeout_secs = 42\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(cfg.deploy.timeout_secs, 42);
        assert_eq!(cfg.deploy.git_program, "git");
    }
}
