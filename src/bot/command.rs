//! 命令识别
//!
//! 以 `/` 开头的消息一律是命令，只交给命令分发处理；首个空白前的 token 区分大小写，
//! 允许群聊中的 `/deploy@NamaBot` 形式。

use std::sync::OnceLock;

use regex::Regex;

/// 命令前缀
pub const COMMAND_MARKER: char = '/';

/// 支持的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Menu,
    Login,
    Logout,
    Deploy,
    CreateKv,
    Binding,
    ListWorkers,
    ListKv,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::Start,
        Command::Menu,
        Command::Login,
        Command::Logout,
        Command::Deploy,
        Command::CreateKv,
        Command::Binding,
        Command::ListWorkers,
        Command::ListKv,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Menu => "menu",
            Command::Login => "login",
            Command::Logout => "logout",
            Command::Deploy => "deploy",
            Command::CreateKv => "buat_kv",
            Command::Binding => "binding",
            Command::ListWorkers => "list_worker",
            Command::ListKv => "list_kv",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }

    /// 需要先登录的命令
    pub fn is_guarded(&self) -> bool {
        matches!(
            self,
            Command::Deploy
                | Command::CreateKv
                | Command::Binding
                | Command::ListWorkers
                | Command::ListKv
        )
    }

    /// 命令菜单中的说明
    pub fn description(&self) -> &'static str {
        match self {
            Command::Start => "Mulai",
            Command::Menu => "Tampilkan menu",
            Command::Login => "Login ke akun Cloudflare",
            Command::Logout => "Keluar dari akun Cloudflare",
            Command::Deploy => "Upload Worker dari GitHub",
            Command::CreateKv => "Membuat penyimpanan KV",
            Command::Binding => "Hubungkan KV ke Worker",
            Command::ListWorkers => "Lihat semua Worker",
            Command::ListKv => "Lihat semua KV",
        }
    }
}

/// 一条消息的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// 普通文本，交给步骤解释器
    FreeText,
    Command(Command),
    /// 以 `/` 开头但不是已知命令
    Unknown(String),
}

static COMMAND_RE: OnceLock<Regex> = OnceLock::new();

/// 对消息分类
pub fn parse(text: &str) -> Parsed {
    if !text.starts_with(COMMAND_MARKER) {
        return Parsed::FreeText;
    }
    let re = COMMAND_RE.get_or_init(|| {
        Regex::new(r"^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s|$)").unwrap()
    });
    let token = re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    match token.and_then(Command::from_token) {
        Some(cmd) => Parsed::Command(cmd),
        None => Parsed::Unknown(text.split_whitespace().next().unwrap_or("").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        for cmd in Command::ALL {
            assert_eq!(parse(&format!("/{}", cmd.token())), Parsed::Command(cmd));
        }
        assert_eq!(parse("/deploy extra words"), Parsed::Command(Command::Deploy));
        assert_eq!(parse("/list_kv@CfManagerBot"), Parsed::Command(Command::ListKv));
    }

    #[test]
    fn test_parse_is_case_sensitive_and_exact() {
        assert!(matches!(parse("/Deploy"), Parsed::Unknown(_)));
        assert!(matches!(parse("/deployx"), Parsed::Unknown(_)));
        assert!(matches!(parse("/"), Parsed::Unknown(_)));
        assert_eq!(parse("/foo bar"), Parsed::Unknown("/foo".to_string()));
    }

    #[test]
    fn test_free_text() {
        assert_eq!(parse("https://example.com/r.git"), Parsed::FreeText);
        // 前导空格不算命令
        assert_eq!(parse(" /deploy"), Parsed::FreeText);
    }

    #[test]
    fn test_guarded_commands() {
        assert!(!Command::Login.is_guarded());
        assert!(!Command::Logout.is_guarded());
        assert!(!Command::Menu.is_guarded());
        assert!(Command::Deploy.is_guarded());
        assert!(Command::ListKv.is_guarded());
    }
}
