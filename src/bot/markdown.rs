//! Telegram MarkdownV2 转义与回复构造
//!
//! MarkdownV2 保留字符：`_ * [ ] ( ) ~ \` > # + - = | { } . !`，外加反斜杠本身。
//! `Markdown` 构造器对每个片段只转义一次，调用方不要预先转义。

/// 需要反斜杠转义的保留字符
pub const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// 转义文本，使其在 MarkdownV2 消息中按字面显示
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if c == '\\' || RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 代码片段内只需转义 ` 与 \
fn escape_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 消息格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    MarkdownV2,
}

/// 一条待发送的回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: ParseMode,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: ParseMode::Plain,
        }
    }

    pub fn markdown(md: Markdown) -> Self {
        Self {
            text: md.build(),
            parse_mode: ParseMode::MarkdownV2,
        }
    }
}

/// MarkdownV2 文本构造器
#[derive(Debug, Default, Clone)]
pub struct Markdown {
    buf: String,
}

impl Markdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// 普通文本
    pub fn text(mut self, s: &str) -> Self {
        self.buf.push_str(&escape_markdown(s));
        self
    }

    /// 粗体
    pub fn bold(mut self, s: &str) -> Self {
        self.buf.push('*');
        self.buf.push_str(&escape_markdown(s));
        self.buf.push('*');
        self
    }

    /// 行内代码
    pub fn code(mut self, s: &str) -> Self {
        self.buf.push('`');
        self.buf.push_str(&escape_code(s));
        self.buf.push('`');
        self
    }

    /// 普通文本并换行
    pub fn line(self, s: &str) -> Self {
        self.text(s).newline()
    }

    pub fn newline(mut self) -> Self {
        self.buf.push('\n');
        self
    }

    pub fn build(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_reserved_char_escaped_once() {
        for c in RESERVED {
            let escaped = escape_markdown(&c.to_string());
            assert_eq!(escaped, format!("\\{}", c));
        }
        let all: String = RESERVED.iter().collect();
        let escaped = escape_markdown(&all);
        assert_eq!(escaped.len(), all.len() * 2);
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(escape_markdown("svc1 ok, 🚀 done"), "svc1 ok, 🚀 done");
    }

    #[test]
    fn test_backslash_escaped() {
        assert_eq!(escape_markdown(r"a\.b"), r"a\\\.b");
    }

    #[test]
    fn test_builder_escapes_each_fragment() {
        let md = Markdown::new()
            .text("✅ Worker ")
            .bold("my_svc-1")
            .text(" berhasil dideploy.")
            .build();
        assert_eq!(md, r"✅ Worker *my\_svc\-1* berhasil dideploy\.");
    }

    #[test]
    fn test_code_fragment() {
        let md = Markdown::new().code("ab`c.d").build();
        assert_eq!(md, "`ab\\`c.d`");
    }
}
