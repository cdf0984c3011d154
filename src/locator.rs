//! 仓库定位 - 把松散格式的仓库标识解析为 (owner, name)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 可识别并剥离的 URL 前缀
const KNOWN_PREFIXES: &[&str] = &[
    "https://www.github.com/",
    "http://www.github.com/",
    "https://github.com/",
    "http://github.com/",
    "www.github.com/",
    "github.com/",
    "git@github.com:",
];

/// 版本控制后缀
const VCS_SUFFIX: &str = ".git";

/// 被监控的仓库标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// 解析仓库标识
    ///
    /// 支持以下形式：
    /// - `https://github.com/owner/name`（带或不带协议）
    /// - 末尾带 `/` 或 `.git`
    /// - 裸 `owner/name`
    ///
    /// 剩余路径段少于两个时返回 `None`
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut path = KNOWN_PREFIXES
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed);

        // 只剥离一次
        if let Some(rest) = path.strip_suffix('/') {
            path = rest;
        }
        if let Some(rest) = path.strip_suffix(VCS_SUFFIX) {
            path = rest;
        }

        let mut segments = path.split('/');
        let owner = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;

        Some(Self::new(owner, name))
    }

    /// 计数表使用的 key：`owner/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// 仓库主页链接
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> Option<(String, String)> {
        RepoId::parse(input).map(|r| (r.owner, r.name))
    }

    #[test]
    fn test_parse_accepted_forms() {
        let expected = Some(("rust-lang".to_string(), "cargo".to_string()));
        let inputs = [
            "https://github.com/rust-lang/cargo",
            "http://github.com/rust-lang/cargo",
            "github.com/rust-lang/cargo",
            "rust-lang/cargo",
            "rust-lang/cargo/",
            "rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo/",
            "git@github.com:rust-lang/cargo.git",
            "  rust-lang/cargo  ",
        ];

        for input in inputs {
            assert_eq!(parsed(input), expected, "Failed for input: {}", input);
        }
    }

    #[test]
    fn test_parse_takes_first_two_segments() {
        assert_eq!(
            parsed("https://github.com/tokio-rs/tokio/tree/master"),
            Some(("tokio-rs".to_string(), "tokio".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_short_or_empty() {
        for input in [
            "",
            "   ",
            "cargo",
            "github.com/rust-lang",
            "https://github.com/",
            "/cargo",
            "owner//",
        ] {
            assert!(RepoId::parse(input).is_none(), "Should reject: {:?}", input);
        }
    }

    #[test]
    fn test_parse_keeps_case() {
        let repo = RepoId::parse("Soulter/AstrBot").unwrap();
        assert_eq!(repo.key(), "Soulter/AstrBot");
        assert_eq!(repo.html_url(), "https://github.com/Soulter/AstrBot");
        assert_eq!(repo.to_string(), "Soulter/AstrBot");
    }
}
