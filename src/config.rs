//! 监控配置
//!
//! 读取优先级：
//! 1. 命令行 `--config` 指定的 JSON 文件
//! 2. `~/.config/star-monitor/config.json`
//! 3. 内置默认值
//!
//! `github_token` 为空时回退到环境变量 `GITHUB_TOKEN`

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// GitHub REST API 基础 URL
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// 默认轮询间隔（秒）
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// 默认启动预热时间（秒）
pub const DEFAULT_WARMUP_SECS: u64 = 10;

/// 默认里程碑
pub const DEFAULT_MILESTONE: u64 = 10_000;

/// 监控配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 要监控的仓库（URL 或 owner/name）
    pub repositories: Vec<String>,
    /// 通知目标，格式 `<channel>:<target>`，如 `telegram:123456`
    pub destinations: Vec<String>,
    /// 轮询间隔（秒）
    pub check_interval_secs: u64,
    /// GitHub token，提高配额并启用归因查询
    pub github_token: String,
    /// 是否发送图片通知
    pub enable_image_notification: bool,
    /// 是否发送启动通知
    pub enable_startup_notification: bool,
    /// 里程碑阈值
    pub milestones: Vec<u64>,
    /// API 基础 URL（支持代理 / GitHub Enterprise）
    pub api_base_url: String,
    /// OpenClaw 命令路径
    pub openclaw_cmd: String,
    /// 渲染用浏览器路径，未设置时自动查找
    pub browser_path: Option<String>,
    /// 启动预热时间（秒）
    pub warmup_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            destinations: Vec::new(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            github_token: String::new(),
            enable_image_notification: true,
            enable_startup_notification: true,
            milestones: vec![DEFAULT_MILESTONE],
            api_base_url: GITHUB_API_URL.to_string(),
            openclaw_cmd: "openclaw".to_string(),
            browser_path: None,
            warmup_secs: DEFAULT_WARMUP_SECS,
        }
    }
}

impl MonitorConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("star-monitor")
            .join("config.json")
    }

    /// 加载配置，`path` 为 `None` 时使用默认路径
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            debug!(path = %path.display(), "Loaded config file");
            Self::from_json(&content)?
        } else if explicit {
            return Err(anyhow!("Config file not found: {}", path.display()));
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        if config.github_token.trim().is_empty() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                if !token.trim().is_empty() {
                    debug!("Using GITHUB_TOKEN from environment");
                    config.github_token = token;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 字符串解析（缺失字段使用默认值）
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("Invalid config JSON")?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(anyhow!("check_interval_secs must be at least 1"));
        }
        if self.milestones.iter().any(|&m| m == 0) {
            return Err(anyhow!("milestones must be positive"));
        }
        Ok(())
    }

    /// 去除空白后的 token，空则为 `None`
    pub fn token(&self) -> Option<&str> {
        let token = self.github_token.trim();
        (!token.is_empty()).then_some(token)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.milestones, vec![10_000]);
        assert_eq!(config.api_base_url, GITHUB_API_URL);
        assert!(config.enable_image_notification);
        assert!(config.enable_startup_notification);
        assert!(config.token().is_none());
    }

    #[test]
    fn test_from_json_partial() {
        let config = MonitorConfig::from_json(
            r#"{"repositories": ["rust-lang/cargo"], "check_interval_secs": 120}"#,
        )
        .unwrap();
        assert_eq!(config.repositories, vec!["rust-lang/cargo"]);
        assert_eq!(config.check_interval(), Duration::from_secs(120));
        assert!(config.destinations.is_empty());
        assert_eq!(config.warmup(), Duration::from_secs(DEFAULT_WARMUP_SECS));
    }

    #[test]
    fn test_token_is_trimmed() {
        let config = MonitorConfig {
            github_token: "  ghp_abc \n".to_string(),
            ..Default::default()
        };
        assert_eq!(config.token(), Some("ghp_abc"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = MonitorConfig {
            check_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_milestone() {
        let config = MonitorConfig {
            milestones: vec![0, 100],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"destinations": ["telegram:42"], "github_token": "ghp_file"}"#,
        )
        .unwrap();

        let config = MonitorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.destinations, vec!["telegram:42"]);
        assert_eq!(config.token(), Some("ghp_file"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = MonitorConfig::load(Some(&dir.path().join("missing.json")));
        assert!(result.is_err());
    }
}
