//! 消息发送 trait 定义

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// 发出的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    /// 纯文本
    Text(String),
    /// 本地图片文件（调用方负责发送后清理）
    Image { path: PathBuf },
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// 日志用的简短描述
    pub fn preview(&self) -> String {
        match self {
            Self::Text(text) => text.lines().next().unwrap_or_default().to_string(),
            Self::Image { path } => format!("[image {}]", path.display()),
        }
    }
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（dry-run 等）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

impl SendResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// 通知目标：`<channel>:<target>`，如 `telegram:123456`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub channel: String,
    pub target: String,
}

impl Destination {
    /// 按第一个 `:` 拆分，两侧都不能为空
    pub fn parse(raw: &str) -> Option<Self> {
        let (channel, target) = raw.trim().split_once(':')?;
        let (channel, target) = (channel.trim(), target.trim());
        if channel.is_empty() || target.is_empty() {
            return None;
        }
        Some(Self {
            channel: channel.to_string(),
            target: target.to_string(),
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.target)
    }
}

/// 消息发送能力
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// 发送器名称（用于日志）
    fn name(&self) -> &str;

    /// 向单个目标发送消息
    async fn send(&self, destination: &str, message: &OutgoingMessage) -> Result<SendResult>;
}
