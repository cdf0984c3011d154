//! OpenClaw message send 发送器
//!
//! 支持所有 OpenClaw 支持的渠道：telegram, whatsapp, discord, slack, signal 等

use crate::notification::channel::{Destination, MessageSender, OutgoingMessage, SendResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

/// 单次发送的超时（秒）
pub const SEND_TIMEOUT_SECS: u64 = 30;

/// OpenClaw 发送器配置
#[derive(Debug, Clone)]
pub struct OpenclawMessageConfig {
    /// OpenClaw 命令路径
    pub openclaw_cmd: String,
    /// 单次发送超时，超时后结束子进程
    pub timeout: Duration,
}

impl Default for OpenclawMessageConfig {
    fn default() -> Self {
        Self {
            openclaw_cmd: "openclaw".to_string(),
            timeout: Duration::from_secs(SEND_TIMEOUT_SECS),
        }
    }
}

/// 通过 `openclaw message send` 投递消息
pub struct OpenclawMessageSender {
    config: OpenclawMessageConfig,
}

impl OpenclawMessageSender {
    pub fn new(config: OpenclawMessageConfig) -> Self {
        Self { config }
    }

    /// 构造命令行参数
    fn build_args(destination: &Destination, message: &OutgoingMessage) -> Vec<String> {
        let mut args = vec![
            "message".to_string(),
            "send".to_string(),
            "--channel".to_string(),
            destination.channel.clone(),
            "--target".to_string(),
            destination.target.clone(),
        ];

        match message {
            OutgoingMessage::Text(text) => {
                args.push("--message".to_string());
                args.push(text.clone());
            }
            OutgoingMessage::Image { path } => {
                args.push("--media".to_string());
                args.push(path.display().to_string());
            }
        }

        args
    }
}

#[async_trait]
impl MessageSender for OpenclawMessageSender {
    fn name(&self) -> &str {
        "openclaw"
    }

    async fn send(&self, destination: &str, message: &OutgoingMessage) -> Result<SendResult> {
        let Some(dest) = Destination::parse(destination) else {
            return Ok(SendResult::Failed(format!(
                "invalid destination '{}', expected <channel>:<target>",
                destination
            )));
        };

        let run = Command::new(&self.config.openclaw_cmd)
            .args(Self::build_args(&dest, message))
            .kill_on_drop(true)
            .output();

        let Ok(output) = tokio::time::timeout(self.config.timeout, run).await else {
            warn!(
                channel = %dest.channel,
                target = %dest.target,
                timeout_secs = self.config.timeout.as_secs_f64(),
                "Message send timed out"
            );
            return Ok(SendResult::Failed(format!(
                "timed out after {:?}",
                self.config.timeout
            )));
        };
        let output =
            output.with_context(|| format!("Failed to run {}", self.config.openclaw_cmd))?;

        if output.status.success() {
            info!(
                channel = %dest.channel,
                target = %dest.target,
                "Message sent successfully"
            );
            Ok(SendResult::Sent)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                channel = %dest.channel,
                error = %stderr,
                "Failed to send message"
            );
            Ok(SendResult::Failed(stderr.trim().to_string()))
        }
    }
}
