//! 通知分发器 - 把一条消息发往所有目标

use super::channel::{MessageSender, OutgoingMessage, SendResult};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 通知分发器
///
/// 单个目标失败只记录日志，不影响其他目标。
pub struct NotificationDispatcher {
    sender: Arc<dyn MessageSender>,
    destinations: Vec<String>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn MessageSender>, destinations: Vec<String>) -> Self {
        info!(
            sender = sender.name(),
            destinations = destinations.len(),
            "Notification dispatcher ready"
        );
        Self {
            sender,
            destinations,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 发送消息到所有目标
    pub async fn send(&self, message: &OutgoingMessage) -> Vec<(String, SendResult)> {
        let mut results = Vec::with_capacity(self.destinations.len());

        for destination in &self.destinations {
            if self.dry_run {
                eprintln!("[DRY-RUN] Would send to {}: {}", destination, message.preview());
                results.push((destination.clone(), SendResult::Skipped("dry-run".to_string())));
                continue;
            }

            let result = match self.sender.send(destination, message).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(destination = %destination, error = %e, "Notification send failed");
                    SendResult::Failed(e.to_string())
                }
            };

            if let SendResult::Failed(reason) = &result {
                warn!(destination = %destination, reason = %reason, "Notification not delivered");
            }
            results.push((destination.clone(), result));
        }

        results
    }

    /// 发送纯文本
    pub async fn send_text(&self, text: &str) -> Vec<(String, SendResult)> {
        self.send(&OutgoingMessage::text(text)).await
    }

    /// 发送图片：写入临时文件，发送后立即删除
    pub async fn send_image(&self, png: &[u8]) -> Result<Vec<(String, SendResult)>> {
        let mut file = tempfile::Builder::new()
            .prefix("star_notification_")
            .suffix(".png")
            .tempfile()
            .context("Failed to create temporary image file")?;
        file.write_all(png).context("Failed to write temporary image file")?;
        file.flush()?;

        let message = OutgoingMessage::Image {
            path: file.path().to_path_buf(),
        };
        let results = self.send(&message).await;

        let path = file.path().display().to_string();
        match file.close() {
            Ok(()) => debug!(path = %path, "Removed temporary image file"),
            Err(e) => warn!(path = %path, error = %e, "Failed to remove temporary image file"),
        }

        Ok(results)
    }

    /// 目标数量
    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    pub fn sender_name(&self) -> &str {
        self.sender.name()
    }
}
