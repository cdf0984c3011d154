//! 监控器构建器 - 按配置组装数据源、渲染器和发送器

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use super::poller::StarMonitor;
use crate::config::MonitorConfig;
use crate::github::{AvatarSource, GitHubClient, StarSource};
use crate::notification::{
    ChromiumRenderer, MessageSender, NotificationComposer, NotificationDispatcher,
    OpenclawMessageConfig, OpenclawMessageSender, Renderer,
};

/// 监控器构建器
///
/// 未显式注入的组件按配置创建：GitHub 客户端、自动检测的浏览器、OpenClaw 发送器。
pub struct MonitorBuilder {
    config: MonitorConfig,
    source: Option<Arc<dyn StarSource>>,
    avatars: Option<Arc<dyn AvatarSource>>,
    renderer: Option<Option<Arc<dyn Renderer>>>,
    sender: Option<Arc<dyn MessageSender>>,
    dry_run: bool,
}

impl MonitorBuilder {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            source: None,
            avatars: None,
            renderer: None,
            sender: None,
            dry_run: false,
        }
    }

    /// 设置 star 数据源
    pub fn source(mut self, source: Arc<dyn StarSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// 设置头像数据源
    pub fn avatars(mut self, avatars: Arc<dyn AvatarSource>) -> Self {
        self.avatars = Some(avatars);
        self
    }

    /// 设置渲染器，`None` 表示禁用图片
    pub fn renderer(mut self, renderer: Option<Arc<dyn Renderer>>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// 设置消息发送器
    pub fn sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 构建监控器
    pub fn build(self) -> Result<StarMonitor> {
        self.config.validate()?;

        let (source, avatars) = match (self.source, self.avatars) {
            (Some(source), Some(avatars)) => (source, avatars),
            (source, avatars) => {
                let client = Arc::new(GitHubClient::from_config(&self.config)?);
                (
                    source.unwrap_or_else(|| client.clone() as Arc<dyn StarSource>),
                    avatars.unwrap_or_else(|| client as Arc<dyn AvatarSource>),
                )
            }
        };

        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None if self.config.enable_image_notification => {
                ChromiumRenderer::detect(self.config.browser_path.as_deref())
                    .map(|r| Arc::new(r) as Arc<dyn Renderer>)
            }
            None => None,
        };

        let sender = self.sender.unwrap_or_else(|| {
            Arc::new(OpenclawMessageSender::new(OpenclawMessageConfig {
                openclaw_cmd: self.config.openclaw_cmd.clone(),
                ..OpenclawMessageConfig::default()
            })) as Arc<dyn MessageSender>
        });

        let composer = NotificationComposer::new(avatars)
            .with_renderer(renderer)
            .with_image_enabled(self.config.enable_image_notification);
        let dispatcher = NotificationDispatcher::new(sender, self.config.destinations.clone())
            .with_dry_run(self.dry_run);

        info!(
            repositories = self.config.repositories.len(),
            authenticated = source.has_credentials(),
            image = composer.image_available(),
            dry_run = self.dry_run,
            "Star monitor configured"
        );

        Ok(StarMonitor::new(self.config, source, composer, dispatcher))
    }
}
