//! Star Monitor - 监控 GitHub 仓库 star 变动并推送通知

pub mod cli;
pub mod config;
pub mod github;
pub mod locator;
pub mod monitor;
pub mod notification;

pub use config::MonitorConfig;
pub use github::{Actor, AvatarSource, Confidence, GitHubClient, Quota, StarSource};
pub use locator::RepoId;
pub use monitor::{
    AttributionResolver, ChangeDetector, ChangeEvent, CycleOutcome, CycleReport,
    MilestoneTracker, MonitorBuilder, StarMonitor,
};
pub use notification::{
    ChromiumRenderer, CompositionPath, MessageSender, NotificationComposer,
    NotificationDispatcher, OutgoingMessage, RenderError, Renderer, SendResult,
};
