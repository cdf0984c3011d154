//! 监控核心 - 变动检测、里程碑、归因和轮询循环

pub mod attribution;
pub mod builder;
pub mod commands;
pub mod detector;
pub mod milestone;
pub mod poller;

pub use attribution::AttributionResolver;
pub use builder::MonitorBuilder;
pub use commands::{QuotaReport, RepoStatus, StatusReport};
pub use detector::{ChangeDetector, ChangeEvent, CounterSnapshot};
pub use milestone::{crossed, is_milestone, MilestoneTracker};
pub use poller::{ChangeReport, CycleOutcome, CycleReport, StarMonitor, ERROR_BACKOFF};
