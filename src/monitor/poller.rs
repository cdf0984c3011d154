//! 轮询循环 - 驱动检测、归因、组装和投递
//!
//! 同一时间最多一个检查周期：`run_cycle` 用 `try_lock` 抢占状态锁，
//! 抢不到说明上一轮还在进行，本次直接跳过。

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::attribution::AttributionResolver;
use super::detector::{ChangeDetector, ChangeEvent, CounterSnapshot};
use super::milestone::MilestoneTracker;
use crate::config::MonitorConfig;
use crate::github::StarSource;
use crate::locator::RepoId;
use crate::notification::composer::{self, ComposedNotification, CompositionPath, NotificationBody};
use crate::notification::{NotificationComposer, NotificationDispatcher, SendResult};

/// 周期出错后的退避时间
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// 只由持锁的周期修改的状态
#[derive(Debug, Default)]
pub(super) struct MonitorState {
    pub(super) detector: ChangeDetector,
    pub(super) milestones: MilestoneTracker,
}

/// 单个变动的处理结果
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport {
    pub repo: String,
    pub previous: u64,
    pub current: u64,
    pub delta: i64,
    pub milestone: Option<u64>,
    pub actors: Vec<String>,
    pub path: CompositionPath,
    pub delivered: usize,
    pub failed_destinations: Vec<String>,
}

impl ChangeReport {
    fn new(event: &ChangeEvent, path: CompositionPath, results: &[(String, SendResult)]) -> Self {
        Self {
            repo: event.key(),
            previous: event.previous,
            current: event.current,
            delta: event.delta,
            milestone: event.milestone,
            actors: event.actors.iter().map(|a| a.username.clone()).collect(),
            path,
            delivered: results.iter().filter(|(_, r)| r.is_sent()).count(),
            failed_destinations: results
                .iter()
                .filter(|(_, r)| matches!(r, SendResult::Failed(_)))
                .map(|(d, _)| d.clone())
                .collect(),
        }
    }
}

/// 一个检查周期的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// 成功获取计数的仓库数
    pub checked: usize,
    pub changed: Vec<ChangeReport>,
    /// 获取失败的仓库
    pub failed: Vec<String>,
    /// 无法解析的仓库配置
    pub skipped: Vec<String>,
    /// 未执行检查的原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_reason: Option<String>,
}

impl CycleReport {
    fn idle(reason: &str) -> Self {
        Self {
            idle_reason: Some(reason.to_string()),
            ..Self::default()
        }
    }
}

/// 周期执行结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// 上一轮仍在进行
    Skipped,
}

/// star 监控器
pub struct StarMonitor {
    pub(super) config: MonitorConfig,
    pub(super) source: Arc<dyn StarSource>,
    pub(super) attribution: AttributionResolver,
    pub(super) composer: NotificationComposer,
    pub(super) dispatcher: NotificationDispatcher,
    pub(super) state: Mutex<MonitorState>,
}

impl StarMonitor {
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn StarSource>,
        composer: NotificationComposer,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let state = MonitorState {
            detector: ChangeDetector::new(),
            milestones: MilestoneTracker::new(config.milestones.iter().copied()),
        };
        Self {
            attribution: AttributionResolver::new(source.clone()),
            config,
            source,
            composer,
            dispatcher,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// 是否有周期正在执行
    pub fn is_running(&self) -> bool {
        self.state.try_lock().is_err()
    }

    /// 当前计数表（按 key 排序）
    pub async fn snapshots(&self) -> Vec<CounterSnapshot> {
        let state = self.state.lock().await;
        state.detector.snapshots().into_iter().cloned().collect()
    }

    /// 配置中可解析的仓库
    fn repositories(&self) -> impl Iterator<Item = (&str, Option<RepoId>)> {
        self.config
            .repositories
            .iter()
            .map(|raw| (raw.as_str(), RepoId::parse(raw)))
    }

    /// 初始化计数表：只为未知的仓库取值，返回新写入的数量
    pub async fn initialize(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut initialized = 0;

        for (raw, repo) in self.repositories() {
            let Some(repo) = repo else {
                warn!(repository = %raw, "Invalid GitHub repository, skipping");
                continue;
            };
            if state.detector.contains(&repo.key()) {
                continue;
            }

            match self.source.fetch_count(&repo).await {
                Some(stars) => {
                    state.detector.initialize(&repo, stars);
                    initialized += 1;
                    info!(repo = %repo, stars, "Initialized star count");
                }
                None => warn!(repo = %repo, "Failed to initialize star count"),
            }
        }

        initialized
    }

    /// 发送启动通知
    pub async fn send_startup_notification(&self) -> Vec<(String, SendResult)> {
        if self.dispatcher.destination_count() == 0 {
            debug!("No destinations configured, skipping startup notification");
            return Vec::new();
        }

        let text = composer::startup_text(&self.config.repositories, self.config.check_interval());
        self.dispatcher.send_text(&text).await
    }

    /// 执行一个检查周期
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("Previous check still running, skipping this cycle");
            return CycleOutcome::Skipped;
        };

        if self.config.repositories.is_empty() {
            debug!("No repositories configured");
            return CycleOutcome::Completed(CycleReport::idle("no repositories configured"));
        }
        if self.dispatcher.destination_count() == 0 {
            debug!("No destinations configured");
            return CycleOutcome::Completed(CycleReport::idle("no destinations configured"));
        }

        let mut report = CycleReport::default();

        for (raw, repo) in self.repositories() {
            let Some(repo) = repo else {
                warn!(repository = %raw, "Invalid GitHub repository, skipping");
                report.skipped.push(raw.to_string());
                continue;
            };

            let Some(current) = self.source.fetch_count(&repo).await else {
                report.failed.push(repo.key());
                continue;
            };
            report.checked += 1;

            // 新值在这里已经写入，后续步骤失败也不会重复通知
            let Some(mut event) = state.detector.observe(&repo, current) else {
                continue;
            };
            event.milestone = state
                .milestones
                .classify(&event.key(), event.previous, event.current);

            info!(
                repo = %repo,
                previous = event.previous,
                current = event.current,
                delta = event.delta,
                milestone = ?event.milestone,
                "Star count changed"
            );

            event.actors = self.attribution.resolve(&repo, event.delta).await;
            let composed = self.composer.compose(&event).await;
            let results = self.deliver(&event, &composed).await;
            report
                .changed
                .push(ChangeReport::new(&event, composed.path, &results));
        }

        CycleOutcome::Completed(report)
    }

    /// 投递组装好的通知；图片无法写入临时文件时改发文本
    async fn deliver(
        &self,
        event: &ChangeEvent,
        composed: &ComposedNotification,
    ) -> Vec<(String, SendResult)> {
        match &composed.body {
            NotificationBody::Text(text) => self.dispatcher.send_text(text).await,
            NotificationBody::Image(png) => match self.dispatcher.send_image(png).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(repo = %event.repo, error = %e, "Image delivery failed, sending text");
                    self.dispatcher
                        .send_text(&composer::fallback_text(event))
                        .await
                }
            },
        }
    }

    /// 常驻循环：预热、启动通知、初始化，然后按间隔检查
    ///
    /// 单个周期 panic 不会结束循环，记录后退避 [`ERROR_BACKOFF`] 再继续。
    pub async fn run(self: Arc<Self>) {
        info!(
            repositories = self.config.repositories.len(),
            destinations = self.dispatcher.destination_count(),
            interval_secs = self.config.check_interval_secs,
            "Star monitor starting"
        );
        sleep(self.config.warmup()).await;

        let startup = {
            let monitor = self.clone();
            tokio::spawn(async move {
                if monitor.config.enable_startup_notification {
                    monitor.send_startup_notification().await;
                }
                monitor.initialize().await
            })
        };
        match startup.await {
            Ok(initialized) => info!(initialized, "Star monitor initialized"),
            Err(e) => error!(error = %e, "Star monitor startup failed"),
        }

        let interval = self.config.check_interval();
        loop {
            let monitor = self.clone();
            match tokio::spawn(async move { monitor.run_cycle().await }).await {
                Ok(CycleOutcome::Completed(report)) => {
                    debug!(
                        checked = report.checked,
                        changed = report.changed.len(),
                        failed = report.failed.len(),
                        "Check cycle finished"
                    );
                    sleep(interval).await;
                }
                Ok(CycleOutcome::Skipped) => sleep(interval).await,
                Err(e) => {
                    error!(error = %e, "Check cycle failed, backing off");
                    sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }
}
