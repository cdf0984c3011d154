//! 运维命令 - 状态查询、测试通知、强制检查、配额查询

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use tracing::info;

use super::poller::{CycleOutcome, CycleReport, StarMonitor};
use crate::github::Quota;
use crate::locator::RepoId;
use crate::notification::composer::{self, signed_delta};
use crate::notification::SendResult;

/// 剩余请求低于此值时提示配置 token
const LOW_QUOTA_WARNING: u64 = 100;

/// 单个仓库的状态行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoStatus {
    Ok { repo: String, stars: u64 },
    FetchFailed { repo: String },
    Invalid { raw: String },
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok { repo, stars } => write!(f, "🌟 {}: {} stars", repo, stars),
            Self::FetchFailed { repo } => write!(f, "❌ {}: fetch failed", repo),
            Self::Invalid { raw } => write!(f, "❌ invalid repository: {}", raw),
        }
    }
}

/// 状态报告
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub repositories: Vec<RepoStatus>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repositories.is_empty() {
            return write!(f, "❌ No repositories configured");
        }
        writeln!(f, "⭐ Star monitor status")?;
        for status in &self.repositories {
            write!(f, "\n{}", status)?;
        }
        Ok(())
    }
}

/// 配额报告
#[derive(Debug, Clone, Serialize)]
pub struct QuotaReport {
    pub authenticated: bool,
    pub quota: Quota,
}

impl QuotaReport {
    pub fn is_low(&self) -> bool {
        self.quota.remaining < LOW_QUOTA_WARNING
    }
}

impl fmt::Display for QuotaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 GitHub API usage\n")?;
        if self.authenticated {
            writeln!(f, "🔑 Authentication: authenticated")?;
        } else {
            writeln!(f, "🔓 Authentication: unauthenticated")?;
        }
        writeln!(
            f,
            "Remaining requests: {}/{}",
            self.quota.remaining, self.quota.limit
        )?;
        let reset: DateTime<Local> = self.quota.reset_at.with_timezone(&Local);
        writeln!(f, "Reset at: {}", reset.format("%Y-%m-%d %H:%M:%S"))?;
        write!(f, "Used: {:.1}%", self.quota.used_percent())?;
        if self.is_low() {
            write!(f, "\n\n⚠️ Few requests remaining, consider configuring a GitHub token")?;
        }
        Ok(())
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.idle_reason {
            return write!(f, "⚠️ Check not run: {}", reason);
        }
        write!(
            f,
            "✅ Check finished: {} checked, {} changed, {} failed, {} skipped",
            self.checked,
            self.changed.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        for change in &self.changed {
            write!(
                f,
                "\n• {}: {} ({} → {}) via {}",
                change.repo,
                signed_delta(change.delta),
                change.previous,
                change.current,
                change.path.as_str()
            )?;
        }
        for repo in &self.failed {
            write!(f, "\n❌ {}: fetch failed", repo)?;
        }
        for raw in &self.skipped {
            write!(f, "\n❌ invalid repository: {}", raw)?;
        }
        Ok(())
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(report) => fmt::Display::fmt(report, f),
            Self::Skipped => write!(f, "⏭️ A check is already running, skipped"),
        }
    }
}

impl StarMonitor {
    /// 查询每个配置仓库的当前 star 数；单个失败只影响对应行
    pub async fn status_report(&self) -> StatusReport {
        let mut repositories = Vec::with_capacity(self.config.repositories.len());

        for raw in &self.config.repositories {
            let Some(repo) = RepoId::parse(raw) else {
                repositories.push(RepoStatus::Invalid { raw: raw.clone() });
                continue;
            };
            let status = match self.source.fetch_count(&repo).await {
                Some(stars) => RepoStatus::Ok {
                    repo: repo.key(),
                    stars,
                },
                None => RepoStatus::FetchFailed { repo: repo.key() },
            };
            repositories.push(status);
        }

        StatusReport { repositories }
    }

    /// 向所有目标发送测试消息
    pub async fn send_test_notification(&self) -> Result<Vec<(String, SendResult)>> {
        if self.dispatcher.destination_count() == 0 {
            bail!("No destinations configured, cannot send test message");
        }

        let results = self
            .dispatcher
            .send_text(&composer::test_text(Local::now()))
            .await;
        info!(
            destinations = results.len(),
            sent = results.iter().filter(|(_, r)| r.is_sent()).count(),
            "Test notification sent"
        );
        Ok(results)
    }

    /// 立即执行一次检查：先补齐未知仓库的初始值，再跑一个周期
    pub async fn force_check(&self) -> CycleOutcome {
        self.initialize().await;
        self.run_cycle().await
    }

    /// 查询 API 配额
    pub async fn quota_report(&self) -> Option<QuotaReport> {
        let quota = self.source.fetch_quota().await?;
        Some(QuotaReport {
            authenticated: self.source.has_credentials(),
            quota,
        })
    }
}
