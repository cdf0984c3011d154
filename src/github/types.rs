//! GitHub 数据类型 - 领域类型和 REST API 响应结构

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 归因可信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// 来自 stargazers 列表，确认新增
    Confirmed,
    /// 来自活动流的猜测（取消 star 没有直接的 API）
    Heuristic,
}

/// 导致计数变动的用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub avatar_url: Option<String>,
    pub confidence: Confidence,
}

impl Actor {
    pub fn confirmed(username: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self {
            username: username.into(),
            avatar_url,
            confidence: Confidence::Confirmed,
        }
    }

    pub fn heuristic(username: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self {
            username: username.into(),
            avatar_url,
            confidence: Confidence::Heuristic,
        }
    }

    pub fn is_heuristic(&self) -> bool {
        self.confidence == Confidence::Heuristic
    }
}

/// API 配额（core 类别）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub remaining: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
}

impl Quota {
    /// 已使用百分比
    pub fn used_percent(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        let used = self.limit.saturating_sub(self.remaining);
        used as f64 / self.limit as f64 * 100.0
    }
}

// ============================================================================
// REST API 响应结构（只保留用到的字段）
// ============================================================================

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
pub(crate) struct RepoResponse {
    #[serde(default)]
    pub stargazers_count: u64,
}

/// `GET /rate_limit`
#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResources {
    pub core: RateLimitEntry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitEntry {
    pub limit: u64,
    pub remaining: u64,
    /// Unix 时间戳（秒）
    pub reset: i64,
}

impl RateLimitEntry {
    pub fn into_quota(self) -> Quota {
        let reset_at = Utc
            .timestamp_opt(self.reset, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Quota {
            remaining: self.remaining,
            limit: self.limit,
            reset_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUser {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// `GET /repos/{owner}/{repo}/stargazers`（`application/vnd.github.v3.star+json`）
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StargazerEntry {
    #[serde(default)]
    pub starred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<WireUser>,
}

/// `GET /repos/{owner}/{repo}/events`
#[derive(Debug, Deserialize)]
pub(crate) struct RepoEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub actor: Option<WireUser>,
}

impl RepoEvent {
    /// star 相关事件
    pub fn is_watch(&self) -> bool {
        self.event_type == "WatchEvent"
    }
}
