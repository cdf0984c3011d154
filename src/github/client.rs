//! GitHub REST API 客户端
//!
//! 每个请求都有 10 秒超时。失败按状态码分类后记录日志，
//! 调用方只看到 `None` / 空列表。

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, TimeZone};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::source::{AvatarSource, StarSource};
use super::types::{
    Actor, Quota, RateLimitResponse, RepoEvent, RepoResponse, StargazerEntry,
};
use crate::config::MonitorConfig;
use crate::locator::RepoId;

/// API 请求超时（秒）
pub const API_TIMEOUT_SECS: u64 = 10;

/// 分页大小（API 允许的最大值）
pub const PER_PAGE: u64 = 100;

/// 单次最多归因的用户数
pub const MAX_ATTRIBUTION: u64 = PER_PAGE;

const USER_AGENT: &str = concat!("star-monitor/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
/// 带 `starred_at` 时间戳的 stargazers 格式
const ACCEPT_STAR_JSON: &str = "application/vnd.github.v3.star+json";

/// 请求不可用的原因（只用于日志）
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnavailableReason {
    CredentialInvalid,
    RateLimited { reset: String },
    Forbidden,
    NotFound,
    UnexpectedStatus(u16),
    Timeout,
    Transport(String),
    Decode(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialInvalid => write!(f, "credential invalid or expired"),
            Self::RateLimited { reset } => write!(f, "rate limit exhausted, resets at {}", reset),
            Self::Forbidden => write!(f, "forbidden, insufficient permissions"),
            Self::NotFound => write!(f, "not found or not accessible"),
            Self::UnexpectedStatus(code) => write!(f, "unexpected status {}", code),
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(e) => write!(f, "request failed: {}", e),
            Self::Decode(e) => write!(f, "invalid response body: {}", e),
        }
    }
}

/// 按 HTTP 状态码和限流头分类失败原因
pub(crate) fn classify_status(
    status: u16,
    rate_remaining: Option<&str>,
    rate_reset: Option<&str>,
) -> UnavailableReason {
    let exhausted = rate_remaining.map(str::trim) == Some("0");
    match status {
        401 => UnavailableReason::CredentialInvalid,
        403 | 429 if exhausted || status == 429 => UnavailableReason::RateLimited {
            reset: format_reset(rate_reset),
        },
        403 => UnavailableReason::Forbidden,
        404 => UnavailableReason::NotFound,
        other => UnavailableReason::UnexpectedStatus(other),
    }
}

/// 把 `X-RateLimit-Reset`（Unix 秒）格式化为本地时间
fn format_reset(reset: Option<&str>) -> String {
    let Some(raw) = reset else {
        return "unknown".to_string();
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// stargazers 最后一页的页码
pub(crate) fn last_page(total: u64, per_page: u64) -> u64 {
    total.div_ceil(per_page).max(1)
}

/// 取列表末尾 `wanted` 个用户，按 `starred_at` 降序（相同时间保持列表顺序）
pub(crate) fn select_newest(entries: Vec<StargazerEntry>, wanted: usize) -> Vec<Actor> {
    let skip = entries.len().saturating_sub(wanted);
    let mut tail: Vec<StargazerEntry> = entries
        .into_iter()
        .skip(skip)
        .filter(|e| e.user.is_some())
        .collect();

    tail.sort_by(|a, b| b.starred_at.cmp(&a.starred_at));

    tail.into_iter()
        .filter_map(|e| e.user)
        .map(|u| Actor::confirmed(u.login, u.avatar_url))
        .collect()
}

/// GitHub 客户端
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// 创建客户端，`token` 为空字符串视为未认证
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// 从监控配置创建
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.token().map(str::to_string))
    }

    fn get(&self, url: &str, accept: &str) -> RequestBuilder {
        let builder = self.client.get(url).header(ACCEPT, accept);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        accept: &str,
        query: &[(&str, String)],
    ) -> Result<T, UnavailableReason> {
        let response = self
            .get(url, accept)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UnavailableReason::Timeout
                } else {
                    UnavailableReason::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers();
            let remaining = headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok());
            let reset = headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok());
            return Err(classify_status(status.as_u16(), remaining, reset));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                UnavailableReason::Timeout
            } else {
                UnavailableReason::Decode(e.to_string())
            }
        })
    }

    fn log_unavailable(what: &str, reason: &UnavailableReason) {
        match reason {
            UnavailableReason::CredentialInvalid => {
                error!(target_resource = what, "GitHub credential invalid or expired");
            }
            other => {
                warn!(target_resource = what, reason = %other, "GitHub request unavailable");
            }
        }
    }

    async fn stargazer_page(&self, repo: &RepoId, page: u64) -> Option<Vec<StargazerEntry>> {
        let url = format!(
            "{}/repos/{}/{}/stargazers",
            self.base_url, repo.owner, repo.name
        );
        let query = [("per_page", PER_PAGE.to_string()), ("page", page.to_string())];
        match self.get_json(&url, ACCEPT_STAR_JSON, &query).await {
            Ok(entries) => Some(entries),
            Err(reason) => {
                Self::log_unavailable(&format!("{} stargazers", repo), &reason);
                None
            }
        }
    }

    /// 最近新增的 `wanted` 个 stargazer
    async fn recent_stargazers(&self, repo: &RepoId, wanted: u64) -> Vec<Actor> {
        let wanted = wanted.min(MAX_ATTRIBUTION) as usize;
        let Some(total) = self.fetch_count(repo).await else {
            return Vec::new();
        };

        let page = last_page(total, PER_PAGE);
        let Some(mut entries) = self.stargazer_page(repo, page).await else {
            return Vec::new();
        };

        // 最后一页不足时补上前一页
        if entries.len() < wanted && page > 1 {
            if let Some(mut previous) = self.stargazer_page(repo, page - 1).await {
                previous.append(&mut entries);
                entries = previous;
            }
        }

        let actors = select_newest(entries, wanted);
        info!(repo = %repo, count = actors.len(), "Resolved recent stargazers");
        actors
    }

    /// 活动流中最近的一个 WatchEvent 用户（猜测）
    async fn recent_watch_actor(&self, repo: &RepoId) -> Option<Actor> {
        let url = format!("{}/repos/{}/{}/events", self.base_url, repo.owner, repo.name);
        let events: Vec<RepoEvent> = match self.get_json(&url, ACCEPT_JSON, &[]).await {
            Ok(events) => events,
            Err(reason) => {
                Self::log_unavailable(&format!("{} events", repo), &reason);
                return None;
            }
        };

        let actor = events
            .into_iter()
            .filter(RepoEvent::is_watch)
            .find_map(|e| e.actor)
            .map(|u| Actor::heuristic(u.login, u.avatar_url));

        debug!(repo = %repo, found = actor.is_some(), "Scanned activity feed for attrition guess");
        actor
    }
}

#[async_trait]
impl StarSource for GitHubClient {
    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    async fn fetch_count(&self, repo: &RepoId) -> Option<u64> {
        let url = format!("{}/repos/{}/{}", self.base_url, repo.owner, repo.name);
        debug!(repo = %repo, authenticated = self.has_credentials(), "Fetching star count");

        match self.get_json::<RepoResponse>(&url, ACCEPT_JSON, &[]).await {
            Ok(body) => Some(body.stargazers_count),
            Err(reason) => {
                Self::log_unavailable(&repo.key(), &reason);
                None
            }
        }
    }

    async fn fetch_quota(&self) -> Option<Quota> {
        let url = format!("{}/rate_limit", self.base_url);
        match self.get_json::<RateLimitResponse>(&url, ACCEPT_JSON, &[]).await {
            Ok(body) => Some(body.resources.core.into_quota()),
            Err(reason) => {
                Self::log_unavailable("rate_limit", &reason);
                None
            }
        }
    }

    async fn fetch_attribution_candidates(&self, repo: &RepoId, wanted: i64) -> Vec<Actor> {
        if !self.has_credentials() {
            debug!(repo = %repo, "No credential, skipping attribution");
            return Vec::new();
        }

        if wanted > 0 {
            self.recent_stargazers(repo, wanted as u64).await
        } else {
            self.recent_watch_actor(repo).await.into_iter().collect()
        }
    }
}

#[async_trait]
impl AvatarSource for GitHubClient {
    async fn fetch_avatar(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.client.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(url, status = r.status().as_u16(), "Avatar download failed");
                return None;
            }
            Err(e) => {
                warn!(url, error = %e, "Avatar download failed");
                return None;
            }
        };

        match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes.to_vec()),
            Ok(_) => None,
            Err(e) => {
                warn!(url, error = %e, "Avatar body read failed");
                None
            }
        }
    }
}
