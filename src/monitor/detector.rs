//! 变动检测 - 维护每个仓库最近一次观测到的 star 数

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::github::Actor;
use crate::locator::RepoId;

/// 某个仓库最近一次成功观测的计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub key: String,
    pub value: u64,
    pub observed_at: DateTime<Utc>,
}

/// 计数变动事件
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub repo: RepoId,
    pub previous: u64,
    pub current: u64,
    /// `current - previous`，非零
    pub delta: i64,
    /// 本次变动跨过的里程碑
    pub milestone: Option<u64>,
    /// 归因用户，最新在前；空表示未知
    pub actors: Vec<Actor>,
}

impl ChangeEvent {
    pub fn key(&self) -> String {
        self.repo.key()
    }

    pub fn is_milestone(&self) -> bool {
        self.milestone.is_some()
    }

    pub fn is_increase(&self) -> bool {
        self.delta > 0
    }
}

/// 变动检测器
#[derive(Debug, Default)]
pub struct ChangeDetector {
    snapshots: HashMap<String, CounterSnapshot>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次观测
    ///
    /// - 首次观测：只保存，不产生事件
    /// - 值未变：只刷新时间戳
    /// - 值变化：先保存新值再返回事件，后续步骤失败也不会重复通知
    pub fn observe(&mut self, repo: &RepoId, value: u64) -> Option<ChangeEvent> {
        let key = repo.key();
        let snapshot = CounterSnapshot {
            key: key.clone(),
            value,
            observed_at: Utc::now(),
        };

        let previous = self.snapshots.insert(key, snapshot)?.value;
        if previous == value {
            return None;
        }

        Some(ChangeEvent {
            repo: repo.clone(),
            previous,
            current: value,
            delta: value as i64 - previous as i64,
            milestone: None,
            actors: Vec::new(),
        })
    }

    /// 仅在仓库未知时写入初始值，返回是否写入
    pub fn initialize(&mut self, repo: &RepoId, value: u64) -> bool {
        let key = repo.key();
        if self.snapshots.contains_key(&key) {
            return false;
        }
        self.snapshots.insert(
            key.clone(),
            CounterSnapshot {
                key,
                value,
                observed_at: Utc::now(),
            },
        );
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.snapshots.contains_key(key)
    }

    /// 最近一次观测值
    pub fn get(&self, key: &str) -> Option<u64> {
        self.snapshots.get(key).map(|s| s.value)
    }

    pub fn snapshot(&self, key: &str) -> Option<&CounterSnapshot> {
        self.snapshots.get(key)
    }

    /// 所有快照，按 key 排序
    pub fn snapshots(&self) -> Vec<&CounterSnapshot> {
        let mut all: Vec<_> = self.snapshots.values().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
