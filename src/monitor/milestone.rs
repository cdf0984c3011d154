//! 里程碑判定
//!
//! 单阈值检查 `previous < threshold <= current`，推广为一组阈值：
//! 一次变动取跨过的最高阈值，并按仓库记录已宣布的阈值，避免回落后再次越过时重复庆祝。

use std::collections::{BTreeSet, HashMap};

use crate::config::DEFAULT_MILESTONE;

/// 本次变动是否跨过阈值（只对增长成立）
pub fn crossed(previous: u64, current: u64, threshold: u64) -> bool {
    previous < threshold && threshold <= current
}

/// 默认里程碑（10,000）是否被跨过
pub fn is_milestone(previous: u64, current: u64) -> bool {
    crossed(previous, current, DEFAULT_MILESTONE)
}

/// 里程碑追踪器
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    thresholds: BTreeSet<u64>,
    announced: HashMap<String, BTreeSet<u64>>,
}

impl MilestoneTracker {
    pub fn new(thresholds: impl IntoIterator<Item = u64>) -> Self {
        Self {
            thresholds: thresholds.into_iter().filter(|&t| t > 0).collect(),
            announced: HashMap::new(),
        }
    }

    /// 判定本次变动的里程碑
    ///
    /// 返回跨过且尚未为此仓库宣布过的最高阈值，都宣布过则返回 `None`。
    /// 本次跨过的所有阈值都会被记为已宣布。
    pub fn classify(&mut self, key: &str, previous: u64, current: u64) -> Option<u64> {
        if current <= previous {
            return None;
        }

        let crossed_now: Vec<u64> = self
            .thresholds
            .range(previous + 1..=current)
            .copied()
            .collect();
        let announced = self.announced.entry(key.to_string()).or_default();
        let fresh = crossed_now
            .iter()
            .rev()
            .find(|t| !announced.contains(t))
            .copied();
        announced.extend(crossed_now);

        fresh
    }

    /// 某仓库已宣布过的阈值（升序）
    pub fn announced(&self, key: &str) -> Vec<u64> {
        self.announced
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn thresholds(&self) -> Vec<u64> {
        self.thresholds.iter().copied().collect()
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new([DEFAULT_MILESTONE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_milestone_boundaries() {
        assert!(is_milestone(9999, 10000));
        assert!(!is_milestone(10000, 10001));
        assert!(is_milestone(9999, 9999 + 50));
        assert!(is_milestone(9990, 10005));
        assert!(!is_milestone(9000, 9999));
    }

    #[test]
    fn test_decrease_is_never_milestone() {
        assert!(!is_milestone(10001, 9000));
        assert!(!is_milestone(10000, 9999));

        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.classify("a/b", 10001, 9000), None);
    }

    #[test]
    fn test_classify_picks_highest_crossed() {
        let mut tracker = MilestoneTracker::new([100, 1000, 10_000]);
        assert_eq!(tracker.classify("a/b", 50, 1500), Some(1000));
        assert_eq!(tracker.announced("a/b"), vec![100, 1000]);
    }

    #[test]
    fn test_classify_does_not_refire_after_dip() {
        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.classify("a/b", 9999, 10000), Some(10_000));
        // 回落后再次越过
        assert_eq!(tracker.classify("a/b", 9998, 10001), None);
        // 其他仓库不受影响
        assert_eq!(tracker.classify("c/d", 9999, 10000), Some(10_000));
    }

    #[test]
    fn test_classify_falls_back_to_unannounced_lower_threshold() {
        let mut tracker = MilestoneTracker::new([100, 1000]);
        assert_eq!(tracker.classify("a/b", 900, 1500), Some(1000));
        // 1000 已宣布，100 还没有
        assert_eq!(tracker.classify("a/b", 50, 1500), Some(100));
        assert_eq!(tracker.classify("a/b", 50, 1500), None);
        assert_eq!(tracker.announced("a/b"), vec![100, 1000]);
    }

    #[test]
    fn test_classify_no_threshold_in_range() {
        let mut tracker = MilestoneTracker::default();
        assert_eq!(tracker.classify("a/b", 120, 125), None);
        assert!(tracker.announced("a/b").is_empty());
    }

    #[test]
    fn test_zero_thresholds_ignored() {
        let tracker = MilestoneTracker::new([0, 500]);
        assert_eq!(tracker.thresholds(), vec![500]);
    }
}
