//! 归因 - 尽力找出导致变动的用户

use std::sync::Arc;
use tracing::debug;

use crate::github::{Actor, StarSource, MAX_ATTRIBUTION};
use crate::locator::RepoId;

/// 归因解析器
///
/// 返回空列表表示“未知”，不代表没有用户参与。
pub struct AttributionResolver {
    source: Arc<dyn StarSource>,
}

impl AttributionResolver {
    pub fn new(source: Arc<dyn StarSource>) -> Self {
        Self { source }
    }

    /// 解析一次变动的用户
    ///
    /// - 增长 N：最近新增的 N 个用户（最多 [`MAX_ATTRIBUTION`]）
    /// - 减少：最多一个猜测用户
    pub async fn resolve(&self, repo: &RepoId, delta: i64) -> Vec<Actor> {
        if delta == 0 || !self.source.has_credentials() {
            return Vec::new();
        }

        let (wanted, limit) = if delta > 0 {
            let n = (delta as u64).min(MAX_ATTRIBUTION);
            (n as i64, n as usize)
        } else {
            (-1, 1)
        };

        let mut actors = self.source.fetch_attribution_candidates(repo, wanted).await;
        actors.truncate(limit);
        debug!(repo = %repo, delta, resolved = actors.len(), "Attribution resolved");
        actors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Quota;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockSource {
        credentials: bool,
        actors: Vec<Actor>,
        requests: Mutex<Vec<i64>>,
    }

    impl MockSource {
        fn new(credentials: bool, actors: Vec<Actor>) -> Self {
            Self {
                credentials,
                actors,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StarSource for MockSource {
        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn fetch_count(&self, _repo: &RepoId) -> Option<u64> {
            None
        }

        async fn fetch_quota(&self) -> Option<Quota> {
            None
        }

        async fn fetch_attribution_candidates(&self, _repo: &RepoId, wanted: i64) -> Vec<Actor> {
            self.requests.lock().unwrap().push(wanted);
            self.actors.clone()
        }
    }

    fn actors(names: &[&str]) -> Vec<Actor> {
        names.iter().map(|n| Actor::confirmed(*n, None)).collect()
    }

    #[tokio::test]
    async fn test_increase_requests_delta_actors() {
        let source = Arc::new(MockSource::new(true, actors(&["c", "b", "a"])));
        let resolver = AttributionResolver::new(source.clone());

        let result = resolver.resolve(&RepoId::new("o", "n"), 2).await;
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].username, "c");
        assert_eq!(*source.requests.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_decrease_returns_at_most_one() {
        let source = Arc::new(MockSource::new(true, actors(&["x", "y"])));
        let resolver = AttributionResolver::new(source.clone());

        let result = resolver.resolve(&RepoId::new("o", "n"), -3).await;
        assert_eq!(result.len(), 1);
        assert_eq!(*source.requests.lock().unwrap(), vec![-1]);
    }

    #[tokio::test]
    async fn test_no_credentials_is_empty() {
        let source = Arc::new(MockSource::new(false, actors(&["x"])));
        let resolver = AttributionResolver::new(source.clone());

        assert!(resolver.resolve(&RepoId::new("o", "n"), 5).await.is_empty());
        assert!(resolver.resolve(&RepoId::new("o", "n"), -5).await.is_empty());
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_large_delta_is_capped() {
        let source = Arc::new(MockSource::new(true, Vec::new()));
        let resolver = AttributionResolver::new(source.clone());

        resolver.resolve(&RepoId::new("o", "n"), 5000).await;
        assert_eq!(*source.requests.lock().unwrap(), vec![MAX_ATTRIBUTION as i64]);
    }
}
