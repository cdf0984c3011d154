//! 数据源 trait - 轮询循环依赖的外部只读能力

use async_trait::async_trait;

use super::types::{Actor, Quota};
use crate::locator::RepoId;

/// star 计数数据源
///
/// 所有失败（超时、认证、限流、404、其他状态码）都在实现内部记录日志，
/// 对调用方统一表现为 `None` / 空列表。
#[async_trait]
pub trait StarSource: Send + Sync {
    /// 是否配置了凭证（归因查询需要）
    fn has_credentials(&self) -> bool;

    /// 获取当前 star 数
    async fn fetch_count(&self, repo: &RepoId) -> Option<u64>;

    /// 获取 API 配额
    async fn fetch_quota(&self) -> Option<Quota>;

    /// 获取归因候选用户
    ///
    /// - `wanted > 0`：最近新增的 `wanted` 个用户，最新在前
    /// - `wanted <= 0`：活动流中的最多一个猜测用户
    /// - 无凭证：空列表
    async fn fetch_attribution_candidates(&self, repo: &RepoId, wanted: i64) -> Vec<Actor>;
}

/// 头像数据源
#[async_trait]
pub trait AvatarSource: Send + Sync {
    /// 下载头像原始字节，失败返回 `None`
    async fn fetch_avatar(&self, url: &str) -> Option<Vec<u8>>;
}
