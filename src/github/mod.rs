//! GitHub 数据源 - star 计数、配额、归因用户、头像

pub mod client;
pub mod source;
pub mod types;

pub use client::{GitHubClient, API_TIMEOUT_SECS, MAX_ATTRIBUTION, PER_PAGE};
pub use source::{AvatarSource, StarSource};
pub use types::{Actor, Confidence, Quota};
