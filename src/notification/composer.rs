//! 通知组装 - 把变动事件转换为文本或图片
//!
//! 决策顺序：
//!
//! | 里程碑 | 图片可用 | 结果 |
//! |---|---|---|
//! | 是 | 是 | 庆祝图片，渲染失败退回里程碑文本 |
//! | 是 | 否 | 里程碑文本 |
//! | 否 | 是 | 变动图片，渲染失败退回变动文本 |
//! | 否 | 否 | 变动文本 |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::render::Renderer;
use super::templates::{self, ActorCard, MAX_CHANGE_ACTORS, MAX_MILESTONE_ACTORS};
use crate::github::{Actor, AvatarSource};
use crate::locator::RepoId;
use crate::monitor::ChangeEvent;

/// 头像下载失败时使用的占位图
const PLACEHOLDER_AVATAR_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="80" height="80" viewBox="0 0 80 80"><circle cx="40" cy="40" r="40" fill="#dddddd"/><circle cx="40" cy="32" r="13" fill="#999999"/><path d="M16 66c4-13 14-19 24-19s20 6 24 19" fill="#999999"/></svg>"##;

/// 启动通知中最多列出的仓库数
const STARTUP_LIST_LIMIT: usize = 5;

/// 组装路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPath {
    CelebrationImage,
    MilestoneText,
    ChangeImage,
    ChangeText,
}

impl CompositionPath {
    /// 按决策表选择路径
    pub fn select(is_milestone: bool, image_available: bool) -> Self {
        match (is_milestone, image_available) {
            (true, true) => Self::CelebrationImage,
            (true, false) => Self::MilestoneText,
            (false, true) => Self::ChangeImage,
            (false, false) => Self::ChangeText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CelebrationImage => "celebration_image",
            Self::MilestoneText => "milestone_text",
            Self::ChangeImage => "change_image",
            Self::ChangeText => "change_text",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::CelebrationImage | Self::ChangeImage)
    }

    pub fn is_milestone(&self) -> bool {
        matches!(self, Self::CelebrationImage | Self::MilestoneText)
    }

    /// 渲染失败时的文本路径
    pub fn text_fallback(self) -> Self {
        match self {
            Self::CelebrationImage | Self::MilestoneText => Self::MilestoneText,
            Self::ChangeImage | Self::ChangeText => Self::ChangeText,
        }
    }
}

/// 组装好的消息体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationBody {
    Text(String),
    /// PNG 字节
    Image(Vec<u8>),
}

/// 组装结果
#[derive(Debug, Clone)]
pub struct ComposedNotification {
    /// 决策表选中的路径
    pub planned: CompositionPath,
    /// 实际使用的路径（渲染失败时为文本路径）
    pub path: CompositionPath,
    pub body: NotificationBody,
}

impl ComposedNotification {
    pub fn fell_back(&self) -> bool {
        self.planned != self.path
    }
}

/// 通知组装器
pub struct NotificationComposer {
    renderer: Option<Arc<dyn Renderer>>,
    avatars: Arc<dyn AvatarSource>,
    image_enabled: bool,
}

impl NotificationComposer {
    pub fn new(avatars: Arc<dyn AvatarSource>) -> Self {
        Self {
            renderer: None,
            avatars,
            image_enabled: true,
        }
    }

    pub fn with_renderer(mut self, renderer: Option<Arc<dyn Renderer>>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_image_enabled(mut self, enabled: bool) -> Self {
        self.image_enabled = enabled;
        self
    }

    /// 图片通知是否可用：已启用且有渲染器
    pub fn image_available(&self) -> bool {
        self.image_enabled && self.renderer.is_some()
    }

    /// 组装一条通知
    pub async fn compose(&self, event: &ChangeEvent) -> ComposedNotification {
        let planned = CompositionPath::select(event.is_milestone(), self.image_available());

        if planned.is_image() {
            if let Some(png) = self.render_card(planned, event).await {
                return ComposedNotification {
                    planned,
                    path: planned,
                    body: NotificationBody::Image(png),
                };
            }
        }

        ComposedNotification {
            planned,
            path: planned.text_fallback(),
            body: NotificationBody::Text(fallback_text(event)),
        }
    }

    async fn render_card(&self, path: CompositionPath, event: &ChangeEvent) -> Option<Vec<u8>> {
        let renderer = self.renderer.as_ref()?;
        let key = event.key();

        let html = match (path, event.milestone) {
            (CompositionPath::CelebrationImage, Some(threshold)) => {
                // 与文本一致：只有唯一归因用户时才署名
                let credited: &[Actor] = match event.actors.as_slice() {
                    [only] => std::slice::from_ref(only),
                    _ => &[],
                };
                let actors = self.embed_avatars(credited, MAX_MILESTONE_ACTORS).await;
                templates::milestone_card(&key, event.current, threshold, &actors)
            }
            _ => {
                let actors = self.embed_avatars(&event.actors, MAX_CHANGE_ACTORS).await;
                templates::change_card(&key, event.delta, event.current, &actors)
            }
        };

        match renderer.render(&html).await {
            Ok(png) if !png.is_empty() => {
                debug!(repo = %key, size = png.len(), "Notification image rendered");
                Some(png)
            }
            Ok(_) => {
                warn!(repo = %key, "Renderer returned an empty image, falling back to text");
                None
            }
            Err(e) => {
                warn!(repo = %key, error = %e, "Render failed, falling back to text");
                None
            }
        }
    }

    /// 并发下载头像，结果顺序与用户顺序一致
    async fn embed_avatars(&self, actors: &[Actor], limit: usize) -> Vec<ActorCard> {
        let shown = &actors[..actors.len().min(limit)];
        let fetches = shown.iter().map(|actor| async move {
            let avatar = match &actor.avatar_url {
                Some(url) => match self.avatars.fetch_avatar(url).await {
                    Some(bytes) if !bytes.is_empty() => avatar_data_uri(&bytes),
                    _ => {
                        warn!(user = %actor.username, "Avatar unavailable, using placeholder");
                        placeholder_avatar()
                    }
                },
                None => placeholder_avatar(),
            };
            ActorCard {
                username: actor.username.clone(),
                avatar,
                heuristic: actor.is_heuristic(),
            }
        });
        join_all(fetches).await
    }
}

/// 根据文件头判断图片类型
fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}

/// 把图片字节编码为 data URI
pub fn avatar_data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
}

/// 占位头像 data URI
pub fn placeholder_avatar() -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(PLACEHOLDER_AVATAR_SVG)
    )
}

/// 千分位分组：`10005` → `10,005`
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// 带符号的变动值：`+5` / `-3`
pub fn signed_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{}", delta)
    } else {
        delta.to_string()
    }
}

/// 普通变动文本
pub fn change_text(event: &ChangeEvent) -> String {
    let mut text = String::from("🌟 GitHub star change\n\n");
    text.push_str(&format!("📁 Repository: {}\n", event.repo));
    text.push_str(&format!("📊 Change: {}\n", signed_delta(event.delta)));
    text.push_str(&format!("⭐ Current stars: {}\n", event.current));

    if !event.actors.is_empty() {
        let header = if event.actors.iter().any(Actor::is_heuristic) {
            "Possibly caused by"
        } else {
            "Caused by"
        };
        let action = if event.is_increase() { "starred" } else { "unstarred" };
        text.push_str(&format!("\n👤 {}:\n", header));
        for actor in &event.actors {
            text.push_str(&format!("• @{} {}\n", actor.username, action));
        }
    }

    text.push_str(&format!("\n🔗 {}", event.repo.html_url()));
    text
}

/// 事件对应的文本：里程碑文本或普通变动文本
pub fn fallback_text(event: &ChangeEvent) -> String {
    match event.milestone {
        Some(threshold) => milestone_text(event, threshold),
        None => change_text(event),
    }
}

/// 里程碑文本
pub fn milestone_text(event: &ChangeEvent, threshold: u64) -> String {
    let mut text = format!(
        "🎉 Congratulations! {} reached {} stars! 🎉\n\n",
        event.repo,
        group_digits(threshold)
    );
    text.push_str(&format!("🏆 Repository: {}\n", event.repo));
    text.push_str(&format!("⭐ Current stars: {}\n", group_digits(event.current)));
    text.push_str("📈 This is an important milestone!\n");

    if let [actor] = event.actors.as_slice() {
        text.push_str(&format!(
            "\n🌟 @{} reached the milestone, thanks for the support!\n",
            actor.username
        ));
    }

    text.push_str(&format!("\n🔗 {}\n", event.repo.html_url()));
    text.push_str("🎈 On to the next milestone!");
    text
}

/// 启动通知文本
pub fn startup_text(repositories: &[String], interval: Duration) -> String {
    let mut text = String::from("🚀 Star monitor started\n\n");

    if repositories.is_empty() {
        text.push_str("⚠️ No repositories configured\n");
    } else {
        text.push_str(&format!("Monitoring {} repositories:\n", repositories.len()));
        for raw in repositories.iter().take(STARTUP_LIST_LIMIT) {
            if let Some(repo) = RepoId::parse(raw) {
                text.push_str(&format!("• {}\n", repo));
            }
        }
        if repositories.len() > STARTUP_LIST_LIMIT {
            text.push_str(&format!(
                "... and {} more\n",
                repositories.len() - STARTUP_LIST_LIMIT
            ));
        }
    }

    text.push_str(&format!("\nCheck interval: {} seconds", interval.as_secs()));
    text
}

/// 测试通知文本
pub fn test_text(now: DateTime<Local>) -> String {
    format!(
        "🧪 This is a test message\n\nIf you received it, star monitor notifications are working.\nSent at: {}",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::render::RenderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockAvatars {
        fail_for: Option<String>,
        delays: Vec<(String, u64)>,
    }

    #[async_trait]
    impl AvatarSource for MockAvatars {
        async fn fetch_avatar(&self, url: &str) -> Option<Vec<u8>> {
            if let Some((_, ms)) = self.delays.iter().find(|(u, _)| u == url) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.fail_for.as_deref() == Some(url) {
                return None;
            }
            Some(b"\x89PNG avatar".to_vec())
        }
    }

    struct MockRenderer {
        fail: bool,
        calls: AtomicUsize,
        html: Mutex<Vec<String>>,
    }

    impl MockRenderer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
                html: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Renderer for MockRenderer {
        async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html.lock().unwrap().push(html.to_string());
            if self.fail {
                Err(RenderError::Empty)
            } else {
                Ok(b"\x89PNG card".to_vec())
            }
        }
    }

    fn avatars() -> Arc<MockAvatars> {
        Arc::new(MockAvatars {
            fail_for: None,
            delays: Vec::new(),
        })
    }

    fn event(
        previous: u64,
        current: u64,
        milestone: Option<u64>,
        actors: Vec<Actor>,
    ) -> ChangeEvent {
        ChangeEvent {
            repo: RepoId::new("octo", "repo"),
            previous,
            current,
            delta: current as i64 - previous as i64,
            milestone,
            actors,
        }
    }

    fn actor(name: &str) -> Actor {
        Actor::confirmed(name, Some(format!("https://avatars.example/{}", name)))
    }

    #[test]
    fn test_select_path_table() {
        assert_eq!(CompositionPath::select(true, true), CompositionPath::CelebrationImage);
        assert_eq!(CompositionPath::select(true, false), CompositionPath::MilestoneText);
        assert_eq!(CompositionPath::select(false, true), CompositionPath::ChangeImage);
        assert_eq!(CompositionPath::select(false, false), CompositionPath::ChangeText);
        assert_eq!(
            CompositionPath::CelebrationImage.text_fallback(),
            CompositionPath::MilestoneText
        );
        assert_eq!(CompositionPath::ChangeImage.text_fallback(), CompositionPath::ChangeText);
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(10005), "10,005");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(signed_delta(5), "+5");
        assert_eq!(signed_delta(-3), "-3");
    }

    #[test]
    fn test_change_text_with_actors() {
        let text = change_text(&event(120, 125, None, vec![actor("alice"), actor("bob")]));
        assert!(text.starts_with("🌟 GitHub star change"));
        assert!(text.contains("octo/repo"));
        assert!(text.contains("+5"));
        assert!(text.contains("125"));
        assert!(text.contains("👤 Caused by:"));
        assert!(text.contains("• @alice starred\n• @bob starred"));
        assert!(text.ends_with("🔗 https://github.com/octo/repo"));
    }

    #[test]
    fn test_change_text_decrease_heuristic() {
        let ghost = Actor::heuristic("ghost", None);
        let text = change_text(&event(10, 9, None, vec![ghost]));
        assert!(text.contains("-1"));
        assert!(text.contains("Possibly caused by"));
        assert!(text.contains("• @ghost unstarred"));
    }

    #[test]
    fn test_change_text_without_actors() {
        let text = change_text(&event(10, 12, None, Vec::new()));
        assert!(!text.contains("👤"));
        assert!(!text.contains('@'));
    }

    #[test]
    fn test_milestone_text() {
        let text = milestone_text(&event(9990, 10005, Some(10000), vec![actor("winner")]), 10000);
        assert!(text.contains("10,005"));
        assert!(text.contains("reached 10,000 stars"));
        assert!(text.contains("@winner reached the milestone"));

        // 多个用户时不确定是谁带来的里程碑
        let text = milestone_text(
            &event(9990, 10005, Some(10000), vec![actor("a"), actor("b")]),
            10000,
        );
        assert!(!text.contains("reached the milestone"));
    }

    #[test]
    fn test_startup_text() {
        let repos: Vec<String> = (1..=7).map(|i| format!("owner/repo{}", i)).collect();
        let text = startup_text(&repos, Duration::from_secs(60));
        assert!(text.contains("Monitoring 7 repositories"));
        assert!(text.contains("• owner/repo5"));
        assert!(!text.contains("• owner/repo6"));
        assert!(text.contains("... and 2 more"));
        assert!(text.ends_with("Check interval: 60 seconds"));

        let text = startup_text(&[], Duration::from_secs(30));
        assert!(text.contains("No repositories configured"));
    }

    #[test]
    fn test_avatar_data_uri() {
        assert!(avatar_data_uri(b"\x89PNG....").starts_with("data:image/png;base64,"));
        assert!(avatar_data_uri(&[0xFF, 0xD8, 0xFF]).starts_with("data:image/jpeg;base64,"));
        assert!(placeholder_avatar().starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn test_compose_text_without_renderer() {
        let composer = NotificationComposer::new(avatars());
        assert!(!composer.image_available());

        let composed = composer.compose(&event(120, 125, None, Vec::new())).await;
        assert_eq!(composed.path, CompositionPath::ChangeText);
        assert!(!composed.fell_back());
        assert!(matches!(composed.body, NotificationBody::Text(ref t) if t.contains("+5")));
    }

    #[tokio::test]
    async fn test_compose_image_when_available() {
        let renderer = Arc::new(MockRenderer::new(false));
        let composer = NotificationComposer::new(avatars())
            .with_renderer(Some(renderer.clone() as Arc<dyn Renderer>));

        let composed = composer.compose(&event(120, 125, None, vec![actor("alice")])).await;
        assert_eq!(composed.path, CompositionPath::ChangeImage);
        assert_eq!(composed.body, NotificationBody::Image(b"\x89PNG card".to_vec()));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compose_image_disabled() {
        let renderer = Arc::new(MockRenderer::new(false));
        let composer = NotificationComposer::new(avatars())
            .with_renderer(Some(renderer.clone() as Arc<dyn Renderer>))
            .with_image_enabled(false);

        let composed = composer.compose(&event(9990, 10005, Some(10000), Vec::new())).await;
        assert_eq!(composed.path, CompositionPath::MilestoneText);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_render_failure_falls_back_to_text() {
        let renderer = Arc::new(MockRenderer::new(true));
        let composer = NotificationComposer::new(avatars())
            .with_renderer(Some(renderer as Arc<dyn Renderer>));

        let ev = event(9990, 10005, Some(10000), vec![actor("winner")]);
        let composed = composer.compose(&ev).await;
        assert_eq!(composed.planned, CompositionPath::CelebrationImage);
        assert_eq!(composed.path, CompositionPath::MilestoneText);
        assert!(composed.fell_back());
        assert_eq!(composed.body, NotificationBody::Text(milestone_text(&ev, 10000)));
    }

    #[tokio::test]
    async fn test_avatar_failure_uses_placeholder_and_keeps_order() {
        let avatars = Arc::new(MockAvatars {
            fail_for: Some("https://avatars.example/b".to_string()),
            delays: vec![("https://avatars.example/a".to_string(), 30)],
        });
        let composer = NotificationComposer::new(avatars);

        let cards = composer
            .embed_avatars(&[actor("a"), actor("b"), actor("c"), actor("d")], MAX_CHANGE_ACTORS)
            .await;
        let names: Vec<_> = cards.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(cards[0].avatar.starts_with("data:image/png;base64,"));
        assert_eq!(cards[1].avatar, placeholder_avatar());
    }

    #[tokio::test]
    async fn test_celebration_card_credits_same_users_as_text() {
        let renderer = Arc::new(MockRenderer::new(false));
        let composer = NotificationComposer::new(avatars())
            .with_renderer(Some(renderer.clone() as Arc<dyn Renderer>));

        // 多个归因用户：图片和文本都不署名
        let crowded = event(9990, 10005, Some(10000), vec![actor("newest"), actor("older")]);
        composer.compose(&crowded).await;
        let html = renderer.html.lock().unwrap()[0].clone();
        let text = milestone_text(&crowded, 10000);
        for name in ["@newest", "@older"] {
            assert_eq!(html.contains(name), text.contains(name), "{}", name);
            assert!(!html.contains(name));
        }

        // 唯一归因用户：两者都署名
        let single = event(9999, 10000, Some(10000), vec![actor("winner")]);
        composer.compose(&single).await;
        let html = renderer.html.lock().unwrap()[1].clone();
        assert!(html.contains("@winner"));
        assert!(milestone_text(&single, 10000).contains("@winner"));
    }
}
