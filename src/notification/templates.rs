//! 通知卡片模板 - 生成交给渲染器的自包含 HTML
//!
//! 所有外部资源（头像）都以 data URI 内联，渲染时不需要网络。

use super::composer::{group_digits, signed_delta};

/// 变动卡片最多展示的用户数
pub const MAX_CHANGE_ACTORS: usize = 3;

/// 里程碑卡片最多展示的用户数
pub const MAX_MILESTONE_ACTORS: usize = 1;

/// 卡片中的一个用户（头像已内联）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorCard {
    pub username: String,
    /// `data:` URI
    pub avatar: String,
    pub heuristic: bool,
}

const BASE_STYLE: &str = r#"
body { margin: 0; padding: 40px; box-sizing: border-box; min-height: 520px;
       font-family: 'Helvetica Neue', Arial, 'Microsoft YaHei', sans-serif; }
.card { background: #fff; border-radius: 20px; padding: 40px; max-width: 720px; margin: 0 auto;
        box-shadow: 0 20px 60px rgba(0,0,0,0.1); }
.title { font-size: 32px; font-weight: bold; text-align: center; color: #2c3e50; margin-bottom: 30px; }
.repo { font-size: 24px; font-weight: bold; color: #2c3e50; margin-bottom: 10px; }
.users-title { font-size: 20px; font-weight: bold; color: #2c3e50; margin: 30px 0 20px; }
.user { display: flex; align-items: center; gap: 15px; padding: 15px; background: #f8f9fa;
        border-radius: 12px; margin-bottom: 12px; }
.username { font-size: 16px; font-weight: 600; color: #2c3e50; }
.hint { font-size: 13px; color: #7f8c8d; }
"#;

const CHANGE_STYLE: &str = r#"
body { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); }
.summary { background: #f8f9fa; border-radius: 12px; padding: 20px; border-left: 4px solid #667eea; }
.stats { display: flex; gap: 30px; font-size: 20px; color: #2c3e50; }
.delta { font-weight: bold; }
.up { color: #27ae60; }
.down { color: #e74c3c; }
.avatar { width: 50px; height: 50px; border-radius: 50%; border: 3px solid #667eea; object-fit: cover; }
"#;

const MILESTONE_STYLE: &str = r#"
body { background: linear-gradient(135deg, #ff6b6b 0%, #ffd93d 35%, #6bcf7f 65%, #4d79ff 100%); }
.card { text-align: center; }
.title { font-size: 44px; }
.subtitle { font-size: 24px; font-weight: 600; color: #2c3e50; margin-bottom: 30px; }
.milestone { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #fff;
             border-radius: 20px; padding: 30px; margin-bottom: 30px; }
.milestone .repo { color: #fff; font-size: 30px; }
.stars { font-size: 42px; font-weight: bold; }
.user { justify-content: center; background: linear-gradient(135deg, #ffd93d 0%, #ff6b6b 100%); }
.user .username { color: #fff; font-size: 24px; }
.avatar { width: 80px; height: 80px; border-radius: 50%; border: 4px solid #fff; object-fit: cover; }
.footer { font-size: 18px; font-weight: 600; color: #2c3e50; }
"#;

/// HTML 转义
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(style: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>{}{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        BASE_STYLE, style, body
    )
}

fn user_row(actor: &ActorCard, label: &str) -> String {
    format!(
        "<div class=\"user\"><img class=\"avatar\" src=\"{}\" alt=\"avatar\"/><div><div class=\"username\">@{}</div><div class=\"hint\">{}</div></div></div>",
        escape_html(&actor.avatar),
        escape_html(&actor.username),
        label
    )
}

/// 普通变动卡片
pub fn change_card(repo_key: &str, delta: i64, current: u64, actors: &[ActorCard]) -> String {
    let (trend, class) = if delta > 0 { ("📈", "up") } else { ("📉", "down") };
    let action = if delta > 0 { "starred" } else { "unstarred" };

    let mut body = String::new();
    body.push_str("<div class=\"card\">\n<div class=\"title\">🌟 GitHub Star Change</div>\n");
    body.push_str(&format!(
        "<div class=\"summary\"><div class=\"repo\">{}</div><div class=\"stats\"><span class=\"delta {}\">{} {}</span><span>⭐ {} stars</span></div></div>\n",
        escape_html(repo_key),
        class,
        trend,
        signed_delta(delta),
        group_digits(current)
    ));

    let shown = &actors[..actors.len().min(MAX_CHANGE_ACTORS)];
    if !shown.is_empty() {
        let header = if shown.iter().any(|a| a.heuristic) {
            "👤 Possibly caused by"
        } else {
            "👤 Caused by"
        };
        body.push_str(&format!("<div class=\"users-title\">{}</div>\n", header));
        for actor in shown {
            body.push_str(&user_row(actor, action));
            body.push('\n');
        }
    }
    body.push_str("</div>");

    document(CHANGE_STYLE, &body)
}

/// 里程碑庆祝卡片
pub fn milestone_card(
    repo_key: &str,
    current: u64,
    threshold: u64,
    actors: &[ActorCard],
) -> String {
    let mut body = String::new();
    body.push_str("<div class=\"card\">\n<div class=\"title\">🎉 Milestone reached! 🎉</div>\n");
    body.push_str(&format!(
        "<div class=\"subtitle\">{} stars on GitHub</div>\n",
        group_digits(threshold)
    ));
    body.push_str(&format!(
        "<div class=\"milestone\"><div class=\"repo\">🏆 {}</div><div class=\"stars\">⭐ {} Stars</div></div>\n",
        escape_html(repo_key),
        group_digits(current)
    ));
    for actor in actors.iter().take(MAX_MILESTONE_ACTORS) {
        body.push_str(&user_row(actor, "brought the milestone star"));
        body.push('\n');
    }
    body.push_str("<div class=\"footer\">🎈 On to the next milestone! 🚀</div>\n</div>");

    document(MILESTONE_STYLE, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, heuristic: bool) -> ActorCard {
        ActorCard {
            username: name.to_string(),
            avatar: "data:image/png;base64,AAAA".to_string(),
            heuristic,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape_html("owner/name"), "owner/name");
    }

    #[test]
    fn test_change_card_limits_actors() {
        let actors: Vec<_> = ["a1", "a2", "a3", "a4"].iter().map(|n| card(n, false)).collect();
        let html = change_card("o/n", 4, 1234, &actors);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("o/n"));
        assert!(html.contains("+4"));
        assert!(html.contains("1,234 stars"));
        assert!(html.contains("@a3"));
        assert!(!html.contains("@a4"));
        assert_eq!(html.matches("class=\"user\"").count(), 3);
        assert!(html.contains("👤 Caused by"));
    }

    #[test]
    fn test_change_card_decrease_heuristic() {
        let html = change_card("o/n", -1, 99, &[card("ghost", true)]);
        assert!(html.contains("-1"));
        assert!(html.contains("unstarred"));
        assert!(html.contains("Possibly caused by"));
    }

    #[test]
    fn test_change_card_without_actors() {
        let html = change_card("o/n", 2, 10, &[]);
        assert!(!html.contains("users-title\">"));
    }

    #[test]
    fn test_milestone_card_shows_one_actor() {
        let actors = [card("first", false), card("second", false)];
        let html = milestone_card("o/n", 10005, 10000, &actors);
        assert!(html.contains("10,005 Stars"));
        assert!(html.contains("10,000 stars on GitHub"));
        assert!(html.contains("@first"));
        assert!(!html.contains("@second"));
    }

    #[test]
    fn test_username_is_escaped() {
        let html = change_card("o/n", 1, 1, &[card("<script>", false)]);
        assert!(html.contains("@&lt;script&gt;"));
        assert!(!html.contains("@<script>"));
    }
}
