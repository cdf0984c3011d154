//! HTML 渲染 - 把通知卡片渲染为 PNG
//!
//! 默认实现调用本机的 headless Chromium 截图；找不到浏览器时视为不可用，
//! 通知退回纯文本。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// 渲染超时（秒）
pub const RENDER_TIMEOUT_SECS: u64 = 30;

/// 视口大小
const VIEWPORT_WIDTH: u32 = 800;
const VIEWPORT_HEIGHT: u32 = 720;

/// 按顺序尝试的浏览器命令
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// 渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 临时文件读写失败
    #[error("render I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// 浏览器进程返回失败
    #[error("browser exited with {status}: {stderr}")]
    Browser { status: String, stderr: String },

    /// 超时
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// 没有产出图片
    #[error("renderer produced an empty image")]
    Empty,
}

/// 渲染能力
#[async_trait]
pub trait Renderer: Send + Sync {
    /// 渲染自包含的 HTML 文档，返回图片字节
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// headless Chromium 渲染器
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    browser: PathBuf,
    timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(browser: impl Into<PathBuf>) -> Self {
        Self {
            browser: browser.into(),
            timeout: Duration::from_secs(RENDER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 查找可用浏览器：优先使用显式配置，否则在 PATH 中查找
    pub fn detect(explicit: Option<&str>) -> Option<Self> {
        let found = match explicit {
            Some(path) => which::which(path).ok(),
            None => BROWSER_CANDIDATES
                .iter()
                .find_map(|name| which::which(name).ok()),
        };

        match found {
            Some(path) => {
                info!(browser = %path.display(), "Image renderer available");
                Some(Self::new(path))
            }
            None => {
                info!("No browser found, image notifications disabled");
                None
            }
        }
    }

    pub fn browser(&self) -> &Path {
        &self.browser
    }

    fn args(html_path: &Path, out_path: &Path) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--window-size={},{}", VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            format!("--screenshot={}", out_path.display()),
            format!("file://{}", html_path.display()),
        ]
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        // 目录在函数返回时删除
        let workdir = tempfile::tempdir()?;
        let html_path = workdir.path().join("card.html");
        let out_path = workdir.path().join("card.png");
        tokio::fs::write(&html_path, html).await?;

        let run = Command::new(&self.browser)
            .args(Self::args(&html_path, &out_path))
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(RenderError::Browser {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = match tokio::fs::read(&out_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(RenderError::Empty),
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Err(RenderError::Empty);
        }

        debug!(size = bytes.len(), "Rendered notification image");
        Ok(bytes)
    }
}
