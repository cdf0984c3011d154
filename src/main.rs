//! Star Monitor CLI
//!
//! 轮询 GitHub 仓库的 star 数，变动时通过 OpenClaw 推送通知

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use star_monitor::cli::{
    handle_check, handle_rate_limit, handle_run, handle_status, handle_test_notify, ReportArgs,
};
use star_monitor::{MonitorBuilder, MonitorConfig};

#[derive(Parser)]
#[command(name = "star-monitor")]
#[command(about = "Star Monitor - 监控 GitHub 仓库 star 变动并推送通知")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/star-monitor/config.json）
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Dry-run 模式（只打印不发送）
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 常驻运行：预热、启动通知、初始化后按间隔检查
    Run,
    /// 查看每个仓库当前的 star 数
    Status(ReportArgs),
    /// 向所有目标发送测试消息
    TestNotify,
    /// 立即检查所有仓库
    Check(ReportArgs),
    /// 查看 GitHub API 配额
    RateLimit(ReportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志，默认 info 级别，可通过 RUST_LOG 覆盖
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("star_monitor=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let config = MonitorConfig::load(cli.config.as_deref())?;
    let monitor = MonitorBuilder::new(config).dry_run(cli.dry_run).build()?;

    match cli.command {
        Commands::Run => handle_run(Arc::new(monitor)).await?,
        Commands::Status(args) => handle_status(&monitor, args).await?,
        Commands::TestNotify => handle_test_notify(&monitor).await?,
        Commands::Check(args) => handle_check(&monitor, args).await?,
        Commands::RateLimit(args) => handle_rate_limit(&monitor, args).await?,
    }

    Ok(())
}
