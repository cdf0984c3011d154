//! 子命令 - 状态、测试通知、强制检查、配额、常驻运行

use anyhow::{anyhow, Result};
use clap::Args;
use std::sync::Arc;

use super::output::format_output;
use crate::monitor::StarMonitor;
use crate::notification::SendResult;

/// 查询类命令的通用参数
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 处理 status 命令
pub async fn handle_status(monitor: &StarMonitor, args: ReportArgs) -> Result<()> {
    let report = monitor.status_report().await;
    println!("{}", format_output(&report, args.json));
    Ok(())
}

/// 处理 test-notify 命令
pub async fn handle_test_notify(monitor: &StarMonitor) -> Result<()> {
    let results = monitor.send_test_notification().await?;
    let sent = results.iter().filter(|(_, r)| r.is_sent()).count();

    println!("✅ Test message sent to {}/{} destinations", sent, results.len());
    for (destination, result) in &results {
        match result {
            SendResult::Sent => {}
            SendResult::Skipped(reason) => println!("⏭️ {}: {}", destination, reason),
            SendResult::Failed(reason) => println!("❌ {}: {}", destination, reason),
        }
    }
    Ok(())
}

/// 处理 check 命令
pub async fn handle_check(monitor: &StarMonitor, args: ReportArgs) -> Result<()> {
    eprintln!("🔄 Checking all repositories...");
    let outcome = monitor.force_check().await;
    println!("{}", format_output(&outcome, args.json));
    Ok(())
}

/// 处理 rate-limit 命令
pub async fn handle_rate_limit(monitor: &StarMonitor, args: ReportArgs) -> Result<()> {
    let report = monitor
        .quota_report()
        .await
        .ok_or_else(|| anyhow!("Failed to fetch GitHub API rate limit"))?;
    println!("{}", format_output(&report, args.json));
    Ok(())
}

/// 处理 run 命令（不会返回）
pub async fn handle_run(monitor: Arc<StarMonitor>) -> Result<()> {
    let config = monitor.config();
    eprintln!(
        "Star monitor running: {} repositories, {} destinations, every {}s",
        config.repositories.len(),
        config.destinations.len(),
        config.check_interval_secs
    );
    monitor.run().await;
    Ok(())
}
