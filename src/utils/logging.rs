//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use crate::config::Config;
use crate::infrastructure::CategoryCount;
use crate::workflow::{GroupStatus, NormalizeReport, ReclassifyReport, RunStatus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 设置了 `RUST_LOG` 时以其为准，否则按 `verbose` 选择 debug 或 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 专业学科门类重分类");
    info!(
        "💾 存储: {}",
        if config.database_url.is_some() {
            "PostgreSQL"
        } else {
            config.snapshot_file.as_str()
        }
    );
    info!(
        "📐 规则: {}",
        config.rules_file.as_deref().unwrap_or("内置 12 学科门类")
    );
    info!("🎯 选择条件: {}", config.selection());
    if config.dry_run {
        info!("👀 预览模式：不写入任何修改");
    }
    info!("{}", "=".repeat(60));
}

/// 打印科类分布
pub fn log_distribution(title: &str, counts: Option<&[CategoryCount]>) {
    info!("\n【{}】", title);
    let Some(counts) = counts else {
        warn!("  科类分布读取失败");
        return;
    };
    for c in counts {
        info!(
            "  {}: {} 条",
            c.category.as_deref().unwrap_or("<空>"),
            c.count
        );
    }
}

/// 打印重分类结果
pub fn log_reclassify_report(report: &ReclassifyReport) {
    info!("\n{}", "─".repeat(60));
    info!("📦 重分类: 选中 {} 条", report.eligible);
    for group in &report.groups {
        let state = match &group.status {
            GroupStatus::Applied => "已更新",
            GroupStatus::NotAttempted => "未执行",
            GroupStatus::Discrepancy(_) => "已跳过（数据不一致）",
            GroupStatus::Failed => "失败",
            GroupStatus::RolledBack => "已回滚",
        };
        info!(
            "  {}: 计划 {} 条, 生效 {} 条 [{}]",
            group.discipline, group.planned, group.updated, state
        );
    }
    info!("  未分类: {} 条（保持原科类）", report.unclassified);

    if !report.unclassified_samples.is_empty() {
        info!("\n未分类专业示例（需人工判断）:");
        for major in &report.unclassified_samples {
            info!("  - {}", truncate_text(major, 40));
        }
    }
    for discrepancy in report.discrepancies() {
        warn!("⚠️ {}", discrepancy);
    }
    info!("{}", "─".repeat(60));
}

/// 打印别名折叠结果
pub fn log_normalize_report(report: &NormalizeReport) {
    info!("\n🔧 别名折叠:");
    for rule in &report.rules {
        info!(
            "  {} -> {}: {} 条",
            rule.legacy.join(" / "),
            rule.canonical,
            rule.updated
        );
    }
}

/// 打印最终统计信息
pub fn print_final_stats(reclassify: &ReclassifyReport, normalize: Option<&NormalizeReport>, report_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        reclassify.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("状态: {}", describe_status(&reclassify.status));
    info!("✅ 重分类生效: {} 条", reclassify.updated_total());
    info!("❔ 未分类: {} 条", reclassify.unclassified);
    match normalize {
        Some(n) => info!("🔧 别名折叠: {} 条 ({})", n.updated_total(), describe_status(&n.status)),
        None => info!("🔧 别名折叠: 未执行"),
    }
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_path);
}

fn describe_status(status: &RunStatus) -> String {
    match status {
        RunStatus::Committed => "已提交".to_string(),
        RunStatus::Preview => "预览（未写入）".to_string(),
        RunStatus::RolledBack { reason, retryable } => format!(
            "已回滚{}: {}",
            if *retryable { "（可重试）" } else { "" },
            reason
        ),
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
