//! 报告写入服务 - 业务能力层
//!
//! 只负责"把运行报告写到磁盘"，不关心流程

use crate::error::{AppError, AppResult};
use crate::workflow::RunSummary;
use std::path::PathBuf;
use tracing::debug;

/// 报告写入服务
///
/// 职责：
/// - 把整轮汇总写成 JSON
/// - 把未分类专业样例写成纯文本，便于人工补充关键词
pub struct ReportWriter {
    report_path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: path.into(),
        }
    }

    /// 未分类样例文件：与报告同名，后缀 `.unclassified.txt`
    pub fn samples_path(&self) -> PathBuf {
        self.report_path.with_extension("unclassified.txt")
    }

    /// 写入报告
    pub async fn write(&self, summary: &RunSummary) -> AppResult<()> {
        let json = serde_json::to_string_pretty(summary)?;
        debug!(
            "写入报告: {} ({} 字节)",
            self.report_path.display(),
            json.len()
        );
        tokio::fs::write(&self.report_path, json)
            .await
            .map_err(|e| AppError::file_write_failed(self.report_path.display().to_string(), e))?;

        let samples = &summary.reclassify.unclassified_samples;
        let path = self.samples_path();
        if samples.is_empty() {
            // 上一轮留下的样例文件已不对应本次报告
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("已删除过期的未分类样例: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::file_write_failed(path.display().to_string(), e)),
            }
            return Ok(());
        }

        let mut content = samples.join("\n");
        content.push('\n');
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        Ok(())
    }
}
