//! 运行上下文
//!
//! 封装"这是哪一轮、是否预览"这一信息，用于日志和报告

use chrono::{DateTime, Local};
use std::fmt::Display;

/// 一轮重分类的上下文
#[derive(Debug, Clone)]
pub struct RunCtx {
    /// 运行编号（启动时间）
    pub run_id: String,
    /// 启动时间
    pub started_at: DateTime<Local>,
    /// 预览模式：只分类统计，不写入
    pub dry_run: bool,
}

impl RunCtx {
    pub fn new(dry_run: bool) -> Self {
        let started_at = Local::now();
        Self {
            run_id: started_at.format("%Y%m%d-%H%M%S").to_string(),
            started_at,
            dry_run,
        }
    }
}

impl Display for RunCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dry_run {
            write!(f, "[运行 #{} 预览]", self.run_id)
        } else {
            write!(f, "[运行 #{}]", self.run_id)
        }
    }
}
