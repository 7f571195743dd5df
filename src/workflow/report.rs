//! 运行报告
//!
//! 无论提交、回滚还是预览，报告都会生成，反映本轮实际计算出的结果。

use crate::error::{DataIntegrityError, StoreError};
use crate::infrastructure::record_store::into_distribution;
use crate::infrastructure::CategoryCount;
use crate::models::Selection;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;

/// 整轮的结束状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// 已提交
    Committed,
    /// 预览，未写入
    Preview,
    /// 已回滚，没有任何修改生效
    RolledBack { reason: String, retryable: bool },
}

impl RunStatus {
    pub(crate) fn rolled_back(err: &StoreError) -> Self {
        RunStatus::RolledBack {
            reason: err.to_string(),
            retryable: err.is_transient(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, RunStatus::Committed)
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, RunStatus::RolledBack { .. })
    }
}

/// 单个门类组的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GroupStatus {
    /// 未执行（预览，或前面的组失败）
    NotAttempted,
    /// 已写入并随整轮提交
    Applied,
    /// 记录在读取后被修改，本组跳过
    Discrepancy(DataIntegrityError),
    /// 写入出错，整轮回滚
    Failed,
    /// 写入成功但随整轮回滚
    RolledBack,
}

/// 单个门类组的统计
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub discipline: String,
    /// 分类结果为该门类的记录数
    pub planned: usize,
    /// 实际生效的更新数
    pub updated: u64,
    pub status: GroupStatus,
}

/// 重分类报告
#[derive(Debug, Clone, Serialize)]
pub struct ReclassifyReport {
    pub run_id: String,
    pub selection: Selection,
    /// 被选中的记录数
    pub eligible: usize,
    /// 按规则集声明顺序排列的门类组
    pub groups: Vec<GroupReport>,
    /// 未能分类、保持原科类的记录数
    pub unclassified: usize,
    /// 未分类专业样例（去重）
    pub unclassified_samples: Vec<String>,
    pub status: RunStatus,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl ReclassifyReport {
    pub fn updated_total(&self) -> u64 {
        self.groups.iter().map(|g| g.updated).sum()
    }

    pub fn discrepancies(&self) -> impl Iterator<Item = &DataIntegrityError> {
        self.groups.iter().filter_map(|g| match &g.status {
            GroupStatus::Discrepancy(e) => Some(e),
            _ => None,
        })
    }

    /// 按计划推算重分类后的分布：各组从占位科类移到目标门类
    pub fn project(&self, distribution: &[CategoryCount]) -> Vec<CategoryCount> {
        let mut counts: BTreeMap<Option<String>, i64> = BTreeMap::new();
        for c in distribution {
            *counts.entry(c.category.clone()).or_default() += c.count;
        }
        for group in &self.groups {
            let planned = group.planned as i64;
            *counts
                .entry(Some(self.selection.category.clone()))
                .or_default() -= planned;
            *counts.entry(Some(group.discipline.clone())).or_default() += planned;
        }
        into_distribution(counts)
    }

    pub fn group(&self, discipline: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.discipline == discipline)
    }
}

/// 单条别名规则的统计
#[derive(Debug, Clone, Serialize)]
pub struct AliasReport {
    pub legacy: Vec<String>,
    pub canonical: String,
    pub updated: u64,
}

/// 别名折叠报告
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeReport {
    pub rules: Vec<AliasReport>,
    pub status: RunStatus,
}

impl NormalizeReport {
    pub fn updated_total(&self) -> u64 {
        self.rules.iter().map(|r| r.updated).sum()
    }
}

/// 一次完整运行的汇总（重分类 + 别名折叠 + 前后分布）
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub reclassify: ReclassifyReport,
    /// 重分类回滚时不执行折叠
    pub normalize: Option<NormalizeReport>,
    /// 读取失败时为空（None），与空表区分
    pub distribution_before: Option<Vec<CategoryCount>>,
    pub distribution_after: Option<Vec<CategoryCount>>,
}

impl RunSummary {
    /// 整轮是否失败
    pub fn failure(&self) -> Option<&RunStatus> {
        if self.reclassify.status.is_rolled_back() {
            return Some(&self.reclassify.status);
        }
        self.normalize
            .as_ref()
            .map(|n| &n.status)
            .filter(|s| s.is_rolled_back())
    }
}
