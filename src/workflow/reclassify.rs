//! 重分类引擎 - 流程层
//!
//! 流程顺序：
//! 1. 开启事务，读取所有符合选择条件的记录
//! 2. 逐条调用分类器，按门类分组，未分类的记录不修改
//! 3. 每个非空门类组发出一次批量更新
//! 4. 全部成功则提交；任一组出错则整轮回滚
//!
//! 某组记录在读取后被删除或被外部修改时，只跳过该组并记入报告，不中止整轮。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, error, info, warn};

use super::report::{GroupReport, GroupStatus, ReclassifyReport, RunStatus};
use super::run_ctx::RunCtx;
use super::with_timeout;
use crate::error::{DataIntegrityError, StoreError};
use crate::infrastructure::{GroupUpdate, RecordStore, StoreTransaction};
use crate::models::{AdmissionRecord, Classification, Selection};
use crate::rules::RuleSet;
use crate::services::Classifier;

/// 默认保留的未分类专业样例数
const DEFAULT_SAMPLE_LIMIT: usize = 20;

/// 一个门类组：门类标签 + 记录 id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    pub discipline: String,
    pub ids: Vec<i64>,
}

/// 分类计划（纯计算结果，不含任何写入）
#[derive(Debug, Clone, Default)]
pub struct ReclassifyPlan {
    pub eligible: usize,
    /// 按规则集声明顺序排列，只含非空组
    pub groups: Vec<PlannedGroup>,
    pub unclassified: usize,
    pub unclassified_samples: Vec<String>,
}

/// 重分类引擎
pub struct ReclassificationEngine<'r> {
    rules: &'r RuleSet,
    selection: Selection,
    store_timeout: Option<Duration>,
    sample_limit: usize,
}

impl<'r> ReclassificationEngine<'r> {
    pub fn new(rules: &'r RuleSet, selection: Selection) -> Self {
        Self {
            rules,
            selection,
            store_timeout: None,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    /// 单次存储调用超时
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.store_timeout = limit;
        self
    }

    /// 报告中保留的未分类专业样例数
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// 对一批记录分类并按门类分组
    pub fn plan(&self, records: &[AdmissionRecord]) -> ReclassifyPlan {
        let classifier = Classifier::new(self.rules);
        let mut by_discipline: HashMap<String, Vec<i64>> = HashMap::new();
        let mut plan = ReclassifyPlan {
            eligible: records.len(),
            ..Default::default()
        };
        let mut seen_samples = HashSet::new();

        for record in records {
            let result = classifier.classify_record(record);
            match result.outcome {
                Classification::Discipline(label) => {
                    by_discipline.entry(label).or_default().push(result.record_id);
                }
                Classification::Unclassified => {
                    plan.unclassified += 1;
                    if plan.unclassified_samples.len() < self.sample_limit
                        && seen_samples.insert(result.major.clone())
                    {
                        plan.unclassified_samples.push(result.major);
                    }
                }
            }
        }

        for label in self.rules.labels() {
            if let Some(ids) = by_discipline.remove(label) {
                plan.groups.push(PlannedGroup {
                    discipline: label.to_string(),
                    ids,
                });
            }
        }

        plan
    }

    /// 预览：只读取和分类，不开启写事务
    pub async fn preview(&self, store: &dyn RecordStore, ctx: &RunCtx) -> ReclassifyReport {
        info!("{} 🔍 预览模式，选择条件: {}", ctx, self.selection);
        match with_timeout(self.store_timeout, "select", store.select(&self.selection)).await {
            Ok(records) => {
                let plan = self.plan(&records);
                let groups = plan
                    .groups
                    .iter()
                    .map(|g| pending_group(g, GroupStatus::NotAttempted))
                    .collect();
                self.report(ctx, plan, groups, RunStatus::Preview)
            }
            Err(e) => {
                error!("{} ❌ 读取待分类记录失败: {}", ctx, e);
                self.report(ctx, ReclassifyPlan::default(), Vec::new(), RunStatus::rolled_back(&e))
            }
        }
    }

    /// 执行一轮重分类
    ///
    /// 总是返回报告；失败时报告状态为回滚，且存储中没有本轮的任何修改。
    pub async fn run(&self, store: &dyn RecordStore, ctx: &RunCtx) -> ReclassifyReport {
        info!("{} 🚀 开始重分类，选择条件: {}", ctx, self.selection);

        let mut tx = match with_timeout(self.store_timeout, "begin", store.begin()).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("{} ❌ 开启事务失败: {}", ctx, e);
                return self.report(
                    ctx,
                    ReclassifyPlan::default(),
                    Vec::new(),
                    RunStatus::rolled_back(&e),
                );
            }
        };

        let records =
            match with_timeout(self.store_timeout, "select", tx.select(&self.selection)).await {
                Ok(records) => records,
                Err(e) => {
                    error!("{} ❌ 读取待分类记录失败: {}", ctx, e);
                    self.rollback(tx, ctx).await;
                    return self.report(
                        ctx,
                        ReclassifyPlan::default(),
                        Vec::new(),
                        RunStatus::rolled_back(&e),
                    );
                }
            };

        info!("{} ✓ 找到 {} 条待分类记录", ctx, records.len());
        let plan = self.plan(&records);
        info!(
            "{} 📋 可分类 {} 组，未分类 {} 条",
            ctx,
            plan.groups.len(),
            plan.unclassified
        );

        let (mut groups, failure) = self.apply_groups(&mut *tx, &plan, ctx).await;

        let status = match failure {
            Some(e) => {
                self.rollback(tx, ctx).await;
                RunStatus::rolled_back(&e)
            }
            None => match with_timeout(self.store_timeout, "commit", tx.commit()).await {
                Ok(()) => {
                    info!("{} ✓ 事务已提交", ctx);
                    RunStatus::Committed
                }
                Err(e) => {
                    error!("{} ❌ 提交失败，本轮修改全部撤销: {}", ctx, e);
                    RunStatus::rolled_back(&e)
                }
            },
        };

        if status.is_rolled_back() {
            for group in &mut groups {
                if group.status == GroupStatus::Applied {
                    group.status = GroupStatus::RolledBack;
                    group.updated = 0;
                }
            }
        }

        self.report(ctx, plan, groups, status)
    }

    /// 逐组写入；遇到存储错误立即停止，返回该错误
    async fn apply_groups(
        &self,
        tx: &mut dyn StoreTransaction,
        plan: &ReclassifyPlan,
        ctx: &RunCtx,
    ) -> (Vec<GroupReport>, Option<StoreError>) {
        let mut groups: Vec<GroupReport> = plan
            .groups
            .iter()
            .map(|g| pending_group(g, GroupStatus::NotAttempted))
            .collect();

        for (planned, group) in plan.groups.iter().zip(groups.iter_mut()) {
            let update = tx.update_group(&planned.ids, &self.selection.category, &planned.discipline);
            match with_timeout(self.store_timeout, "update_group", update).await {
                Ok(GroupUpdate::Applied(n)) => {
                    info!("{}   ✓ {}: {} 条", ctx, planned.discipline, n);
                    group.updated = n;
                    group.status = GroupStatus::Applied;
                }
                Ok(GroupUpdate::Discrepancy { expected, matched }) => {
                    let err = DataIntegrityError {
                        discipline: planned.discipline.clone(),
                        expected,
                        matched,
                    };
                    warn!("{}   ⚠️ {}", ctx, err);
                    group.status = GroupStatus::Discrepancy(err);
                }
                Err(e) => {
                    error!("{}   ❌ {} 更新失败: {}", ctx, planned.discipline, e);
                    group.status = GroupStatus::Failed;
                    return (groups, Some(e));
                }
            }
        }

        (groups, None)
    }

    async fn rollback(&self, tx: Box<dyn StoreTransaction>, ctx: &RunCtx) {
        match with_timeout(self.store_timeout, "rollback", tx.rollback()).await {
            Ok(()) => warn!("{} ↩️ 事务已回滚，本轮没有任何修改生效", ctx),
            // 连接断开时服务端会自行回滚未提交的事务
            Err(e) => warn!("{} 回滚调用失败（未提交的修改不会生效）: {}", ctx, e),
        }
    }

    fn report(
        &self,
        ctx: &RunCtx,
        plan: ReclassifyPlan,
        groups: Vec<GroupReport>,
        status: RunStatus,
    ) -> ReclassifyReport {
        debug!("{} 生成报告: {:?}", ctx, status);
        ReclassifyReport {
            run_id: ctx.run_id.clone(),
            selection: self.selection.clone(),
            eligible: plan.eligible,
            groups,
            unclassified: plan.unclassified,
            unclassified_samples: plan.unclassified_samples,
            status,
            started_at: ctx.started_at,
            finished_at: Local::now(),
        }
    }
}

fn pending_group(planned: &PlannedGroup, status: GroupStatus) -> GroupReport {
    GroupReport {
        discipline: planned.discipline.clone(),
        planned: planned.ids.len(),
        updated: 0,
        status,
    }
}
