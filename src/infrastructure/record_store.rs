//! 录取记录存储接口 - 基础设施层
//!
//! 引擎只通过这里的能力访问持久化存储：按条件读取、按组批量改科类、
//! 折叠别名、开启/提交/回滚事务。除 `category` 外不写任何列。

use crate::error::StoreResult;
use crate::models::{AdmissionRecord, Selection};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// 单个门类组的更新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupUpdate {
    /// 全部更新（尚未提交）
    Applied(u64),
    /// 部分记录已被删除或被外部修改，本组未做任何修改
    Discrepancy { expected: usize, matched: usize },
}

/// 科类分布中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Option<String>,
    pub count: i64,
}

/// 录取记录存储
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 开启一个写事务
    ///
    /// 同一存储上同一时刻最多只有一个写事务，其余调用等待。
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// 事务外只读查询（预览模式使用）
    async fn select(&self, selection: &Selection) -> StoreResult<Vec<AdmissionRecord>>;

    /// 全表科类分布，按数量降序、标签升序
    async fn category_distribution(&self) -> StoreResult<Vec<CategoryCount>>;
}

/// 存储事务
///
/// 丢弃而未提交的事务等同于回滚。
#[async_trait]
pub trait StoreTransaction: Send {
    /// 读取符合条件的记录，按 id 升序
    async fn select(&mut self, selection: &Selection) -> StoreResult<Vec<AdmissionRecord>>;

    /// 把 `ids` 中科类仍为 `expected_category` 的记录改为 `new_category`
    ///
    /// 仍符合条件的数量与 `ids.len()` 不一致时整组撤销并返回 `Discrepancy`。
    async fn update_group(
        &mut self,
        ids: &[i64],
        expected_category: &str,
        new_category: &str,
    ) -> StoreResult<GroupUpdate>;

    /// 把科类属于 `legacy` 的记录全部改为 `canonical`，返回影响行数
    async fn fold_aliases(&mut self, legacy: &[String], canonical: &str) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// 把查询结果整理成稳定的分布顺序
pub(crate) fn sort_distribution(counts: &mut [CategoryCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
}

/// 由标签计数得到分布：去掉空桶，按稳定顺序排列
pub(crate) fn into_distribution(counts: BTreeMap<Option<String>, i64>) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    sort_distribution(&mut counts);
    counts
}
