//! 别名折叠 - 流程层
//!
//! 在重分类之后执行：把历史遗留的科类标签统一折叠为标准门类。
//! 每条别名规则一次批量更新，全部规则在同一个事务里完成。
//! 第一次成功后不再有旧标签，第二次执行不会修改任何记录。

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{error, info, warn};

use super::report::{AliasReport, NormalizeReport, RunStatus};
use super::run_ctx::RunCtx;
use super::with_timeout;
use crate::infrastructure::record_store::into_distribution;
use crate::infrastructure::{CategoryCount, RecordStore};
use crate::rules::AliasRule;

/// 别名折叠器
pub struct ConsistencyNormalizer<'a> {
    aliases: &'a [AliasRule],
    store_timeout: Option<Duration>,
}

impl<'a> ConsistencyNormalizer<'a> {
    pub fn new(aliases: &'a [AliasRule]) -> Self {
        Self {
            aliases,
            store_timeout: None,
        }
    }

    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.store_timeout = limit;
        self
    }

    /// 按给定科类分布推算折叠结果，不写入
    ///
    /// 规则依次生效，后面的规则能看到前面规则折叠出的标签。
    pub fn preview(&self, distribution: &[CategoryCount]) -> NormalizeReport {
        self.simulate(distribution).0
    }

    /// 推算折叠结果，同时给出折叠后的分布
    pub fn simulate(&self, distribution: &[CategoryCount]) -> (NormalizeReport, Vec<CategoryCount>) {
        let mut counts: BTreeMap<Option<String>, i64> = BTreeMap::new();
        for c in distribution {
            *counts.entry(c.category.clone()).or_default() += c.count;
        }

        let rules = self
            .aliases
            .iter()
            .map(|rule| {
                let moved: i64 = rule
                    .legacy()
                    .iter()
                    .filter_map(|label| counts.remove(&Some(label.clone())))
                    .sum();
                if moved > 0 {
                    *counts.entry(Some(rule.canonical().to_string())).or_default() += moved;
                }
                alias_report(rule, moved.max(0) as u64)
            })
            .collect();

        let report = NormalizeReport {
            rules,
            status: RunStatus::Preview,
        };
        (report, into_distribution(counts))
    }

    /// 执行折叠
    pub async fn run(&self, store: &dyn RecordStore, ctx: &RunCtx) -> NormalizeReport {
        let mut rules: Vec<AliasReport> = self.aliases.iter().map(|r| alias_report(r, 0)).collect();
        if self.aliases.is_empty() {
            return NormalizeReport {
                rules,
                status: RunStatus::Committed,
            };
        }

        info!("{} 🔧 开始折叠 {} 条别名规则", ctx, self.aliases.len());
        let mut tx = match with_timeout(self.store_timeout, "begin", store.begin()).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("{} ❌ 开启事务失败: {}", ctx, e);
                return NormalizeReport {
                    rules,
                    status: RunStatus::rolled_back(&e),
                };
            }
        };

        for (index, rule) in self.aliases.iter().enumerate() {
            let fold = tx.fold_aliases(rule.legacy(), rule.canonical());
            match with_timeout(self.store_timeout, "fold_aliases", fold).await {
                Ok(n) => {
                    info!("{}   ✓ {}: {} 条", ctx, rule, n);
                    rules[index].updated = n;
                }
                Err(e) => {
                    error!("{}   ❌ {} 折叠失败: {}", ctx, rule, e);
                    if let Err(rb) = with_timeout(self.store_timeout, "rollback", tx.rollback()).await {
                        warn!("{} 回滚调用失败（未提交的修改不会生效）: {}", ctx, rb);
                    }
                    for r in &mut rules {
                        r.updated = 0;
                    }
                    return NormalizeReport {
                        rules,
                        status: RunStatus::rolled_back(&e),
                    };
                }
            }
        }

        let status = match with_timeout(self.store_timeout, "commit", tx.commit()).await {
            Ok(()) => RunStatus::Committed,
            Err(e) => {
                error!("{} ❌ 别名折叠提交失败: {}", ctx, e);
                for r in &mut rules {
                    r.updated = 0;
                }
                RunStatus::rolled_back(&e)
            }
        };

        NormalizeReport { rules, status }
    }
}

fn alias_report(rule: &AliasRule, updated: u64) -> AliasReport {
    AliasReport {
        legacy: rule.legacy().to_vec(),
        canonical: rule.canonical().to_string(),
        updated,
    }
}
