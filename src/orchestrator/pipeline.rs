//! 重分类流水线 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载规则、连接存储
//! 2. **顺序保证**：先重分类，提交后才做别名折叠
//! 3. **前后对比**：记录运行前后的全表科类分布
//! 4. **结果落盘**：写报告；快照存储在提交后写回文件
//!
//! 本层不做任何分类判断，只做调度和统计。

use crate::config::Config;
use crate::infrastructure::{CategoryCount, InMemoryStore, PgRecordStore, RecordStore};
use crate::rules::{load_rule_book, RuleBook};
use crate::services::ReportWriter;
use crate::utils::logging;
use crate::workflow::{
    with_timeout, ConsistencyNormalizer, ReclassificationEngine, RunCtx, RunStatus, RunSummary,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// 一次完整的重分类流程：重分类 → 别名折叠
pub struct Pipeline<'a> {
    book: &'a RuleBook,
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(book: &'a RuleBook, config: &'a Config) -> Self {
        Self { book, config }
    }

    pub async fn run(&self, store: &dyn RecordStore) -> RunSummary {
        let ctx = RunCtx::new(self.config.dry_run);
        let timeout = self.config.store_timeout();

        let distribution_before = distribution(store, timeout, &ctx).await;

        let engine = ReclassificationEngine::new(&self.book.rules, self.config.selection())
            .with_timeout(timeout)
            .with_sample_limit(self.config.unclassified_sample_limit);
        let normalizer = ConsistencyNormalizer::new(&self.book.aliases).with_timeout(timeout);

        if ctx.dry_run {
            let reclassify = engine.preview(store, &ctx).await;
            if reclassify.status.is_rolled_back() {
                return RunSummary {
                    reclassify,
                    normalize: None,
                    distribution_after: None,
                    distribution_before,
                };
            }
            // 读不到分布时只能按计划推算本轮新增的标签
            let projected = reclassify.project(distribution_before.as_deref().unwrap_or_default());
            let (normalize, folded) = normalizer.simulate(&projected);
            return RunSummary {
                reclassify,
                normalize: Some(normalize),
                distribution_after: distribution_before.is_some().then_some(folded),
                distribution_before,
            };
        }

        let reclassify = engine.run(store, &ctx).await;
        let normalize = if reclassify.status.is_committed() {
            Some(normalizer.run(store, &ctx).await)
        } else {
            warn!("{} 重分类未提交，跳过别名折叠", ctx);
            None
        };

        let distribution_after = distribution(store, timeout, &ctx).await;
        RunSummary {
            reclassify,
            normalize,
            distribution_before,
            distribution_after,
        }
    }
}

/// 读取科类分布；失败只记警告，报告中记为 None
async fn distribution(
    store: &dyn RecordStore,
    timeout: Option<Duration>,
    ctx: &RunCtx,
) -> Option<Vec<CategoryCount>> {
    match with_timeout(timeout, "category_distribution", store.category_distribution()).await {
        Ok(counts) => Some(counts),
        Err(e) => {
            warn!("{} 读取科类分布失败: {}", ctx, e);
            None
        }
    }
}

/// 存储句柄
enum StoreHandle {
    Postgres(PgRecordStore),
    Snapshot { store: InMemoryStore, path: PathBuf },
}

impl StoreHandle {
    fn as_store(&self) -> &dyn RecordStore {
        match self {
            StoreHandle::Postgres(store) => store as &dyn RecordStore,
            StoreHandle::Snapshot { store, .. } => store,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    book: RuleBook,
    store: StoreHandle,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let book = load_rule_book(config.rules_file.as_deref().map(Path::new))
            .await
            .context("加载规则失败")?;

        let store = match &config.database_url {
            Some(url) => StoreHandle::Postgres(
                PgRecordStore::connect(url)
                    .await
                    .context("连接数据库失败")?,
            ),
            None => {
                let path = PathBuf::from(&config.snapshot_file);
                info!("\n📁 正在加载快照: {}", path.display());
                let store = InMemoryStore::load_json(&path)
                    .await
                    .context("加载快照文件失败")?;
                StoreHandle::Snapshot { store, path }
            }
        };

        Ok(Self {
            config,
            book,
            store,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let summary = Pipeline::new(&self.book, &self.config)
            .run(self.store.as_store())
            .await;

        logging::log_distribution("运行前科类分布", summary.distribution_before.as_deref());
        logging::log_reclassify_report(&summary.reclassify);
        if let Some(normalize) = &summary.normalize {
            logging::log_normalize_report(normalize);
        }
        let title = if self.config.dry_run {
            "预计运行后科类分布"
        } else {
            "运行后科类分布"
        };
        logging::log_distribution(title, summary.distribution_after.as_deref());

        // 快照存储只在有修改提交后写回
        if let StoreHandle::Snapshot { store, path } = &self.store {
            let committed = summary.reclassify.status.is_committed()
                || summary
                    .normalize
                    .as_ref()
                    .is_some_and(|n| n.status.is_committed());
            if committed {
                store
                    .save_json(path)
                    .await
                    .with_context(|| format!("写回快照失败: {}", path.display()))?;
            }
        }

        let writer = ReportWriter::new(&self.config.report_file);
        writer.write(&summary).await.context("写入报告失败")?;

        logging::print_final_stats(
            &summary.reclassify,
            summary.normalize.as_ref(),
            &self.config.report_file,
        );

        if let Some(RunStatus::RolledBack { reason, retryable }) = summary.failure() {
            anyhow::bail!(
                "本轮已回滚{}: {}",
                if *retryable { "（可直接重试）" } else { "" },
                reason
            );
        }

        Ok(summary)
    }
}
