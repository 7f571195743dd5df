//! 流程层：一轮重分类与别名折叠的完整过程

pub mod normalize;
pub mod reclassify;
pub mod report;
pub mod run_ctx;

pub use normalize::ConsistencyNormalizer;
pub use reclassify::{ReclassificationEngine, ReclassifyPlan};
pub use report::{
    AliasReport, GroupReport, GroupStatus, NormalizeReport, ReclassifyReport, RunStatus,
    RunSummary,
};
pub use run_ctx::RunCtx;

use crate::error::{StoreError, StoreResult};
use std::future::Future;
use std::time::Duration;

/// 给一次存储调用加上超时，超时按瞬时错误处理
pub(crate) async fn with_timeout<T, F>(
    limit: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match limit {
        None => fut.await,
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| StoreError::Timeout { operation, after })?,
    }
}
