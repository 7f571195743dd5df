//! 内存存储
//!
//! 用于离线处理 JSON 快照文件，也用于测试：可以注入故障、在读取后模拟外部修改。
//! 事务内的修改先暂存，提交时才写入；未提交即丢弃。

use super::record_store::{
    into_distribution, CategoryCount, GroupUpdate, RecordStore, StoreTransaction,
};
use crate::error::{StoreError, StoreResult};
use crate::models::{AdmissionRecord, Selection};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// 读取之后、更新之前的外部修改
#[derive(Debug, Clone)]
pub enum Tamper {
    /// 记录被删除
    Delete(i64),
    /// 科类被其它写入方修改
    SetCategory(i64, String),
}

/// 故障计划，每项触发一次后自动清除
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// 事务内第 N 次写操作（从 1 开始）失败
    pub fail_on_update: Option<usize>,
    /// 下一次读取失败
    pub fail_select: bool,
    /// 下一次提交失败
    pub fail_commit: bool,
    /// 下一次读取科类分布失败
    pub fail_distribution: bool,
    /// 下一次读取前等待
    pub select_delay: Option<Duration>,
    /// 下一次事务内读取之后施加的外部修改
    pub tamper_after_select: Vec<Tamper>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<i64, AdmissionRecord>,
}

/// 内存中的录取记录表
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Mutex<FaultPlan>>,
    run_lock: Arc<AsyncMutex<()>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = AdmissionRecord>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state();
            for record in records {
                state.records.insert(record.id, record);
            }
        }
        store
    }

    /// 从 JSON 快照文件加载（记录数组）
    pub async fn load_json(path: &Path) -> StoreResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| snapshot_error(path, e))?;
        let records: Vec<AdmissionRecord> =
            serde_json::from_str(&content).map_err(|e| snapshot_error(path, e))?;
        debug!("从 {} 加载 {} 条记录", path.display(), records.len());
        Ok(Self::from_records(records))
    }

    /// 把当前已提交的数据写回 JSON 快照文件
    ///
    /// 先写同目录的临时文件再改名覆盖，中途中断时原快照保持完整。
    pub async fn save_json(&self, path: &Path) -> StoreResult<()> {
        let records = self.records();
        let content =
            serde_json::to_string_pretty(&records).map_err(|e| snapshot_error(path, e))?;

        let tmp_path = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| snapshot_error(&tmp_path, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| snapshot_error(&tmp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| snapshot_error(&tmp_path, e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| snapshot_error(path, e))?;
        debug!("快照已写回 {} ({} 条记录)", path.display(), records.len());
        Ok(())
    }

    /// 设置故障计划
    pub fn inject(&self, plan: FaultPlan) {
        *self.faults.lock().unwrap_or_else(|e| e.into_inner()) = plan;
    }

    /// 已提交数据的副本，按 id 升序
    pub fn records(&self) -> Vec<AdmissionRecord> {
        self.state().records.values().cloned().collect()
    }

    pub fn category_of(&self, id: i64) -> Option<String> {
        self.state()
            .records
            .get(&id)
            .and_then(|r| r.category.clone())
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn before_select(&self) -> StoreResult<()> {
        let (delay, fail) = {
            let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            (
                faults.select_delay.take(),
                std::mem::take(&mut faults.fail_select),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable {
                operation: "select",
                reason: "注入的读取故障".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.run_lock.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            staged: HashMap::new(),
            writes: 0,
            _guard: guard,
        }))
    }

    async fn select(&self, selection: &Selection) -> StoreResult<Vec<AdmissionRecord>> {
        self.before_select().await?;
        Ok(self
            .state()
            .records
            .values()
            .filter(|r| selection.matches(r))
            .cloned()
            .collect())
    }

    async fn category_distribution(&self) -> StoreResult<Vec<CategoryCount>> {
        let fail = {
            let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut faults.fail_distribution)
        };
        if fail {
            return Err(StoreError::Unavailable {
                operation: "category_distribution",
                reason: "注入的分布读取故障".to_string(),
            });
        }
        let mut counts: BTreeMap<Option<String>, i64> = BTreeMap::new();
        for record in self.state().records.values() {
            *counts.entry(record.category.clone()).or_default() += 1;
        }
        Ok(into_distribution(counts))
    }
}

struct MemoryTransaction {
    store: InMemoryStore,
    /// 暂存的科类修改
    staged: HashMap<i64, String>,
    writes: usize,
    _guard: OwnedMutexGuard<()>,
}

impl MemoryTransaction {
    /// 事务视角下的记录科类：暂存优先，其次是已提交数据；记录不存在返回 None
    fn effective_category(&self, record: &AdmissionRecord) -> Option<String> {
        self.staged
            .get(&record.id)
            .cloned()
            .or_else(|| record.category.clone())
    }

    fn check_write_fault(&mut self, operation: &'static str) -> StoreResult<()> {
        self.writes += 1;
        let mut faults = self.store.faults.lock().unwrap_or_else(|e| e.into_inner());
        if faults.fail_on_update == Some(self.writes) {
            faults.fail_on_update = None;
            return Err(StoreError::Unavailable {
                operation,
                reason: format!("注入的第 {} 次写入故障", self.writes),
            });
        }
        Ok(())
    }

    fn apply_tampering(&self) {
        let tampering = {
            let mut faults = self.store.faults.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut faults.tamper_after_select)
        };
        let mut state = self.store.state();
        for tamper in tampering {
            match tamper {
                Tamper::Delete(id) => {
                    state.records.remove(&id);
                }
                Tamper::SetCategory(id, category) => {
                    if let Some(record) = state.records.get_mut(&id) {
                        record.category = Some(category);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn select(&mut self, selection: &Selection) -> StoreResult<Vec<AdmissionRecord>> {
        self.store.before_select().await?;
        let selected: Vec<AdmissionRecord> = {
            let state = self.store.state();
            state
                .records
                .values()
                .filter_map(|r| {
                    let mut view = r.clone();
                    view.category = self.effective_category(r);
                    selection.matches(&view).then_some(view)
                })
                .collect()
        };
        self.apply_tampering();
        Ok(selected)
    }

    async fn update_group(
        &mut self,
        ids: &[i64],
        expected_category: &str,
        new_category: &str,
    ) -> StoreResult<GroupUpdate> {
        self.check_write_fault("update_group")?;

        let matched = {
            let state = self.store.state();
            ids.iter()
                .filter(|id| {
                    state.records.get(*id).is_some_and(|r| {
                        self.effective_category(r).as_deref() == Some(expected_category)
                    })
                })
                .count()
        };
        if matched != ids.len() {
            return Ok(GroupUpdate::Discrepancy {
                expected: ids.len(),
                matched,
            });
        }

        for id in ids {
            self.staged.insert(*id, new_category.to_string());
        }
        Ok(GroupUpdate::Applied(ids.len() as u64))
    }

    async fn fold_aliases(&mut self, legacy: &[String], canonical: &str) -> StoreResult<u64> {
        self.check_write_fault("fold_aliases")?;

        let targets: Vec<i64> = {
            let state = self.store.state();
            state
                .records
                .values()
                .filter(|r| {
                    self.effective_category(r)
                        .is_some_and(|c| legacy.iter().any(|l| *l == c))
                })
                .map(|r| r.id)
                .collect()
        };
        for id in &targets {
            self.staged.insert(*id, canonical.to_string());
        }
        Ok(targets.len() as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        {
            let mut faults = self.store.faults.lock().unwrap_or_else(|e| e.into_inner());
            if std::mem::take(&mut faults.fail_commit) {
                return Err(StoreError::Unavailable {
                    operation: "commit",
                    reason: "注入的提交故障".to_string(),
                });
            }
        }

        let mut state = self.store.state();
        for (id, category) in &self.staged {
            if let Some(record) = state.records.get_mut(id) {
                record.category = Some(category.clone());
            }
        }
        debug!("内存事务提交 {} 条修改", self.staged.len());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        debug!("内存事务回滚，丢弃 {} 条修改", self.staged.len());
        Ok(())
    }
}

fn snapshot_error(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Snapshot {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
