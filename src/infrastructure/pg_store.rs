//! PostgreSQL 存储
//!
//! 只读写 `admission_data` 表的 `category` 列。写事务开启时取事务级 advisory lock，
//! 保证同一张表上同时只有一轮重分类在写。

use super::record_store::{CategoryCount, GroupUpdate, RecordStore, StoreTransaction};
use crate::error::{StoreError, StoreResult};
use crate::models::{AdmissionRecord, Selection};
use async_trait::async_trait;
use serde_json::Map;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info};

/// 重分类运行互斥锁的键
const RUN_LOCK_KEY: i64 = 0x6d61_6a6f_7263;

type RecordRow = (i64, i32, Option<String>, Option<String>, Option<String>);

const SELECT_SQL: &str = "SELECT id::bigint, year, university_name, major, category
     FROM admission_data
     WHERE category = $1 AND ($2::int IS NULL OR year = $2)
     ORDER BY id";

/// PostgreSQL 录取记录存储
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// 连接数据库
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|source| StoreError::Connection { source })?;
        info!("✓ 已连接数据库");
        Ok(Self { pool })
    }
}

fn into_record((id, year, university_name, major, category): RecordRow) -> AdmissionRecord {
    AdmissionRecord {
        id,
        year,
        university_name,
        major,
        category,
        extra: Map::new(),
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| StoreError::Connection { source })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(RUN_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::query("advisory_lock", e))?;
        debug!("已获取重分类运行锁");

        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn select(&self, selection: &Selection) -> StoreResult<Vec<AdmissionRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(SELECT_SQL)
            .bind(&selection.category)
            .bind(selection.year)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("select", e))?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn category_distribution(&self) -> StoreResult<Vec<CategoryCount>> {
        let rows = sqlx::query_as::<_, (Option<String>, i64)>(
            "SELECT category, COUNT(*)
             FROM admission_data
             GROUP BY category
             ORDER BY COUNT(*) DESC, category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("category_distribution", e))?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }
}

struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgStoreTransaction {
    async fn execute(&mut self, operation: &'static str, sql: &'static str) -> StoreResult<()> {
        sqlx::query(sql)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StoreError::query(operation, e))?;
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn select(&mut self, selection: &Selection) -> StoreResult<Vec<AdmissionRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(SELECT_SQL)
            .bind(&selection.category)
            .bind(selection.year)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| StoreError::query("select", e))?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn update_group(
        &mut self,
        ids: &[i64],
        expected_category: &str,
        new_category: &str,
    ) -> StoreResult<GroupUpdate> {
        self.execute("savepoint", "SAVEPOINT reclassify_group").await?;

        let affected = sqlx::query(
            "UPDATE admission_data
             SET category = $1
             WHERE id = ANY($2) AND category = $3",
        )
        .bind(new_category)
        .bind(ids)
        .bind(expected_category)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::query("update_group", e))?
        .rows_affected();

        if affected != ids.len() as u64 {
            self.execute("rollback_to_savepoint", "ROLLBACK TO SAVEPOINT reclassify_group")
                .await?;
            return Ok(GroupUpdate::Discrepancy {
                expected: ids.len(),
                matched: affected as usize,
            });
        }

        self.execute("release_savepoint", "RELEASE SAVEPOINT reclassify_group")
            .await?;
        Ok(GroupUpdate::Applied(affected))
    }

    async fn fold_aliases(&mut self, legacy: &[String], canonical: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE admission_data
             SET category = $1
             WHERE category = ANY($2)",
        )
        .bind(canonical)
        .bind(legacy)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::query("fold_aliases", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::query("commit", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::query("rollback", e))
    }
}
