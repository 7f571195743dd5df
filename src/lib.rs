//! # Major Reclassify
//!
//! 把录取数据中"综合"等占位科类的专业，按专业名称关键词归入教育部学科门类，
//! 并把历史遗留的科类标签折叠为标准门类。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有数据库连接，只暴露存储能力
//! - `RecordStore` / `StoreTransaction` - 读取、按组更新、别名折叠、事务
//! - `PgRecordStore` - PostgreSQL；`InMemoryStore` - JSON 快照与测试
//!
//! ### ② 业务能力层（Services）
//! - `Classifier` - 纯函数分类：专业名称 + 规则集 → 学科门类
//! - `ReportWriter` - 写运行报告
//!
//! ### ③ 流程层（Workflow）
//! - `ReclassificationEngine` - 选择 → 分类 → 分组 → 事务内批量更新
//! - `ConsistencyNormalizer` - 别名折叠，必须在重分类之后
//!
//! ### ④ 编排层（Orchestration）
//! - `App` / `Pipeline` - 整轮调度、前后分布、报告落盘
//!
//! 规则（`rules/`）是一轮运行内不可变的静态配置，显式传入分类器和引擎。

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod rules;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{InMemoryStore, PgRecordStore, RecordStore};
pub use models::{AdmissionRecord, Classification, Selection};
pub use orchestrator::{App, Pipeline};
pub use rules::{AliasRule, CategoryRule, RuleBook, RuleSet};
pub use services::{classify, Classifier};
pub use workflow::{ConsistencyNormalizer, ReclassificationEngine, RunCtx, RunStatus};
