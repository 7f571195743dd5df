//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App / Pipeline (整轮调度、前后分布、报告)
//!     ↓
//! workflow (ReclassificationEngine → ConsistencyNormalizer)
//!     ↓
//! services (Classifier / ReportWriter)
//!     ↓
//! infrastructure (RecordStore：PostgreSQL / 内存快照)
//! ```
//!
//! ## 设计原则
//!
//! 1. **顺序固定**：别名折叠只在重分类提交后执行
//! 2. **资源隔离**：只有编排层持有存储句柄
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体分类判断

pub mod pipeline;

pub use pipeline::{App, Pipeline};
