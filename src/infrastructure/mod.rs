//! 基础设施层：持有数据库连接等稀缺资源，只暴露存储能力

pub mod memory_store;
pub mod pg_store;
pub mod record_store;

pub use memory_store::{FaultPlan, InMemoryStore, Tamper};
pub use pg_store::PgRecordStore;
pub use record_store::{CategoryCount, GroupUpdate, RecordStore, StoreTransaction};
