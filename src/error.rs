use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 规则集配置错误
    #[error("规则集错误: {0}")]
    RuleSet(#[from] RuleSetError),
    /// 存储访问错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 环境配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 规则集错误（ConfigurationError）
///
/// 在触碰任何记录之前抛出，不可能留下部分修改。
#[derive(Debug, Error)]
pub enum RuleSetError {
    /// 门类标签为空
    #[error("第 {index} 个门类的标签为空")]
    EmptyLabel { index: usize },
    /// 门类标签重复
    #[error("门类标签重复: {label}")]
    DuplicateLabel { label: String },
    /// 门类没有任何关键词
    #[error("门类 {label} 没有配置关键词")]
    EmptyKeywordList { label: String },
    /// 关键词为空或只有空白
    #[error("门类 {label} 的第 {index} 个关键词为空")]
    BlankKeyword { label: String, index: usize },
    /// 关键词两端带空白
    #[error("门类 {label} 的关键词 '{keyword}' 两端含有空白")]
    UntrimmedKeyword { label: String, keyword: String },
    /// 别名规则没有旧标签
    #[error("别名规则 -> {canonical} 没有任何旧标签")]
    EmptyAliasRule { canonical: String },
    /// 别名规则目标标签为空
    #[error("第 {index} 条别名规则的目标标签为空")]
    EmptyCanonical { index: usize },
    /// 别名规则的目标标签会被更早的规则当作旧标签折叠
    #[error("第 {index} 条别名规则的目标标签 {canonical} 已被前面的规则折叠，第二次执行会再次修改记录")]
    AliasReintroduced { index: usize, canonical: String },
    /// 规则文件解析失败
    #[error("规则文件解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 存储错误
///
/// `is_transient()` 为真的错误即 TransientStoreError：整轮回滚，调用方可以原样重试。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 连接失败
    #[error("数据库连接失败: {source}")]
    Connection {
        #[source]
        source: sqlx::Error,
    },
    /// 查询或更新失败
    #[error("{operation} 失败: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    /// 调用超时
    #[error("{operation} 超时 ({after:?})")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    /// 存储不可用（内存存储的故障注入）
    #[error("{operation} 不可用: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },
    /// 快照文件读写失败
    #[error("快照文件 {path} 处理失败: {reason}")]
    Snapshot { path: String, reason: String },
}

impl StoreError {
    /// 是否为可重试的瞬时错误
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connection { .. }
            | StoreError::Timeout { .. }
            | StoreError::Unavailable { .. } => true,
            StoreError::Query { source, .. } => is_transient_sqlx(source),
            StoreError::Snapshot { .. } => false,
        }
    }

    pub fn query(operation: &'static str, source: sqlx::Error) -> Self {
        StoreError::Query { operation, source }
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        // 40001 serialization_failure, 40P01 deadlock_detected
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("40001") | Some("40P01")),
        _ => false,
    }
}

/// 数据完整性错误
///
/// 记录在读取之后、更新之前被删除或被外部修改。只跳过对应门类组，不中止整轮。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("门类 {discipline} 预期更新 {expected} 条，实际仍符合条件 {matched} 条，该组已跳过")]
pub struct DataIntegrityError {
    pub discipline: String,
    pub expected: usize,
    pub matched: usize,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否值得原样重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(e) if e.is_transient())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(source: serde_json::Error) -> Self {
        AppError::File(FileError::Json { source })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 存储层结果类型
pub type StoreResult<T> = Result<T, StoreError>;
