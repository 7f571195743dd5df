//! 分类结果

use serde::Serialize;

/// 单个专业名称的分类结果
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "discipline", rename_all = "snake_case")]
pub enum Classification {
    /// 命中某个学科门类
    Discipline(String),
    /// 没有任何关键词命中
    Unclassified,
}

impl Classification {
    pub fn discipline(&self) -> Option<&str> {
        match self {
            Classification::Discipline(label) => Some(label),
            Classification::Unclassified => None,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Classification::Unclassified)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Discipline(label) => write!(f, "{}", label),
            Classification::Unclassified => write!(f, "未分类"),
        }
    }
}

/// 一轮运行内部的临时结果，不直接持久化
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub record_id: i64,
    pub major: String,
    pub outcome: Classification,
}
