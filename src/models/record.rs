//! 录取记录与选择条件

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 一条录取记录
///
/// 分数、位次等其它列由导入程序维护，原样放在 `extra` 里，这里既不解释也不修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub id: i64,
    pub year: i32,
    #[serde(default)]
    pub university_name: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AdmissionRecord {
    pub fn new(id: i64, year: i32, major: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            year,
            university_name: None,
            major: Some(major.into()),
            category: Some(category.into()),
            extra: Map::new(),
        }
    }

    /// 专业名称，缺失时视为空串
    pub fn major_name(&self) -> &str {
        self.major.as_deref().unwrap_or("")
    }
}

/// 待分类记录的选择条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// 当前科类等于该值的记录才会被选中（通常是占位科类"综合"）
    pub category: String,
    /// 可选的年份过滤
    pub year: Option<i32>,
}

impl Selection {
    pub fn placeholder(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            year: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn matches(&self, record: &AdmissionRecord) -> bool {
        record.category.as_deref() == Some(self.category.as_str())
            && self.year.map_or(true, |y| record.year == y)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "科类 = '{}' 且 年份 = {}", self.category, year),
            None => write!(f, "科类 = '{}'", self.category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, category: Option<&str>) -> AdmissionRecord {
        AdmissionRecord {
            category: category.map(String::from),
            ..AdmissionRecord::new(1, year, "法学", "")
        }
    }

    #[test]
    fn test_selection_matches() {
        let selection = Selection::placeholder("综合");
        assert!(selection.matches(&record(2024, Some("综合"))));
        assert!(!selection.matches(&record(2024, Some("法学"))));
        assert!(!selection.matches(&record(2024, None)));

        let by_year = Selection::placeholder("综合").with_year(2025);
        assert!(by_year.matches(&record(2025, Some("综合"))));
        assert!(!by_year.matches(&record(2024, Some("综合"))));
    }

    #[test]
    fn test_unrelated_columns_round_trip() {
        let json = r#"{"id":3,"year":2025,"major":"英语","category":"综合","min_score":612,"min_rank":10234}"#;
        let record: AdmissionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.major_name(), "英语");
        assert_eq!(record.extra["min_score"], 612);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["min_rank"], 10234);
        assert_eq!(value["category"], "综合");
    }
}
