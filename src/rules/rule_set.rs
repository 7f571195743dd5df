//! 学科门类关键词规则集
//!
//! 规则集是一轮运行内不可变的值：加载时校验一次，之后显式传给分类器和引擎。

use crate::error::RuleSetError;
use std::collections::HashSet;
use tracing::debug;

/// 单个门类的关键词规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    label: String,
    keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new<I, S>(label: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// 按声明顺序排列的关键词
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// 校验后的规则，附带按长度降序的匹配顺序
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategoryRule,
    by_length: Vec<String>,
}

/// 有序规则集
///
/// 门类的声明顺序就是跨门类的优先级。
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// 校验并构建规则集
    ///
    /// 同一门类内重复的关键词只保留第一次出现；不同门类之间的重叠是允许的。
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, RuleSetError> {
        let mut seen_labels = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for (index, rule) in rules.into_iter().enumerate() {
            if rule.label.trim().is_empty() {
                return Err(RuleSetError::EmptyLabel { index });
            }
            if !seen_labels.insert(rule.label.clone()) {
                return Err(RuleSetError::DuplicateLabel { label: rule.label });
            }
            if rule.keywords.is_empty() {
                return Err(RuleSetError::EmptyKeywordList { label: rule.label });
            }

            let mut keywords = Vec::with_capacity(rule.keywords.len());
            let mut seen_keywords = HashSet::new();
            for (kw_index, keyword) in rule.keywords.iter().enumerate() {
                if keyword.trim().is_empty() {
                    return Err(RuleSetError::BlankKeyword {
                        label: rule.label.clone(),
                        index: kw_index,
                    });
                }
                if keyword.trim() != keyword {
                    return Err(RuleSetError::UntrimmedKeyword {
                        label: rule.label.clone(),
                        keyword: keyword.clone(),
                    });
                }
                if seen_keywords.insert(keyword.as_str()) {
                    keywords.push(keyword.clone());
                } else {
                    debug!("门类 {} 的关键词 '{}' 重复，已忽略", rule.label, keyword);
                }
            }

            // 稳定排序：等长关键词保持声明顺序
            let mut by_length = keywords.clone();
            by_length.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

            compiled.push(CompiledRule {
                rule: CategoryRule {
                    label: rule.label,
                    keywords,
                },
                by_length,
            });
        }

        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 按声明顺序遍历规则
    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// 按声明顺序遍历门类标签
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|c| c.rule.label.as_str())
    }

    /// 匹配顺序：门类按声明顺序，关键词按长度降序
    pub(crate) fn match_order(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rules
            .iter()
            .map(|c| (c.rule.label.as_str(), c.by_length.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicate_label() {
        let err = RuleSet::new(vec![
            CategoryRule::new("工学", ["工程"]),
            CategoryRule::new("工学", ["技术"]),
        ])
        .unwrap_err();
        assert!(matches!(err, RuleSetError::DuplicateLabel { label } if label == "工学"));
    }

    #[test]
    fn test_rejects_blank_and_untrimmed_keywords() {
        let err = RuleSet::new(vec![CategoryRule::new("文学", ["汉语言", "  "])]).unwrap_err();
        assert!(matches!(err, RuleSetError::BlankKeyword { index: 1, .. }));

        let err = RuleSet::new(vec![CategoryRule::new("文学", [""])]).unwrap_err();
        assert!(matches!(err, RuleSetError::BlankKeyword { index: 0, .. }));

        let err = RuleSet::new(vec![CategoryRule::new("文学", [" 英语"])]).unwrap_err();
        assert!(matches!(err, RuleSetError::UntrimmedKeyword { .. }));
    }

    #[test]
    fn test_rejects_empty_label_and_keyword_list() {
        let err = RuleSet::new(vec![CategoryRule::new(" ", ["a"])]).unwrap_err();
        assert!(matches!(err, RuleSetError::EmptyLabel { index: 0 }));

        let err = RuleSet::new(vec![CategoryRule::new("医学", Vec::<String>::new())]).unwrap_err();
        assert!(matches!(err, RuleSetError::EmptyKeywordList { .. }));
    }

    #[test]
    fn test_keywords_sorted_by_length_within_discipline() {
        let rules = RuleSet::new(vec![CategoryRule::new(
            "医学",
            ["护理", "口腔", "中西医", "护理", "医学技术"],
        )])
        .unwrap();

        let (label, order) = rules.match_order().next().unwrap();
        assert_eq!(label, "医学");
        assert_eq!(order, ["医学技术", "中西医", "护理", "口腔"]);
        // 去重后保留声明顺序
        assert_eq!(
            rules.rules().next().unwrap().keywords(),
            ["护理", "口腔", "中西医", "医学技术"]
        );
    }

    #[test]
    fn test_overlap_across_disciplines_allowed() {
        let rules = RuleSet::new(vec![
            CategoryRule::new("理学", ["海洋"]),
            CategoryRule::new("工学", ["海洋"]),
        ])
        .unwrap();
        assert_eq!(rules.labels().collect::<Vec<_>>(), ["理学", "工学"]);
    }
}
