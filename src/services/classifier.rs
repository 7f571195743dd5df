//! 专业名称分类器 - 业务能力层
//!
//! 纯函数：专业名称 + 规则集 → 学科门类。无 I/O，无副作用。
//!
//! 匹配规则：
//! 1. 只去掉两端空白，不分词、不做大小写或全半角归一；
//! 2. 门类按规则集声明顺序尝试，声明顺序即跨门类优先级；
//! 3. 同一门类内关键词按长度降序尝试；
//! 4. 第一个有关键词被包含的门类即结果，找不到返回未分类。
//!
//! UTF-8 是自同步编码，`str::contains` 的字节子串匹配与按码点匹配等价，
//! 不会在一个汉字的中间命中。

use crate::models::{AdmissionRecord, Classification, ClassificationResult};
use crate::rules::RuleSet;

/// 专业名称分类器
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'r> {
    rules: &'r RuleSet,
}

impl<'r> Classifier<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// 对单个专业名称分类
    pub fn classify(&self, major_name: &str) -> Classification {
        classify(major_name, self.rules)
    }

    /// 对一条记录分类
    pub fn classify_record(&self, record: &AdmissionRecord) -> ClassificationResult {
        let major = record.major_name();
        ClassificationResult {
            record_id: record.id,
            major: major.to_string(),
            outcome: self.classify(major),
        }
    }
}

/// 按规则集对专业名称分类
pub fn classify(major_name: &str, rules: &RuleSet) -> Classification {
    let name = major_name.trim();
    if name.is_empty() {
        return Classification::Unclassified;
    }

    for (label, keywords) in rules.match_order() {
        if keywords.iter().any(|kw| name.contains(kw.as_str())) {
            return Classification::Discipline(label.to_string());
        }
    }

    Classification::Unclassified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{CategoryRule, RuleBook};

    fn builtin() -> RuleSet {
        RuleBook::builtin().unwrap().rules
    }

    fn discipline(label: &str) -> Classification {
        Classification::Discipline(label.to_string())
    }

    #[test]
    fn test_concrete_cases() {
        let rules = builtin();
        assert_eq!(classify("计算机科学与技术", &rules), discipline("工学"));
        assert_eq!(classify("汉语言文学", &rules), discipline("文学"));
        assert_eq!(classify("", &rules), Classification::Unclassified);
        assert_eq!(classify("   ", &rules), Classification::Unclassified);
    }

    /// 内置规则对常见专业的分类
    #[test]
    fn test_builtin_samples() {
        let rules = builtin();
        let cases = [
            ("哲学", "哲学"),
            ("经济学", "经济学"),
            ("计算机科学与技术", "工学"),
            ("汉语言文学", "文学"),
            ("临床医学", "医学"),
            ("工商管理", "管理学"),
            ("视觉传达设计", "艺术学"),
            ("数学与应用数学", "理学"),
            ("土木工程", "工学"),
            ("历史学", "历史学"),
            ("体育教育", "教育学"),
            ("金融学", "经济学"),
            ("法学", "法学"),
            ("园艺", "农学"),
            ("护理学", "医学"),
        ];
        for (major, expected) in cases {
            assert_eq!(classify(major, &rules), discipline(expected), "专业: {}", major);
        }
    }

    #[test]
    fn test_declaration_order_beats_specificity() {
        let rules = RuleSet::new(vec![
            CategoryRule::new("A", ["工程"]),
            CategoryRule::new("B", ["机械工程"]),
        ])
        .unwrap();
        assert_eq!(classify("机械工程", &rules), discipline("A"));
    }

    #[test]
    fn test_single_discipline_keyword() {
        let rules = RuleSet::new(vec![
            CategoryRule::new("文学", ["汉语言"]),
            CategoryRule::new("医学", ["护理"]),
        ])
        .unwrap();
        assert_eq!(classify("护理学（涉外）", &rules), discipline("医学"));
        assert_eq!(classify("软件工程", &rules), Classification::Unclassified);
    }

    #[test]
    fn test_trims_only_surrounding_whitespace() {
        let rules = RuleSet::new(vec![CategoryRule::new("文学", ["英语"])]).unwrap();
        assert_eq!(classify("  商务英语\t", &rules), discipline("文学"));
        // 不做全半角或大小写归一
        let latin = RuleSet::new(vec![CategoryRule::new("工学", ["AI"])]).unwrap();
        assert_eq!(classify("ai 应用", &latin), Classification::Unclassified);
        assert_eq!(classify("ＡＩ应用", &latin), Classification::Unclassified);
        assert_eq!(classify("AI应用", &latin), discipline("工学"));
    }

    #[test]
    fn test_deterministic() {
        let rules = builtin();
        let classifier = Classifier::new(&rules);
        for major in ["机械设计制造及其自动化", "海洋科学", "环境设计", "未知专业"] {
            assert_eq!(classifier.classify(major), classifier.classify(major));
        }
    }

    #[test]
    fn test_classify_record_without_major() {
        let rules = builtin();
        let record = AdmissionRecord {
            major: None,
            ..AdmissionRecord::new(7, 2025, "", "综合")
        };
        let result = Classifier::new(&rules).classify_record(&record);
        assert_eq!(result.record_id, 7);
        assert!(result.outcome.is_unclassified());
    }
}
