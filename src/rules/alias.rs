//! 历史遗留科类别名

use crate::error::RuleSetError;
use serde::Serialize;

/// 把一组旧科类标签折叠为标准门类
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRule {
    legacy: Vec<String>,
    canonical: String,
}

impl AliasRule {
    pub fn new<I, S>(legacy: I, canonical: impl Into<String>) -> Result<Self, RuleSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = canonical.into();
        if canonical.trim().is_empty() {
            return Err(RuleSetError::EmptyCanonical { index: 0 });
        }

        let legacy: Vec<String> = legacy
            .into_iter()
            .map(Into::into)
            .filter(|l: &String| !l.trim().is_empty() && *l != canonical)
            .collect();
        if legacy.is_empty() {
            return Err(RuleSetError::EmptyAliasRule { canonical });
        }

        Ok(Self { legacy, canonical })
    }

    pub fn legacy(&self) -> &[String] {
        &self.legacy
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// 检查别名规则的顺序：目标标签不能出现在它自己或更早规则的旧标签里
///
/// 否则一次折叠后仍会留下旧标签，第二次执行会再次修改记录。
pub fn check_alias_order(aliases: &[AliasRule]) -> Result<(), RuleSetError> {
    for (index, rule) in aliases.iter().enumerate() {
        let reintroduced = aliases[..=index]
            .iter()
            .any(|earlier| earlier.legacy.iter().any(|l| *l == rule.canonical));
        if reintroduced {
            return Err(RuleSetError::AliasReintroduced {
                index,
                canonical: rule.canonical.clone(),
            });
        }
    }
    Ok(())
}

impl std::fmt::Display for AliasRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.legacy.join(" / "), self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_rule_validation() {
        let rule = AliasRule::new(["艺术类", "艺术类（物理）"], "艺术学").unwrap();
        assert_eq!(rule.legacy(), ["艺术类", "艺术类（物理）"]);
        assert_eq!(rule.to_string(), "艺术类 / 艺术类（物理） -> 艺术学");

        assert!(matches!(
            AliasRule::new(["体育类"], " "),
            Err(RuleSetError::EmptyCanonical { .. })
        ));
        // 只指向自身的规则没有意义
        assert!(matches!(
            AliasRule::new(["教育学", ""], "教育学"),
            Err(RuleSetError::EmptyAliasRule { .. })
        ));
    }

    #[test]
    fn test_alias_order() {
        let chained = vec![
            AliasRule::new(["艺术类"], "艺术学").unwrap(),
            AliasRule::new(["艺术学"], "艺术").unwrap(),
        ];
        assert!(check_alias_order(&chained).is_ok());

        let reversed = vec![
            AliasRule::new(["艺术"], "艺术学").unwrap(),
            AliasRule::new(["艺术类"], "艺术").unwrap(),
        ];
        assert!(matches!(
            check_alias_order(&reversed),
            Err(RuleSetError::AliasReintroduced { index: 1, ref canonical }) if canonical == "艺术"
        ));

        let cycle = vec![
            AliasRule::new(["体育类"], "教育学").unwrap(),
            AliasRule::new(["教育学"], "体育类").unwrap(),
        ];
        assert!(matches!(
            check_alias_order(&cycle),
            Err(RuleSetError::AliasReintroduced { index: 1, .. })
        ));
    }
}
