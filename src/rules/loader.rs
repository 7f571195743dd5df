//! 规则文件加载
//!
//! TOML 格式：
//!
//! ```toml
//! [[discipline]]
//! label = "工学"
//! keywords = ["计算机", "工程"]
//!
//! [[alias]]
//! canonical = "艺术学"
//! legacy = ["艺术类"]
//! ```

use super::alias::check_alias_order;
use super::{AliasRule, CategoryRule, RuleSet};
use crate::error::{AppError, AppResult, RuleSetError};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// 内置的 12 学科门类规则
const BUILTIN_RULES: &str = include_str!("../../config/disciplines.toml");

#[derive(Debug, Deserialize)]
struct RawRuleBook {
    #[serde(default)]
    discipline: Vec<RawDiscipline>,
    #[serde(default)]
    alias: Vec<RawAlias>,
}

#[derive(Debug, Deserialize)]
struct RawDiscipline {
    label: String,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAlias {
    canonical: String,
    legacy: Vec<String>,
}

/// 一轮运行所需的全部静态配置：分类规则集 + 别名规则
#[derive(Debug, Clone)]
pub struct RuleBook {
    pub rules: RuleSet,
    pub aliases: Vec<AliasRule>,
}

impl RuleBook {
    /// 组合规则集与别名规则，并检查别名顺序
    pub fn new(rules: RuleSet, aliases: Vec<AliasRule>) -> Result<Self, RuleSetError> {
        check_alias_order(&aliases)?;
        Ok(Self { rules, aliases })
    }

    /// 内置规则（教育部 12 个学科门类）
    pub fn builtin() -> Result<Self, RuleSetError> {
        Self::from_toml_str(BUILTIN_RULES, "<builtin>")
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, RuleSetError> {
        let raw: RawRuleBook = toml::from_str(content).map_err(|source| RuleSetError::Parse {
            path: origin.to_string(),
            source,
        })?;

        let rules = RuleSet::new(
            raw.discipline
                .into_iter()
                .map(|d| CategoryRule::new(d.label, d.keywords))
                .collect(),
        )?;

        let aliases = raw
            .alias
            .into_iter()
            .enumerate()
            .map(|(index, a)| {
                AliasRule::new(a.legacy, a.canonical).map_err(|e| match e {
                    RuleSetError::EmptyCanonical { .. } => RuleSetError::EmptyCanonical { index },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(rules, aliases)
    }
}

/// 从文件加载规则；未指定文件时使用内置规则
pub async fn load_rule_book(path: Option<&Path>) -> AppResult<RuleBook> {
    let book = match path {
        None => {
            info!("使用内置学科门类规则");
            RuleBook::builtin()?
        }
        Some(path) => {
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
            info!("正在加载规则文件: {}", path.display());
            RuleBook::from_toml_str(&content, &path.display().to_string())?
        }
    };

    info!(
        "✓ 规则加载完成: {} 个门类, {} 条别名规则",
        book.rules.len(),
        book.aliases.len()
    );
    Ok(book)
}
