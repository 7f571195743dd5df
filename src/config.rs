use crate::error::{AppResult, ConfigError};
use crate::models::Selection;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// PostgreSQL 连接串，设置后使用数据库存储
    pub database_url: Option<String>,
    /// 未设置数据库时使用的 JSON 快照文件
    pub snapshot_file: String,
    /// 规则文件（TOML），为空时使用内置 12 学科门类
    pub rules_file: Option<String>,
    /// 待分类占位科类
    pub placeholder_category: String,
    /// 只处理某一年份的记录
    pub select_year: Option<i32>,
    /// 预览模式，只分类统计，不写入
    pub dry_run: bool,
    /// 单次存储调用超时（秒），0 表示不限制
    pub store_timeout_secs: u64,
    /// 报告中保留的未分类专业样例数
    pub unclassified_sample_limit: usize,
    /// 运行报告输出文件
    pub report_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            snapshot_file: "admission_data.json".to_string(),
            rules_file: None,
            placeholder_category: "综合".to_string(),
            select_year: None,
            dry_run: false,
            store_timeout_secs: 30,
            unclassified_sample_limit: 20,
            report_file: "reclassify_report.json".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        Ok(Self {
            database_url: env_string("DATABASE_URL"),
            snapshot_file: env_string("SNAPSHOT_FILE").unwrap_or(default.snapshot_file),
            rules_file: env_string("RULES_FILE"),
            placeholder_category: env_string("PLACEHOLDER_CATEGORY")
                .unwrap_or(default.placeholder_category),
            select_year: env_parse("SELECT_YEAR", "i32")?,
            dry_run: env_parse("DRY_RUN", "bool")?.unwrap_or(default.dry_run),
            store_timeout_secs: env_parse("STORE_TIMEOUT_SECS", "u64")?
                .unwrap_or(default.store_timeout_secs),
            unclassified_sample_limit: env_parse("UNCLASSIFIED_SAMPLE_LIMIT", "usize")?
                .unwrap_or(default.unclassified_sample_limit),
            report_file: env_string("REPORT_FILE").unwrap_or(default.report_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?
                .unwrap_or(default.verbose_logging),
        })
    }

    /// 本轮的选择条件
    pub fn selection(&self) -> Selection {
        Selection {
            category: self.placeholder_category.clone(),
            year: self.select_year,
        }
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        (self.store_timeout_secs > 0).then(|| Duration::from_secs(self.store_timeout_secs))
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => parse_value(var_name, &value, expected_type).map(Some),
    }
}

fn parse_value<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> AppResult<T> {
    value.parse().map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        }
        .into()
    })
}
