//! 静态分类配置：规则集、别名规则与加载

pub mod alias;
pub mod loader;
pub mod rule_set;

pub use alias::{check_alias_order, AliasRule};
pub use loader::{load_rule_book, RuleBook};
pub use rule_set::{CategoryRule, RuleSet};
