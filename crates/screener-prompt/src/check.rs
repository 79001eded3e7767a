//! Superficial syntax check for condition text
//!
//! This is a sanity hint for the user, not a validator of the trading
//! software's grammar.

use crate::date::DATE_PATTERN;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clause connectors used by screening conditions
pub const CONNECTORS: [&str; 3] = ["；", "且", "或"];

/// Outcome of [`check_syntax`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxReport {
    /// A `YYYY年M月D日` token is present
    pub has_date: bool,
    /// At least one clause connector is present
    pub has_conditions: bool,
    /// At least one ASCII digit is present
    pub has_numbers: bool,
    /// Length in characters
    pub char_count: usize,
}

impl SyntaxReport {
    /// All three heuristics passed
    pub fn looks_valid(&self) -> bool {
        self.has_date && self.has_conditions && self.has_numbers
    }
}

/// Run the heuristics over `text`
///
/// # Examples
///
/// ```
/// use screener_prompt::check_syntax;
///
/// let report = check_syntax("2025年9月8日量比大于3；主板非ST");
/// assert!(report.looks_valid());
///
/// let report = check_syntax("主板非ST");
/// assert!(!report.has_date);
/// ```
pub fn check_syntax(text: &str) -> SyntaxReport {
    SyntaxReport {
        has_date: DATE_PATTERN.is_match(text),
        has_conditions: CONNECTORS.iter().any(|c| text.contains(c)),
        has_numbers: text.bytes().any(|b| b.is_ascii_digit()),
        char_count: text.chars().count(),
    }
}

fn line(f: &mut fmt::Formatter<'_>, ok: bool, pass: &str, fail: &str) -> fmt::Result {
    if ok {
        writeln!(f, "✅ {pass}")
    } else {
        writeln!(f, "⚠️ {fail}")
    }
}

impl fmt::Display for SyntaxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🔍 语法检查结果：")?;
        writeln!(f)?;
        line(f, self.has_date, "包含日期格式", "缺少日期格式")?;
        line(f, self.has_conditions, "包含筛选条件", "缺少筛选条件连接符")?;
        line(f, self.has_numbers, "包含数值条件", "缺少数值条件")?;
        writeln!(f)?;
        write!(f, "字符长度: {} 字符", self.char_count)
    }
}
