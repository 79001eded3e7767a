//! Target dates and the literal Chinese date token
//!
//! Screening conditions anchor every clause to a trading day written as
//! `YYYY年M月D日` (no zero padding). [`TargetDate`] is that day as a validated
//! calendar date; its [`Display`](std::fmt::Display) output is the token itself.

use crate::{PromptError, Result};
use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// The one date spelling the engine recognises: 4-digit year, 1-2 digit
/// month and day. ASCII digits only.
pub(crate) static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})年([0-9]{1,2})月([0-9]{1,2})日").expect("date pattern is valid")
});

/// A calendar day that conditions are evaluated against
///
/// # Examples
///
/// ```
/// use screener_prompt::TargetDate;
///
/// let date = TargetDate::new(2025, 9, 8).unwrap();
/// assert_eq!(date.to_string(), "2025年9月8日");
///
/// // Date picker form
/// let parsed: TargetDate = "2025-09-08".parse().unwrap();
/// assert_eq!(parsed, date);
///
/// // Literal form
/// let parsed: TargetDate = "2025年9月8日".parse().unwrap();
/// assert_eq!(parsed, date);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetDate(NaiveDate);

impl TargetDate {
    /// Create from a year/month/day triple, as supplied by a date picker
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or(PromptError::InvalidDate { year, month, day })
    }

    /// Today on the local clock
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// The local day before today
    pub fn yesterday() -> Self {
        Self::today().offset_days(-1)
    }

    /// The local day after today
    pub fn tomorrow() -> Self {
        Self::today().offset_days(1)
    }

    /// Shift by a number of calendar days (not trading days)
    ///
    /// Saturates at the representable range instead of overflowing.
    pub fn offset_days(self, days: i64) -> Self {
        self.0
            .checked_add_signed(chrono::Duration::days(days))
            .map_or(self, Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// The underlying chrono date
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// `YYYY-MM-DD`, the date picker / file name form
    pub fn iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    fn from_literal(text: &str) -> Option<Self> {
        let caps = DATE_PATTERN.captures(text)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.end() != text.len() {
            return None;
        }
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        Self::new(year, month, day).ok()
    }
}

impl From<NaiveDate> for TargetDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for TargetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}年{}月{}日", self.year(), self.month(), self.day())
    }
}

impl FromStr for TargetDate {
    type Err = PromptError;

    /// Accepts `YYYY-MM-DD` or `YYYY年M月D日`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        Self::from_literal(s).ok_or_else(|| PromptError::DateParseFailed(s.to_string()))
    }
}
