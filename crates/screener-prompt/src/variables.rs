//! Variable bindings for named placeholders

use crate::{PromptError, Result, TargetDate};
use serde_json::Value;
use std::collections::HashMap;

/// Key bound by [`Variables::with_target_date`]
pub const TARGET_DATE_KEY: &str = "target_date";

/// Values substituted into `{key}` placeholders, plus an optional target date
///
/// Values are kept as `serde_json::Value` so numbers, strings and booleans can
/// be mixed freely. When a target date is set, rendering also re-targets every
/// literal `YYYY年M月D日` token in the body.
///
/// # Examples
///
/// ```
/// use screener_prompt::{TargetDate, Variables};
///
/// let vars = Variables::with_target_date(TargetDate::new(2025, 9, 8).unwrap())
///     .set("volume_ratio_min", 3)
///     .set("start_time", "09:30");
///
/// assert_eq!(vars.resolve("target_date"), "2025年9月8日");
/// assert_eq!(vars.resolve("volume_ratio_min"), "3");
/// assert_eq!(vars.resolve("missing"), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: HashMap<String, Value>,
    target_date: Option<TargetDate>,
}

impl Variables {
    /// Empty bindings, no target date
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings that re-target literal dates and bind `{target_date}`
    pub fn with_target_date(date: TargetDate) -> Self {
        let mut vars = Self::new();
        vars.set_target_date(date);
        vars
    }

    /// Build from a JSON object; non-object values yield empty bindings
    pub fn from_json(value: &Value) -> Self {
        let values = value
            .as_object()
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self {
            values,
            target_date: None,
        }
    }

    /// Set a value (builder style)
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Parse and insert a `key=value` assignment as a string value
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| PromptError::InvalidAssignment(assignment.to_string()))?;
        self.insert(key.trim(), value);
        Ok(())
    }

    pub fn set_target_date(&mut self, date: TargetDate) {
        self.target_date = Some(date);
        self.insert(TARGET_DATE_KEY, date.to_string());
    }

    pub fn target_date(&self) -> Option<TargetDate> {
        self.target_date
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The text a `{key}` placeholder renders to; unbound keys render empty
    pub fn resolve(&self, key: &str) -> String {
        self.values.get(key).map(stringify).unwrap_or_default()
    }
}

/// Display form of a JSON value inside a condition string
///
/// Whole floats print without a trailing `.0` so `3.0` renders as `3`.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                        format!("{}", f as i64)
                    }
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            } else {
                n.to_string()
            }
        }
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}
