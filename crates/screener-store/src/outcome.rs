//! Mutation outcomes
//!
//! Expected "nothing to do" and validation cases are values, not errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a mutation was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refusal {
    EmptyName,
    EmptyBody,
    EmptyListName,
    EmptyTag,
    /// Presets cannot be deleted
    PresetTemplate(String),
    TemplateNotFound(String),
    ListNotFound(String),
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::EmptyName => write!(f, "⚠️ 模板名称不能为空"),
            Refusal::EmptyBody => write!(f, "⚠️ 模板内容不能为空"),
            Refusal::EmptyListName => write!(f, "⚠️ 收藏夹名称不能为空"),
            Refusal::EmptyTag => write!(f, "⚠️ 标签不能为空"),
            Refusal::PresetTemplate(_) => write!(f, "⚠️ 预设模板无法删除"),
            Refusal::TemplateNotFound(id) => write!(f, "⚠️ 未找到模板: {id}"),
            Refusal::ListNotFound(id) => write!(f, "⚠️ 未找到收藏夹: {id}"),
        }
    }
}

/// Result of a mutation that reached the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// The record changed and was saved
    Applied(T),
    /// Nothing to do; storage untouched
    Unchanged,
    /// Rejected by validation; storage untouched
    Refused(Refusal),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Outcome::Unchanged)
    }

    pub fn is_refused(&self) -> bool {
        matches!(self, Outcome::Refused(_))
    }

    /// The applied value, if any
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Outcome::Refused(refusal) => Some(refusal),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Unchanged => Outcome::Unchanged,
            Outcome::Refused(refusal) => Outcome::Refused(refusal),
        }
    }
}
