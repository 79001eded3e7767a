//! Screening condition templating for screener-rs
//!
//! This crate turns stored condition templates into the final text pasted into
//! trading software. It is pure: no I/O, no global state beyond compiled
//! patterns.
//!
//! # Features
//!
//! - **Named placeholders**: `{key}` markers resolved from [`Variables`]
//! - **Date re-targeting**: every literal `YYYY年M月D日` replaced by one [`TargetDate`]
//! - **Edit-preserving re-dating**: move the first date of hand-edited text
//! - **Syntax hints**: superficial checks for dates, connectors and numbers
//! - **Criteria builder**: structured thresholds for the default condition
//!
//! # Quick Start
//!
//! ```
//! use screener_prompt::{render_template, TargetDate, Variables};
//!
//! let date: TargetDate = "2025-09-09".parse().unwrap();
//! let vars = Variables::with_target_date(date).set("volume_ratio_min", 3);
//!
//! // Literal dates follow the target date
//! let out = render_template("2025年9月8日09:35量比大于3", &vars);
//! assert_eq!(out, "2025年9月9日09:35量比大于3");
//!
//! // Named placeholders resolve from the variables
//! let out = render_template("{target_date}量比大于{volume_ratio_min}", &vars);
//! assert_eq!(out, "2025年9月9日量比大于3");
//! ```
//!
//! # Re-dating edited text
//!
//! ```
//! use screener_prompt::{rerender_preserving_edits, TargetDate};
//!
//! let date = TargetDate::new(2025, 9, 10).unwrap();
//! let out = rerender_preserving_edits("我改过的：2025年9月8日量比大于5", date);
//! assert!(out.date_found);
//! assert_eq!(out.text, "我改过的：2025年9月10日量比大于5");
//! ```

mod check;
mod criteria;
mod date;
mod error;
mod render;
mod variables;

// Re-export core types
pub use check::{CONNECTORS, SyntaxReport, check_syntax};
pub use criteria::{DEFAULT_CONDITION_TEMPLATE, ScreeningCriteria};
pub use date::TargetDate;
pub use error::{PromptError, Result};
pub use render::{
    Rerendered, missing_variables, placeholders, render_template, rerender_preserving_edits,
    retarget_dates,
};
pub use variables::{TARGET_DATE_KEY, Variables};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::date::TargetDate;
    pub use crate::error::{PromptError, Result};
    pub use crate::render::{Rerendered, render_template, rerender_preserving_edits};
    pub use crate::variables::Variables;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_usage() {
        let date = TargetDate::new(2025, 9, 9).unwrap();
        let vars = Variables::with_target_date(date).set("volume_ratio_min", 3);

        let out = render_template("{target_date}量比大于{volume_ratio_min}", &vars);
        assert_eq!(out, "2025年9月9日量比大于3");
    }

    #[test]
    fn test_render_then_redate() {
        let vars = Variables::with_target_date(TargetDate::new(2025, 9, 8).unwrap());
        let generated = render_template("2025年1月1日量比大于3", &vars);
        assert_eq!(generated, "2025年9月8日量比大于3");

        let edited = format!("{generated}且换手率大于1%");
        let out = rerender_preserving_edits(&edited, TargetDate::new(2025, 9, 9).unwrap());
        assert!(out.date_found);
        assert_eq!(out.text, "2025年9月9日量比大于3且换手率大于1%");
    }

    #[test]
    fn test_check_generated_text() {
        let vars = ScreeningCriteria::default()
            .variables(TargetDate::new(2025, 9, 8).unwrap())
            .unwrap();
        let out = render_template(DEFAULT_CONDITION_TEMPLATE, &vars);
        assert!(check_syntax(&out).looks_valid());
    }
}
