//! Template rendering and date re-targeting
//!
//! Two placeholder styles coexist in stored templates:
//!
//! - named placeholders, `{key}`, resolved from [`Variables`];
//! - literal dates, `YYYY年M月D日`, which all stand for the same trading day
//!   and are rewritten to the target date wholesale.
//!
//! [`rerender_preserving_edits`] is the narrower operation used on hand-edited
//! text: only the first literal date is rewritten.

use crate::date::DATE_PATTERN;
use crate::{TargetDate, Variables};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.*?)\}").expect("placeholder pattern is valid"));

/// Render a template body
///
/// Every `{key}` is replaced by its bound value (unbound keys become empty).
/// If `vars` carries a target date, every literal date in the result is then
/// replaced by it, so the output never contains any other date.
///
/// Substitution is a single pass: a bound value that itself contains a
/// `{key}` marker is inserted verbatim and not expanded. Rendering an already
/// rendered body with the same `vars` returns it unchanged, provided no bound
/// value contains such a marker.
///
/// # Examples
///
/// ```
/// use screener_prompt::{render_template, TargetDate, Variables};
///
/// let vars = Variables::new()
///     .set("target_date", "2025年9月8日")
///     .set("volume_ratio_min", 3);
/// let out = render_template("{target_date}量比大于{volume_ratio_min}", &vars);
/// assert_eq!(out, "2025年9月8日量比大于3");
///
/// let vars = Variables::with_target_date(TargetDate::new(2025, 9, 9).unwrap());
/// let out = render_template("2025年9月8日09:30至09:35量比大于3", &vars);
/// assert_eq!(out, "2025年9月9日09:30至09:35量比大于3");
/// ```
pub fn render_template(body: &str, vars: &Variables) -> String {
    let named = PLACEHOLDER.replace_all(body, |caps: &Captures<'_>| vars.resolve(&caps[1]));
    match vars.target_date() {
        Some(date) => retarget_dates(&named, date),
        None => named.into_owned(),
    }
}

/// Replace every literal date in `body` with `date`
pub fn retarget_dates(body: &str, date: TargetDate) -> String {
    DATE_PATTERN
        .replace_all(body, date.to_string().as_str())
        .into_owned()
}

/// Result of re-dating hand-edited text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rerendered {
    /// The text after substitution (unchanged when no date was found)
    pub text: String,
    /// Whether a `YYYY年M月D日` token was found and replaced
    pub date_found: bool,
}

/// Re-date a saved free-text fork
///
/// Scans left to right and replaces only the first `YYYY年M月D日` token with
/// `date`. Other spellings (`今日`, `2025/9/8`, …) are never touched. When no
/// token exists the text comes back unchanged with `date_found == false`.
///
/// # Examples
///
/// ```
/// use screener_prompt::{rerender_preserving_edits, TargetDate};
///
/// let date = TargetDate::new(2025, 9, 9).unwrap();
///
/// let out = rerender_preserving_edits("2025年9月8日量比大于3", date);
/// assert!(out.date_found);
/// assert_eq!(out.text, "2025年9月9日量比大于3");
///
/// let out = rerender_preserving_edits("今日量比大于3", date);
/// assert!(!out.date_found);
/// assert_eq!(out.text, "今日量比大于3");
/// ```
pub fn rerender_preserving_edits(saved: &str, date: TargetDate) -> Rerendered {
    match DATE_PATTERN.find(saved) {
        Some(m) => {
            let replacement = date.to_string();
            let mut text = String::with_capacity(saved.len() + replacement.len());
            text.push_str(&saved[..m.start()]);
            text.push_str(&replacement);
            text.push_str(&saved[m.end()..]);
            Rerendered {
                text,
                date_found: true,
            }
        }
        None => Rerendered {
            text: saved.to_string(),
            date_found: false,
        },
    }
}

/// Placeholder keys in order of first appearance, without duplicates
pub fn placeholders(body: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(body) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Placeholder keys in `body` that `vars` leaves unbound
pub fn missing_variables(body: &str, vars: &Variables) -> Vec<String> {
    placeholders(body)
        .into_iter()
        .filter(|key| !vars.contains(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> TargetDate {
        TargetDate::new(y, m, d).unwrap()
    }

    const LONG: &str = "2025年9月8日09:30至09:35特大单净额排名行业前15或2025年9月8日09:30至09:35特大单净额排名行业前20%；（2025年9月8日09:35量比/2025年9月8日09:34量比）-（2025年9月8日09:34量比/2025年9月8日09:31量比）*0.95＞0.01＜0.33；主板非ST且市值小于200亿";

    #[test]
    fn test_named_placeholders() {
        let vars = Variables::new()
            .set("target_date", "2025年9月8日")
            .set("volume_ratio_min", 3);
        assert_eq!(
            render_template("{target_date}量比大于{volume_ratio_min}", &vars),
            "2025年9月8日量比大于3"
        );
    }

    #[test]
    fn test_missing_placeholder_renders_empty() {
        let vars = Variables::new().set("target_date", "2025年9月8日");
        let out = render_template("{target_date}量比大于{volume_ratio_min}", &vars);
        assert_eq!(out, "2025年9月8日量比大于");
        assert!(!out.contains('{'));
        assert!(!out.contains('}'));
    }

    #[test]
    fn test_empty_braces_resolve_to_nothing() {
        let out = render_template("a{}b", &Variables::new());
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_unclosed_brace_is_literal() {
        let out = render_template("价格{大于", &Variables::new());
        assert_eq!(out, "价格{大于");
    }

    #[test]
    fn test_literal_dates_all_replaced() {
        let old_date = "2025年9月8日";
        let count = LONG.matches(old_date).count();
        assert_eq!(count, 6);

        let out = render_template(LONG, &Variables::with_target_date(date(2025, 9, 9)));
        assert_eq!(out.matches("2025年9月9日").count(), count);
        assert!(!out.contains(old_date));
        assert_eq!(DATE_PATTERN.find_iter(&out).count(), count);
    }

    #[test]
    fn test_mixed_dates_collapse_to_target() {
        let body = "2024年1月2日收盘价/2023年12月29日收盘价大于1";
        let out = render_template(body, &Variables::with_target_date(date(2025, 10, 1)));
        assert_eq!(out, "2025年10月1日收盘价/2025年10月1日收盘价大于1");
    }

    #[test]
    fn test_dates_inside_values_are_retargeted() {
        let vars = Variables::with_target_date(date(2025, 9, 9)).set("anchor", "2020年1月1日");
        let out = render_template("{anchor}换手率", &vars);
        assert_eq!(out, "2025年9月9日换手率");
    }

    #[test]
    fn test_scenario_single_date() {
        let out = render_template(
            "2025年9月8日09:30至09:35量比大于3",
            &Variables::with_target_date(date(2025, 9, 9)),
        );
        assert_eq!(out, "2025年9月9日09:30至09:35量比大于3");
    }

    #[test]
    fn test_render_is_idempotent() {
        let vars = Variables::with_target_date(date(2025, 9, 9)).set("volume_ratio_min", 3);
        let bodies = [
            LONG,
            "{target_date}量比大于{volume_ratio_min}",
            "{target_date}{start_time}至{end_time}",
            "无日期条件",
        ];
        for body in bodies {
            let once = render_template(body, &vars);
            assert_eq!(render_template(&once, &vars), once, "body: {body}");
        }
    }

    #[test]
    fn test_bound_values_are_not_expanded() {
        let vars = Variables::new().set("x", "{y}").set("y", "z");
        let once = render_template("{x}", &vars);
        assert_eq!(once, "{y}");
        // A marker carried in by a value resolves on the next pass
        assert_eq!(render_template(&once, &vars), "z");
    }

    #[test]
    fn test_rerender_replaces_only_first() {
        let out = rerender_preserving_edits(LONG, date(2025, 9, 9));
        assert!(out.date_found);
        assert!(out.text.starts_with("2025年9月9日09:30至09:35"));
        assert_eq!(out.text.matches("2025年9月9日").count(), 1);
        assert_eq!(out.text.matches("2025年9月8日").count(), 5);
    }

    #[test]
    fn test_rerender_single_occurrence() {
        let out = rerender_preserving_edits("我的条件：2025年9月8日量比大于3", date(2026, 1, 2));
        assert_eq!(
            out,
            Rerendered {
                text: "我的条件：2026年1月2日量比大于3".to_string(),
                date_found: true,
            }
        );
    }

    #[test]
    fn test_rerender_without_date() {
        for text in ["今日量比大于3", "2025/9/8量比大于3", "9月8日量比", ""] {
            let out = rerender_preserving_edits(text, date(2025, 9, 9));
            assert!(!out.date_found, "text: {text}");
            assert_eq!(out.text, text);
        }
    }

    #[test]
    fn test_placeholders() {
        let keys = placeholders("{a}{b}{a}x{c}");
        assert_eq!(keys, vec!["a", "b", "c"]);

        let vars = Variables::new().set("b", 1);
        assert_eq!(missing_variables("{a}{b}{c}", &vars), vec!["a", "c"]);
    }
}
