//! Built-in preset templates
//!
//! Presets are grouped by trading session. They are read-only: they can be
//! favorited, tagged and forked, but never deleted or listed as custom.

use crate::model::Template;
use std::sync::LazyLock;

/// A trading-session group of presets
#[derive(Debug, Clone)]
pub struct PresetCategory {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub templates: Vec<Template>,
}

fn preset(id: &str, name: &str, description: &str, body: &str) -> Template {
    Template {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        body: body.to_string(),
        tags: Vec::new(),
        created_at: None,
    }
}

static CATALOG: LazyLock<Vec<PresetCategory>> = LazyLock::new(|| {
    vec![
        PresetCategory {
            key: "morning",
            name: "早盘策略",
            description: "09:30-11:30 早盘交易时段",
            icon: "🌅",
            templates: vec![
                preset(
                    "morning_aggressive",
                    "早盘激进",
                    "09:30-09:35 特大单筛选",
                    "2025年9月8日09:30至09:35特大单净额排名行业前15或2025年9月8日09:30至09:35特大单净额排名行业前20%；2025年9月8日竞价分时涨跌幅大于0小于4；2025年9月8日09:30至09:35均价/开盘价大于1.003；2025年9月8日09:34至09:35最低价/2025年9月8日09:34至09:35均价大于0.985；2025年9月8日09:31收盘价/2025年9月8日09:30至09:31最高价大于0.985；2025年9月8日09:35量比大于3；（2025年9月8日09:35量比/2025年9月8日09:34量比）-（2025年9月8日09:34量比/2025年9月8日09:31量比）*0.95＞0.01＜0.33；2025年9月8日前1个交易日换手率/2025年9月8日前3个交易日换手率＜0.7且2025年9月8日前3个交易日换手率/2025年9月8日前120个交易日日均换手率＜8；2025年9月8日09:35换手率大于0.4%小于5%；2025年9月8日09:30至09:35特大单净额大于100万；（2025年9月8日09:34至09:35特大单净额-2025年9月8日09:30至09:34特大单净额）＞-1000万；2025年9月8日前10个交易日成交均价/2025年9月8日前20个交易日成交均价大于0.98；2025年9月8日前2个交易日振幅小于18.6；2025年9月8日前3个交易日非一字线非T字线；主板非ST且市值小于200亿",
                ),
                preset(
                    "morning_conservative",
                    "早盘稳健",
                    "09:45-10:00 稳健策略",
                    "2025年9月8日09:45至10:00特大单净额排名行业前25；2025年9月8日竞价分时涨跌幅大于-1小于3；2025年9月8日10:00量比大于2；2025年9月8日10:00换手率大于0.3%小于3%；主板非ST且市值小于300亿",
                ),
            ],
        },
        PresetCategory {
            key: "midday",
            name: "中盘策略",
            description: "10:00-13:00 中盘交易时段",
            icon: "☀️",
            templates: vec![preset(
                "midday_momentum",
                "中盘动量",
                "10:30-11:00 动量追踪",
                "2025年9月8日10:30至11:00特大单净额排名行业前10；2025年9月8日竞价分时涨跌幅大于2小于7；2025年9月8日11:00量比大于4；2025年9月8日11:00换手率大于1%小于6%；主板非ST且市值小于150亿",
            )],
        },
        PresetCategory {
            key: "afternoon",
            name: "午盘策略",
            description: "13:00-15:00 午盘交易时段",
            icon: "🌇",
            templates: vec![
                preset(
                    "afternoon_chase",
                    "午后追涨",
                    "13:30-14:00 追涨策略",
                    "2025年9月8日13:30至14:00特大单净额排名行业前8；2025年9月8日竞价分时涨跌幅大于3小于8；2025年9月8日14:00量比大于6；2025年9月8日14:00换手率大于1.5%小于8%；主板非ST且市值小于100亿",
                ),
                preset(
                    "end_day_grab",
                    "尾盘抢筹",
                    "14:30-15:00 尾盘策略",
                    "2025年9月8日14:30至15:00特大单净额排名行业前12；2025年9月8日竞价分时涨跌幅大于1小于5；2025年9月8日15:00量比大于4；2025年9月8日15:00换手率大于0.8%小于4%；主板非ST且市值小于200亿",
                ),
            ],
        },
    ]
});

/// All preset categories in display order
pub fn categories() -> &'static [PresetCategory] {
    &CATALOG
}

/// Every preset, category by category
pub fn presets<'a>() -> impl Iterator<Item = &'a Template> {
    CATALOG.iter().flat_map(|c| c.templates.iter())
}

pub fn find_preset(id: &str) -> Option<&'static Template> {
    presets().find(|t| t.id == id)
}

pub fn is_preset(id: &str) -> bool {
    find_preset(id).is_some()
}

/// The template shown when nothing has been used yet
pub fn default_preset() -> Option<&'static Template> {
    presets().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let keys: Vec<_> = categories().iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["morning", "midday", "afternoon"]);
        assert_eq!(presets().count(), 5);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = presets().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_find_preset() {
        assert!(is_preset("morning_aggressive"));
        assert!(!is_preset("custom_123"));
        assert_eq!(find_preset("end_day_grab").unwrap().name, "尾盘抢筹");
        assert_eq!(default_preset().unwrap().id, "morning_aggressive");
    }

    #[test]
    fn test_presets_are_literal_date_templates() {
        for template in presets() {
            assert!(template.body.contains("2025年9月8日"), "{}", template.id);
            assert!(!template.body.contains('{'), "{}", template.id);
            assert!(template.created_at.is_none());
        }
    }
}
