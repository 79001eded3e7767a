//! Terminal rendering of listings and mutation outcomes

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use screener_store::{CollectionStore, FavoriteList, Outcome, StorageBackend, Template, presets};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Preset catalog grouped by trading session
pub fn presets_table() -> Table {
    let mut table = table(vec!["分类", "ID", "名称", "说明"]);
    for category in presets::categories() {
        for template in &category.templates {
            table.add_row(vec![
                format!("{} {}", category.icon, category.name),
                template.id.clone(),
                template.name.clone(),
                template.description.clone(),
            ]);
        }
    }
    table
}

/// Templates with their tags and favorite markers
pub fn templates_table<B: StorageBackend>(
    store: &CollectionStore<B>,
    templates: &[&Template],
) -> Table {
    let mut table = table(vec!["ID", "名称", "说明", "标签", "收藏", "类型"]);
    for template in templates {
        let favorite = if store.is_favorite(&template.id) {
            "★"
        } else if store.is_favorited_anywhere(&template.id) {
            "☆"
        } else {
            ""
        };
        let kind = if store.is_preset(&template.id) {
            "预设"
        } else {
            "自定义"
        };
        table.add_row(vec![
            template.id.clone(),
            template.name.clone(),
            template.description.clone(),
            store.tags_for(&template.id).join(", "),
            favorite.to_string(),
            kind.to_string(),
        ]);
    }
    table
}

pub fn lists_table(lists: &[FavoriteList]) -> Table {
    let mut table = table(vec!["ID", "名称", "模板数", "创建时间"]);
    for list in lists {
        table.add_row(vec![
            list.id.clone(),
            list.name.clone(),
            list.template_ids.len().to_string(),
            list.created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        ]);
    }
    table
}

pub fn tags_table<B: StorageBackend>(store: &CollectionStore<B>) -> Table {
    let mut table = table(vec!["标签", "模板数"]);
    for tag in store.all_unique_tags() {
        let count = store.templates_by_tag(&tag).len();
        table.add_row(vec![tag, count.to_string()]);
    }
    table
}

/// One-line user message for a mutation outcome
pub fn outcome_message<T>(outcome: &Outcome<T>, applied: &str) -> String {
    match outcome {
        Outcome::Applied(_) => format!("✅ {applied}"),
        Outcome::Unchanged => "ℹ️ 无需更改".to_string(),
        Outcome::Refused(refusal) => refusal.to_string(),
    }
}
