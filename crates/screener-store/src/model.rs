//! Persisted data model
//!
//! The whole library is one JSON record stored under [`RECORD_KEY`]; saved
//! free-text forks live beside it under [`EDITS_KEY`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Storage key of the collection record
pub const RECORD_KEY: &str = "stock-template-data";

/// Storage key of the per-template saved edits
pub const EDITS_KEY: &str = "stock-template-edits";

/// Version written into new records
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length of the recent list
pub const RECENT_LIMIT: usize = 5;

/// Template id → saved free-text override of the generated body
pub type TemplateEdits = BTreeMap<String, String>;

/// A screening condition template, preset or custom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Body with `{key}` placeholders and/or literal dates
    #[serde(rename = "template")]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Absent for presets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields collected when a user saves a new custom template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A user-named group of templates, independent of the main favorites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub template_ids: Vec<String>,
    #[serde(
        default,
        rename = "created_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl FavoriteList {
    pub fn contains(&self, template_id: &str) -> bool {
        self.template_ids.iter().any(|id| id == template_id)
    }
}

/// The persisted collection
///
/// Older blobs may lack fields; [`CollectionRecord::from_value`] fills each
/// one from its default independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRecord {
    pub version: u32,
    /// Custom templates in creation order
    pub templates: Vec<Template>,
    /// Main favorites
    pub favorites: Vec<String>,
    /// Most recent first, at most [`RECENT_LIMIT`]
    pub recent: Vec<String>,
    pub named_favorite_lists: Vec<FavoriteList>,
    pub template_tags: BTreeMap<String, Vec<String>>,
}

impl Default for CollectionRecord {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            templates: Vec::new(),
            favorites: Vec::new(),
            recent: Vec::new(),
            named_favorite_lists: Vec::new(),
            template_tags: BTreeMap::new(),
        }
    }
}

impl CollectionRecord {
    /// Merge a loaded JSON value over the defaults, field by field
    ///
    /// Missing or malformed fields fall back to empty; malformed entries
    /// inside arrays are dropped individually. The result is normalised:
    /// `recent` is de-duplicated and capped, id and tag lists are de-duplicated.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            tracing::warn!("Stored collection is not a JSON object, using empty record");
            return Self::default();
        };

        let mut record = Self {
            version: field(obj, "version").unwrap_or(SCHEMA_VERSION),
            templates: items(obj, "templates"),
            favorites: items(obj, "favorites"),
            recent: items(obj, "recent"),
            named_favorite_lists: items(obj, "namedFavoriteLists"),
            template_tags: field(obj, "templateTags").unwrap_or_default(),
        };
        record.normalize();
        record
    }

    /// Restore invariants a hand-edited or foreign blob may break
    pub fn normalize(&mut self) {
        dedup_in_place(&mut self.favorites);
        dedup_in_place(&mut self.recent);
        self.recent.truncate(RECENT_LIMIT);
        for list in &mut self.named_favorite_lists {
            dedup_in_place(&mut list.template_ids);
        }
        for tags in self.template_tags.values_mut() {
            dedup_in_place(tags);
        }
        self.template_tags.retain(|_, tags| !tags.is_empty());
        for template in &mut self.templates {
            dedup_in_place(&mut template.tags);
        }
    }

    pub fn find_custom(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn find_list(&self, list_id: &str) -> Option<&FavoriteList> {
        self.named_favorite_lists.iter().find(|l| l.id == list_id)
    }
}

/// Remove later duplicates, keeping first occurrences in order
pub(crate) fn dedup_in_place(values: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Ignoring malformed field '{}': {}", key, e);
                None
            }
        },
    }
}

fn items<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Vec<T> {
    let Some(value) = obj.get(key) else {
        return Vec::new();
    };
    let Some(array) = value.as_array() else {
        if !value.is_null() {
            tracing::warn!("Ignoring field '{}': expected an array", key);
        }
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Dropping malformed entry in '{}': {}", key, e);
                None
            }
        })
        .collect()
}
