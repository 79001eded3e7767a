//! The template collection store
//!
//! [`CollectionStore`] owns a [`StorageBackend`] and an in-memory copy of the
//! last saved [`CollectionRecord`]. Every mutation clones that copy, applies
//! its change, writes the whole record back and only then swaps the copy, so
//! a failed write leaves both storage and memory on the previous state and
//! each mutation observes the result of the one before it.

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::model::{
    CollectionRecord, EDITS_KEY, FavoriteList, NewTemplate, RECENT_LIMIT, RECORD_KEY, Template,
    TemplateEdits, dedup_in_place,
};
use crate::outcome::{Outcome, Refusal};
use crate::presets;
use chrono::Utc;
use screener_prompt::{Variables, render_template};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Description given to custom templates saved without one
pub const DEFAULT_DESCRIPTION: &str = "自定义模板";

fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Persisted library of custom templates, favorites, lists, tags and edits
///
/// # Examples
///
/// ```
/// use screener_store::{CollectionStore, MemoryStorage, NewTemplate};
///
/// let mut store = CollectionStore::open(MemoryStorage::new());
///
/// let template = store
///     .create_template(NewTemplate::new("尾盘", "2025年9月8日14:50量比大于2"))
///     .unwrap()
///     .applied()
///     .unwrap();
///
/// store.set_favorite(&template.id, true).unwrap();
/// store.add_to_recent(&template.id).unwrap();
///
/// assert!(store.is_favorited_anywhere(&template.id));
/// assert_eq!(store.recent_templates()[0].name, "尾盘");
/// ```
pub struct CollectionStore<B: StorageBackend> {
    backend: B,
    record: CollectionRecord,
    edits: TemplateEdits,
}

impl<B: StorageBackend> CollectionStore<B> {
    /// Open a store, reading the persisted record once
    pub fn open(backend: B) -> Self {
        let record = Self::read_record(&backend);
        let edits = Self::read_edits(&backend);
        tracing::info!(
            "Opened template collection: {} custom templates, {} lists, {} saved edits",
            record.templates.len(),
            record.named_favorite_lists.len(),
            edits.len()
        );
        Self {
            backend,
            record,
            edits,
        }
    }

    fn read_record(backend: &B) -> CollectionRecord {
        match backend.get(RECORD_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<serde_json::Value>(&blob) {
                Ok(value) => CollectionRecord::from_value(&value),
                Err(e) => {
                    tracing::warn!("Stored collection is not valid JSON, using empty record: {}", e);
                    CollectionRecord::default()
                }
            },
            Ok(None) => {
                tracing::debug!("No stored collection, starting empty");
                CollectionRecord::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read stored collection, using empty record: {}", e);
                CollectionRecord::default()
            }
        }
    }

    fn read_edits(backend: &B) -> TemplateEdits {
        match backend.get(EDITS_KEY) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                tracing::warn!("Stored edits are malformed, discarding: {}", e);
                TemplateEdits::new()
            }),
            Ok(None) => TemplateEdits::new(),
            Err(e) => {
                tracing::warn!("Failed to read stored edits: {}", e);
                TemplateEdits::new()
            }
        }
    }

    /// Read the persisted record from the backend
    ///
    /// Never fails: absence, read errors and parse failures yield the empty
    /// record. Does not touch the in-memory copy.
    pub fn load(&self) -> CollectionRecord {
        Self::read_record(&self.backend)
    }

    /// Replace the in-memory copy with what the backend currently holds
    pub fn reload(&mut self) {
        self.record = Self::read_record(&self.backend);
        self.edits = Self::read_edits(&self.backend);
    }

    /// Serialize and overwrite the persisted record
    pub fn save(&mut self, record: CollectionRecord) -> Result<()> {
        let blob = serde_json::to_string(&record)?;
        self.backend.set(RECORD_KEY, &blob)?;
        self.record = record;
        Ok(())
    }

    fn save_edits(&mut self, edits: TemplateEdits) -> Result<()> {
        let blob = serde_json::to_string(&edits)?;
        self.backend.set(EDITS_KEY, &blob)?;
        self.edits = edits;
        Ok(())
    }

    /// Compute a new record from the current one; save it only if applied
    fn update<T>(
        &mut self,
        change: impl FnOnce(&mut CollectionRecord) -> Outcome<T>,
    ) -> Result<Outcome<T>> {
        let mut next = self.record.clone();
        let outcome = change(&mut next);
        if outcome.is_applied() {
            self.save(next)?;
        }
        Ok(outcome)
    }

    pub fn record(&self) -> &CollectionRecord {
        &self.record
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Move `id` to the front of the recent list, capped at five entries
    pub fn add_to_recent(&mut self, id: &str) -> Result<Outcome> {
        let outcome = self.update(|r| {
            let mut next = Vec::with_capacity(RECENT_LIMIT);
            next.push(id.to_string());
            next.extend(r.recent.iter().filter(|e| *e != id).cloned());
            next.truncate(RECENT_LIMIT);
            if next == r.recent {
                return Outcome::Unchanged;
            }
            r.recent = next;
            Outcome::Applied(())
        })?;
        tracing::debug!("add_to_recent({}): {:?}", id, outcome);
        Ok(outcome)
    }

    /// Add or remove `id` in the main favorites; named lists are untouched
    pub fn set_favorite(&mut self, id: &str, on: bool) -> Result<Outcome> {
        let outcome = self.update(|r| {
            let present = r.favorites.iter().any(|f| f == id);
            match (on, present) {
                (true, false) => r.favorites.push(id.to_string()),
                (false, true) => r.favorites.retain(|f| f != id),
                _ => return Outcome::Unchanged,
            }
            Outcome::Applied(())
        })?;
        tracing::debug!("set_favorite({}, {}): {:?}", id, on, outcome);
        Ok(outcome)
    }

    /// Remove `id` from the main favorites and from every named list
    pub fn unfavorite_everywhere(&mut self, id: &str) -> Result<Outcome> {
        let outcome = self.update(|r| {
            let before = r.favorites.len()
                + r.named_favorite_lists
                    .iter()
                    .map(|l| l.template_ids.len())
                    .sum::<usize>();
            r.favorites.retain(|f| f != id);
            for list in &mut r.named_favorite_lists {
                list.template_ids.retain(|t| t != id);
            }
            let after = r.favorites.len()
                + r.named_favorite_lists
                    .iter()
                    .map(|l| l.template_ids.len())
                    .sum::<usize>();
            if before == after {
                Outcome::Unchanged
            } else {
                Outcome::Applied(())
            }
        })?;
        tracing::debug!("unfavorite_everywhere({}): {:?}", id, outcome);
        Ok(outcome)
    }

    /// Append a new custom template with a fresh id and creation time
    pub fn create_template(&mut self, new: NewTemplate) -> Result<Outcome<Template>> {
        let name = new.name.trim();
        if name.is_empty() {
            return Ok(Outcome::Refused(Refusal::EmptyName));
        }
        if new.body.trim().is_empty() {
            return Ok(Outcome::Refused(Refusal::EmptyBody));
        }

        let description = match new.description.trim() {
            "" => DEFAULT_DESCRIPTION,
            d => d,
        };
        let mut tags: Vec<String> = new
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        dedup_in_place(&mut tags);

        let template = Template {
            id: new_id("custom"),
            name: name.to_string(),
            description: description.to_string(),
            body: new.body.clone(),
            tags,
            created_at: Some(Utc::now()),
        };

        let outcome = self.update(|r| {
            r.templates.push(template.clone());
            Outcome::Applied(template)
        })?;
        if let Outcome::Applied(t) = &outcome {
            tracing::info!("Created custom template {} ({})", t.id, t.name);
        }
        Ok(outcome)
    }

    /// Delete a custom template and every reference to it
    ///
    /// Presets are refused. References are removed from favorites, every
    /// named list, recents, tags and saved edits. The saved edit is dropped
    /// first; if the record write then fails the edit is written back, so an
    /// `Err` leaves the template and its edit in place.
    pub fn delete_template(&mut self, id: &str) -> Result<Outcome> {
        if presets::is_preset(id) {
            tracing::warn!("Refusing to delete preset template {}", id);
            return Ok(Outcome::Refused(Refusal::PresetTemplate(id.to_string())));
        }
        if self.record.find_custom(id).is_none() {
            return Ok(Outcome::Refused(Refusal::TemplateNotFound(id.to_string())));
        }

        let previous_edits = self.edits.clone();
        if previous_edits.contains_key(id) {
            let mut edits = previous_edits.clone();
            edits.remove(id);
            self.save_edits(edits)?;
        }

        let result = self.update(|r| {
            r.templates.retain(|t| t.id != id);
            r.favorites.retain(|f| f != id);
            r.recent.retain(|e| e != id);
            for list in &mut r.named_favorite_lists {
                list.template_ids.retain(|t| t != id);
            }
            r.template_tags.remove(id);
            Outcome::Applied(())
        });
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if self.edits != previous_edits {
                    if let Err(restore) = self.save_edits(previous_edits) {
                        tracing::warn!("Failed to restore saved edit for {}: {}", id, restore);
                    }
                }
                return Err(e);
            }
        };

        tracing::info!("Deleted custom template {}", id);
        Ok(outcome)
    }

    /// Append a new, empty named list
    ///
    /// A name already used by another list is a no-op.
    pub fn create_favorite_list(&mut self, name: &str) -> Result<Outcome<FavoriteList>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Outcome::Refused(Refusal::EmptyListName));
        }

        let outcome = self.update(|r| {
            if r.named_favorite_lists.iter().any(|l| l.name == name) {
                return Outcome::Unchanged;
            }
            let list = FavoriteList {
                id: new_id("favlist"),
                name: name.to_string(),
                template_ids: Vec::new(),
                created_at: Some(Utc::now()),
            };
            r.named_favorite_lists.push(list.clone());
            Outcome::Applied(list)
        })?;
        tracing::debug!("create_favorite_list({}): applied={}", name, outcome.is_applied());
        Ok(outcome)
    }

    pub fn add_template_to_list(&mut self, template_id: &str, list_id: &str) -> Result<Outcome> {
        let outcome = self.update(|r| {
            let Some(list) = r.named_favorite_lists.iter_mut().find(|l| l.id == list_id) else {
                return Outcome::Refused(Refusal::ListNotFound(list_id.to_string()));
            };
            if list.contains(template_id) {
                return Outcome::Unchanged;
            }
            list.template_ids.push(template_id.to_string());
            Outcome::Applied(())
        })?;
        tracing::debug!(
            "add_template_to_list({}, {}): {:?}",
            template_id,
            list_id,
            outcome
        );
        Ok(outcome)
    }

    pub fn remove_template_from_list(
        &mut self,
        template_id: &str,
        list_id: &str,
    ) -> Result<Outcome> {
        let outcome = self.update(|r| {
            let Some(list) = r.named_favorite_lists.iter_mut().find(|l| l.id == list_id) else {
                return Outcome::Refused(Refusal::ListNotFound(list_id.to_string()));
            };
            if !list.contains(template_id) {
                return Outcome::Unchanged;
            }
            list.template_ids.retain(|t| t != template_id);
            Outcome::Applied(())
        })?;
        tracing::debug!(
            "remove_template_from_list({}, {}): {:?}",
            template_id,
            list_id,
            outcome
        );
        Ok(outcome)
    }

    /// Remove a named list; its templates are neither deleted nor unfavorited
    pub fn delete_favorite_list(&mut self, list_id: &str) -> Result<Outcome> {
        let outcome = self.update(|r| {
            let before = r.named_favorite_lists.len();
            r.named_favorite_lists.retain(|l| l.id != list_id);
            if r.named_favorite_lists.len() == before {
                Outcome::Unchanged
            } else {
                Outcome::Applied(())
            }
        })?;
        tracing::debug!("delete_favorite_list({}): {:?}", list_id, outcome);
        Ok(outcome)
    }

    pub fn add_tag(&mut self, template_id: &str, tag: &str) -> Result<Outcome> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(Outcome::Refused(Refusal::EmptyTag));
        }
        if self.tags_for(template_id).iter().any(|t| t == tag) {
            return Ok(Outcome::Unchanged);
        }

        let outcome = self.update(|r| {
            r.template_tags
                .entry(template_id.to_string())
                .or_default()
                .push(tag.to_string());
            Outcome::Applied(())
        })?;
        tracing::debug!("add_tag({}, {}): {:?}", template_id, tag, outcome);
        Ok(outcome)
    }

    pub fn remove_tag(&mut self, template_id: &str, tag: &str) -> Result<Outcome> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(Outcome::Refused(Refusal::EmptyTag));
        }

        let outcome = self.update(|r| {
            let mut changed = false;

            let mut now_empty = false;
            if let Some(tags) = r.template_tags.get_mut(template_id) {
                let before = tags.len();
                tags.retain(|t| t != tag);
                changed |= tags.len() != before;
                now_empty = tags.is_empty();
            }
            if now_empty {
                r.template_tags.remove(template_id);
            }

            if let Some(template) = r.templates.iter_mut().find(|t| t.id == template_id) {
                let before = template.tags.len();
                template.tags.retain(|t| t != tag);
                changed |= template.tags.len() != before;
            }

            if changed {
                Outcome::Applied(())
            } else {
                Outcome::Unchanged
            }
        })?;
        tracing::debug!("remove_tag({}, {}): {:?}", template_id, tag, outcome);
        Ok(outcome)
    }

    /// Lock in a free-text fork of a template's generated body
    pub fn save_edit(&mut self, template_id: &str, text: &str) -> Result<Outcome> {
        if self.edits.get(template_id).is_some_and(|e| e == text) {
            return Ok(Outcome::Unchanged);
        }
        let mut edits = self.edits.clone();
        edits.insert(template_id.to_string(), text.to_string());
        self.save_edits(edits)?;
        tracing::debug!("Saved edit for {} ({} chars)", template_id, text.chars().count());
        Ok(Outcome::Applied(()))
    }

    /// Drop a saved fork, returning the template to its generated body
    pub fn clear_edit(&mut self, template_id: &str) -> Result<Outcome> {
        if !self.edits.contains_key(template_id) {
            return Ok(Outcome::Unchanged);
        }
        let mut edits = self.edits.clone();
        edits.remove(template_id);
        self.save_edits(edits)?;
        tracing::debug!("Cleared edit for {}", template_id);
        Ok(Outcome::Applied(()))
    }

    /// Presets followed by custom templates
    pub fn all_templates(&self) -> impl Iterator<Item = &Template> {
        presets::presets().chain(self.record.templates.iter())
    }

    /// Preset or custom template by id
    pub fn find_template(&self, id: &str) -> Option<&Template> {
        self.all_templates().find(|t| t.id == id)
    }

    pub fn is_preset(&self, id: &str) -> bool {
        presets::is_preset(id)
    }

    /// User-created templates in creation order (never presets)
    pub fn custom_templates(&self) -> &[Template] {
        &self.record.templates
    }

    pub fn favorite_lists(&self) -> &[FavoriteList] {
        &self.record.named_favorite_lists
    }

    pub fn find_list(&self, list_id: &str) -> Option<&FavoriteList> {
        self.record.find_list(list_id)
    }

    /// Recent templates, most recent first, skipping ids that no longer resolve
    pub fn recent_templates(&self) -> Vec<&Template> {
        self.record
            .recent
            .iter()
            .filter_map(|id| self.find_template(id))
            .collect()
    }

    /// Templates in the main favorites, skipping ids that no longer resolve
    pub fn favorite_templates(&self) -> Vec<&Template> {
        self.record
            .favorites
            .iter()
            .filter_map(|id| self.find_template(id))
            .collect()
    }

    /// Tags of a template: its own tags, then user-added ones
    pub fn tags_for(&self, template_id: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .record
            .find_custom(template_id)
            .map(|t| t.tags.clone())
            .unwrap_or_default();
        if let Some(extra) = self.record.template_tags.get(template_id) {
            tags.extend(extra.iter().cloned());
        }
        dedup_in_place(&mut tags);
        tags
    }

    pub fn templates_by_tag(&self, tag: &str) -> Vec<&Template> {
        self.all_templates()
            .filter(|t| self.tags_for(&t.id).iter().any(|x| x == tag))
            .collect()
    }

    /// Templates of a named list in list order; empty for an unknown list
    pub fn templates_in_list(&self, list_id: &str) -> Vec<&Template> {
        self.find_list(list_id)
            .map(|list| {
                list.template_ids
                    .iter()
                    .filter_map(|id| self.find_template(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every tag in use, de-duplicated and sorted
    pub fn all_unique_tags(&self) -> Vec<String> {
        let tags: BTreeSet<&String> = self
            .record
            .template_tags
            .values()
            .flatten()
            .chain(self.record.templates.iter().flat_map(|t| t.tags.iter()))
            .collect();
        tags.into_iter().cloned().collect()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.record.favorites.iter().any(|f| f == id)
    }

    /// In the main favorites or in any named list
    pub fn is_favorited_anywhere(&self, id: &str) -> bool {
        self.is_favorite(id) || self.record.named_favorite_lists.iter().any(|l| l.contains(id))
    }

    pub fn lists_containing(&self, id: &str) -> Vec<&FavoriteList> {
        self.record
            .named_favorite_lists
            .iter()
            .filter(|l| l.contains(id))
            .collect()
    }

    pub fn saved_edit(&self, template_id: &str) -> Option<&str> {
        self.edits.get(template_id).map(String::as_str)
    }

    pub fn edits(&self) -> &TemplateEdits {
        &self.edits
    }

    /// Render a template's body with `vars`; `None` for an unknown id
    pub fn generate(&self, template_id: &str, vars: &Variables) -> Option<String> {
        self.find_template(template_id)
            .map(|t| render_template(&t.body, vars))
    }
}

impl<B: StorageBackend + std::fmt::Debug> std::fmt::Debug for CollectionStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("backend", &self.backend)
            .field("custom_templates", &self.record.templates.len())
            .field("lists", &self.record.named_favorite_lists.len())
            .field("edits", &self.edits.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryStorage, MockStorageBackend};
    use crate::error::StoreError;
    use screener_prompt::TargetDate;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn store() -> CollectionStore<MemoryStorage> {
        CollectionStore::open(MemoryStorage::new())
    }

    fn custom(store: &mut CollectionStore<MemoryStorage>, name: &str) -> Template {
        store
            .create_template(NewTemplate::new(name, format!("2025年9月8日{name}量比大于3")))
            .unwrap()
            .applied()
            .unwrap()
    }

    #[test]
    fn test_open_empty() {
        let store = store();
        assert_eq!(store.record(), &CollectionRecord::default());
        assert!(store.edits().is_empty());
    }

    #[test]
    fn test_open_corrupt_blob() {
        let storage = MemoryStorage::new().with_entry(RECORD_KEY, "{not json");
        let store = CollectionStore::open(storage);
        assert_eq!(store.record(), &CollectionRecord::default());
    }

    #[test]
    fn test_open_partial_blob() {
        let storage = MemoryStorage::new().with_entry(
            RECORD_KEY,
            r#"{"templates":[],"favorites":["morning_aggressive"],"recent":["midday_momentum"]}"#,
        );
        let store = CollectionStore::open(storage);
        assert!(store.is_favorite("morning_aggressive"));
        assert_eq!(store.recent_templates()[0].id, "midday_momentum");
        assert!(store.favorite_lists().is_empty());
    }

    #[test]
    fn test_recent_order_and_cap() {
        let mut store = store();
        store.add_to_recent("a").unwrap();
        assert!(store.add_to_recent("a").unwrap().is_unchanged());
        store.add_to_recent("b").unwrap();
        assert_eq!(store.record().recent, vec!["b", "a"]);

        for id in ["c", "d", "e", "f", "g"] {
            store.add_to_recent(id).unwrap();
        }
        assert_eq!(store.record().recent, vec!["g", "f", "e", "d", "c"]);

        store.add_to_recent("e").unwrap();
        assert_eq!(store.record().recent, vec!["e", "g", "f", "d", "c"]);
    }

    #[test]
    fn test_recent_templates_skip_missing() {
        let mut store = store();
        store.add_to_recent("morning_aggressive").unwrap();
        store.add_to_recent("custom_gone").unwrap();
        let names: Vec<_> = store.recent_templates().iter().map(|t| t.id.clone()).collect();
        assert_eq!(names, vec!["morning_aggressive"]);
    }

    #[test]
    fn test_set_favorite() {
        let mut store = store();
        assert!(store.set_favorite("midday_momentum", true).unwrap().is_applied());
        assert!(store.set_favorite("midday_momentum", true).unwrap().is_unchanged());
        assert!(store.is_favorite("midday_momentum"));
        assert_eq!(store.favorite_templates().len(), 1);

        assert!(store.set_favorite("midday_momentum", false).unwrap().is_applied());
        assert!(store.set_favorite("midday_momentum", false).unwrap().is_unchanged());
        assert!(!store.is_favorite("midday_momentum"));
    }

    #[test]
    fn test_set_favorite_leaves_lists() {
        let mut store = store();
        let list = store.create_favorite_list("早盘策略").unwrap().applied().unwrap();
        store.add_template_to_list("morning_aggressive", &list.id).unwrap();
        store.set_favorite("morning_aggressive", true).unwrap();
        store.set_favorite("morning_aggressive", false).unwrap();

        assert!(store.is_favorited_anywhere("morning_aggressive"));
        assert_eq!(store.lists_containing("morning_aggressive").len(), 1);
    }

    #[test]
    fn test_unfavorite_everywhere() {
        let mut store = store();
        let a = store.create_favorite_list("A").unwrap().applied().unwrap();
        let b = store.create_favorite_list("B").unwrap().applied().unwrap();
        store.set_favorite("end_day_grab", true).unwrap();
        store.add_template_to_list("end_day_grab", &a.id).unwrap();
        store.add_template_to_list("end_day_grab", &b.id).unwrap();
        store.add_template_to_list("midday_momentum", &b.id).unwrap();

        assert!(store.unfavorite_everywhere("end_day_grab").unwrap().is_applied());
        assert!(!store.is_favorited_anywhere("end_day_grab"));
        assert!(store.is_favorited_anywhere("midday_momentum"));
        assert!(store.unfavorite_everywhere("end_day_grab").unwrap().is_unchanged());
    }

    #[test]
    fn test_create_template() {
        let mut store = store();
        let template = store
            .create_template(NewTemplate::new("  我的模板  ", "2025年9月8日量比大于3").tag("激进"))
            .unwrap()
            .applied()
            .unwrap();

        assert!(template.id.starts_with("custom_"));
        assert_eq!(template.name, "我的模板");
        assert_eq!(template.description, DEFAULT_DESCRIPTION);
        assert!(template.created_at.is_some());
        assert_eq!(store.custom_templates().len(), 1);
        assert_eq!(store.tags_for(&template.id), vec!["激进"]);
        assert!(!store.is_preset(&template.id));
    }

    #[test]
    fn test_create_template_refusals() {
        let mut store = store();
        assert_eq!(
            store.create_template(NewTemplate::new(" ", "body")).unwrap(),
            Outcome::Refused(Refusal::EmptyName)
        );
        assert_eq!(
            store.create_template(NewTemplate::new("name", "\n")).unwrap(),
            Outcome::Refused(Refusal::EmptyBody)
        );
        assert!(store.custom_templates().is_empty());
        assert!(store.backend().is_empty());
    }

    #[test]
    fn test_rapid_ids_are_unique() {
        let mut store = store();
        let ids: BTreeSet<String> = (0..50).map(|i| custom(&mut store, &format!("t{i}")).id).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_custom_templates_exclude_presets() {
        let mut store = store();
        custom(&mut store, "mine");
        assert!(store.custom_templates().iter().all(|t| !store.is_preset(&t.id)));
        assert_eq!(store.all_templates().count(), 6);
    }

    #[test]
    fn test_delete_template_cascades() {
        let mut store = store();
        let t = custom(&mut store, "doomed");
        let keep = custom(&mut store, "kept");
        let list = store.create_favorite_list("L").unwrap().applied().unwrap();

        store.set_favorite(&t.id, true).unwrap();
        store.add_template_to_list(&t.id, &list.id).unwrap();
        store.add_template_to_list(&keep.id, &list.id).unwrap();
        store.add_to_recent(&t.id).unwrap();
        store.add_tag(&t.id, "早盘").unwrap();
        store.save_edit(&t.id, "改过的").unwrap();

        assert!(store.delete_template(&t.id).unwrap().is_applied());

        let r = store.record();
        assert!(r.find_custom(&t.id).is_none());
        assert!(!r.favorites.contains(&t.id));
        assert!(!r.recent.contains(&t.id));
        assert!(!r.template_tags.contains_key(&t.id));
        assert_eq!(store.templates_in_list(&list.id).len(), 1);
        assert!(store.saved_edit(&t.id).is_none());
        assert!(store.find_template(&keep.id).is_some());
    }

    #[test]
    fn test_delete_preset_refused() {
        let mut store = store();
        store.set_favorite("morning_conservative", true).unwrap();
        let before = store.record().clone();

        let outcome = store.delete_template("morning_conservative").unwrap();
        assert_eq!(
            outcome,
            Outcome::Refused(Refusal::PresetTemplate("morning_conservative".to_string()))
        );
        assert_eq!(store.record(), &before);
        assert!(store.find_template("morning_conservative").is_some());
    }

    #[test]
    fn test_delete_unknown_refused() {
        let mut store = store();
        assert!(store.delete_template("custom_nope").unwrap().is_refused());
    }

    #[test]
    fn test_favorite_list_duplicate_name() {
        let mut store = store();
        assert!(store.create_favorite_list("早盘策略").unwrap().is_applied());
        assert!(store.create_favorite_list("早盘策略").unwrap().is_unchanged());
        assert!(store.create_favorite_list(" 早盘策略 ").unwrap().is_unchanged());
        assert_eq!(
            store.create_favorite_list("").unwrap(),
            Outcome::Refused(Refusal::EmptyListName)
        );

        let named: Vec<_> = store
            .favorite_lists()
            .iter()
            .filter(|l| l.name == "早盘策略")
            .collect();
        assert_eq!(named.len(), 1);
        assert!(named[0].id.starts_with("favlist_"));
    }

    #[test]
    fn test_list_membership() {
        let mut store = store();
        let list = store.create_favorite_list("L").unwrap().applied().unwrap();

        assert!(store.add_template_to_list("midday_momentum", &list.id).unwrap().is_applied());
        assert!(store.add_template_to_list("midday_momentum", &list.id).unwrap().is_unchanged());
        assert_eq!(store.templates_in_list(&list.id)[0].id, "midday_momentum");

        assert!(store.remove_template_from_list("midday_momentum", &list.id).unwrap().is_applied());
        assert!(store.remove_template_from_list("midday_momentum", &list.id).unwrap().is_unchanged());
        assert!(store.templates_in_list(&list.id).is_empty());

        assert_eq!(
            store.add_template_to_list("midday_momentum", "favlist_missing").unwrap(),
            Outcome::Refused(Refusal::ListNotFound("favlist_missing".to_string()))
        );
        assert!(store.templates_in_list("favlist_missing").is_empty());
    }

    #[test]
    fn test_delete_favorite_list_keeps_templates() {
        let mut store = store();
        let t = custom(&mut store, "kept");
        let list = store.create_favorite_list("L").unwrap().applied().unwrap();
        store.add_template_to_list(&t.id, &list.id).unwrap();
        store.set_favorite(&t.id, true).unwrap();

        assert!(store.delete_favorite_list(&list.id).unwrap().is_applied());
        assert!(store.delete_favorite_list(&list.id).unwrap().is_unchanged());
        assert!(store.find_template(&t.id).is_some());
        assert!(store.is_favorite(&t.id));
    }

    #[test]
    fn test_tags() {
        let mut store = store();
        assert!(store.add_tag("morning_aggressive", "激进").unwrap().is_applied());
        assert!(store.add_tag("morning_aggressive", "激进").unwrap().is_unchanged());
        assert!(store.add_tag("morning_aggressive", "Aggressive").unwrap().is_applied());
        assert!(store.add_tag("morning_aggressive", "aggressive").unwrap().is_applied());
        assert!(store.add_tag("midday_momentum", "激进").unwrap().is_applied());
        assert_eq!(
            store.add_tag("midday_momentum", "  ").unwrap(),
            Outcome::Refused(Refusal::EmptyTag)
        );

        assert_eq!(store.tags_for("morning_aggressive").len(), 3);
        assert_eq!(store.templates_by_tag("激进").len(), 2);
        assert_eq!(
            store.all_unique_tags(),
            vec!["Aggressive", "aggressive", "激进"]
        );

        assert!(store.remove_tag("morning_aggressive", "激进").unwrap().is_applied());
        assert!(store.remove_tag("morning_aggressive", "激进").unwrap().is_unchanged());
        assert_eq!(store.templates_by_tag("激进").len(), 1);
    }

    #[test]
    fn test_remove_inline_tag() {
        let mut store = store();
        let t = store
            .create_template(NewTemplate::new("n", "b").tag("x"))
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(store.templates_by_tag("x").len(), 1);
        assert!(store.remove_tag(&t.id, "x").unwrap().is_applied());
        assert!(store.templates_by_tag("x").is_empty());
        assert!(store.all_unique_tags().is_empty());
    }

    #[test]
    fn test_edits() {
        let mut store = store();
        assert!(store.save_edit("midday_momentum", "fork").unwrap().is_applied());
        assert!(store.save_edit("midday_momentum", "fork").unwrap().is_unchanged());
        assert_eq!(store.saved_edit("midday_momentum"), Some("fork"));

        assert!(store.clear_edit("midday_momentum").unwrap().is_applied());
        assert!(store.clear_edit("midday_momentum").unwrap().is_unchanged());
        assert_eq!(store.saved_edit("midday_momentum"), None);
    }

    #[test]
    fn test_mutations_persist() {
        let storage = MemoryStorage::new();
        let mut store = CollectionStore::open(storage.clone());
        let t = custom(&mut store, "persisted");
        store.set_favorite(&t.id, true).unwrap();
        store.save_edit(&t.id, "fork").unwrap();

        let reopened = CollectionStore::open(storage);
        assert_eq!(reopened.record(), store.record());
        assert_eq!(reopened.saved_edit(&t.id), Some("fork"));
        assert_eq!(reopened.load(), *store.record());
    }

    #[test]
    fn test_generate() {
        let store = store();
        let vars = screener_prompt::Variables::with_target_date(TargetDate::new(2025, 9, 9).unwrap());
        let out = store.generate("midday_momentum", &vars).unwrap();
        assert!(out.starts_with("2025年9月9日10:30至11:00"));
        assert!(!out.contains("2025年9月8日"));
        assert!(store.generate("custom_missing", &vars).is_none());
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let mut backend = MockStorageBackend::new();
        backend.expect_get().returning(|_| Ok(None));
        backend.expect_set().returning(|key, _| {
            Err(StoreError::Backend {
                key: key.to_string(),
                detail: "quota exceeded".to_string(),
            })
        });

        let mut store = CollectionStore::open(backend);
        let err = store.set_favorite("morning_aggressive", true).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(!store.is_favorite("morning_aggressive"));
        assert!(store.save_edit("morning_aggressive", "x").is_err());
        assert!(store.saved_edit("morning_aggressive").is_none());
    }

    #[test]
    fn test_refusal_skips_backend() {
        let mut backend = MockStorageBackend::new();
        backend.expect_get().returning(|_| Ok(None));
        backend.expect_set().never();

        let mut store = CollectionStore::open(backend);
        assert!(store.delete_template("morning_aggressive").unwrap().is_refused());
        assert!(store.create_favorite_list("").unwrap().is_refused());
        assert!(store.set_favorite("x", false).unwrap().is_unchanged());
        assert!(store.clear_edit("x").unwrap().is_unchanged());
    }

    /// Memory backend that rejects writes to one key while `failing` is set
    #[derive(Clone)]
    struct FlakyStorage {
        inner: MemoryStorage,
        key: &'static str,
        failing: Arc<AtomicBool>,
    }

    impl FlakyStorage {
        fn new(key: &'static str) -> Self {
            Self {
                inner: MemoryStorage::new(),
                key,
                failing: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl StorageBackend for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if key == self.key && self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Backend {
                    key: key.to_string(),
                    detail: "write rejected".to_string(),
                });
            }
            self.inner.set(key, value)
        }
    }

    fn store_with_edited_favorite(
        storage: &FlakyStorage,
    ) -> (CollectionStore<FlakyStorage>, String) {
        let mut store = CollectionStore::open(storage.clone());
        let t = store
            .create_template(NewTemplate::new("带编辑", "2025年9月8日量比大于3"))
            .unwrap()
            .applied()
            .unwrap();
        store.set_favorite(&t.id, true).unwrap();
        store.save_edit(&t.id, "fork").unwrap();
        (store, t.id)
    }

    #[test]
    fn test_delete_with_failing_edits_write_changes_nothing() {
        let storage = FlakyStorage::new(EDITS_KEY);
        let (mut store, id) = store_with_edited_favorite(&storage);
        storage.failing.store(true, Ordering::SeqCst);

        assert!(store.delete_template(&id).is_err());
        assert!(store.find_template(&id).is_some());
        assert!(store.is_favorite(&id));
        assert_eq!(store.saved_edit(&id), Some("fork"));

        let reopened = CollectionStore::open(storage);
        assert!(reopened.find_template(&id).is_some());
        assert!(reopened.is_favorite(&id));
        assert_eq!(reopened.saved_edit(&id), Some("fork"));
    }

    #[test]
    fn test_delete_with_failing_record_write_restores_edit() {
        let storage = FlakyStorage::new(RECORD_KEY);
        let (mut store, id) = store_with_edited_favorite(&storage);
        storage.failing.store(true, Ordering::SeqCst);

        assert!(store.delete_template(&id).is_err());
        assert!(store.find_template(&id).is_some());
        assert_eq!(store.saved_edit(&id), Some("fork"));

        let reopened = CollectionStore::open(storage);
        assert!(reopened.find_template(&id).is_some());
        assert_eq!(reopened.saved_edit(&id), Some("fork"));
    }

    #[test]
    fn test_failed_read_falls_back_to_empty() {
        let mut backend = MockStorageBackend::new();
        backend.expect_get().returning(|key| {
            Err(StoreError::Backend {
                key: key.to_string(),
                detail: "denied".to_string(),
            })
        });
        let store = CollectionStore::open(backend);
        assert_eq!(store.record(), &CollectionRecord::default());
    }
}
