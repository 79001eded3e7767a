//! Persistent template collection for screener-rs
//!
//! This crate keeps the user's library of screening condition templates:
//! custom templates, favorites, named favorite lists, tags, recents and
//! hand-edited forks. Everything is stored as one JSON record behind a
//! pluggable key/value backend.
//!
//! # Features
//!
//! - **Preset catalog**: read-only templates grouped by trading session
//! - **Referential cleanup**: deleting a template removes it everywhere
//! - **Lenient loading**: corrupt or partial data never blocks startup
//! - **Editor session**: explicit Generated / Editing / Locked state machine
//!
//! # Quick Start
//!
//! ```
//! use screener_store::{CollectionStore, MemoryStorage, Outcome, Refusal};
//!
//! let mut store = CollectionStore::open(MemoryStorage::new());
//!
//! let list = store.create_favorite_list("早盘策略").unwrap().applied().unwrap();
//! store.add_template_to_list("morning_aggressive", &list.id).unwrap();
//! store.add_tag("morning_aggressive", "激进").unwrap();
//!
//! assert_eq!(store.templates_by_tag("激进").len(), 1);
//! assert!(store.is_favorited_anywhere("morning_aggressive"));
//!
//! // Presets are never deleted
//! let outcome = store.delete_template("morning_aggressive").unwrap();
//! assert!(matches!(outcome, Outcome::Refused(Refusal::PresetTemplate(_))));
//! ```
//!
//! # Editing
//!
//! ```
//! use screener_prompt::TargetDate;
//! use screener_store::{CollectionStore, DateChange, EditorSession, EditorState, MemoryStorage};
//!
//! let mut store = CollectionStore::open(MemoryStorage::new());
//! let mut session = EditorSession::new(TargetDate::new(2025, 9, 8).unwrap());
//!
//! session.select(&mut store, "end_day_grab").unwrap();
//! session.start_edit(&store);
//! session.edit("2025年9月8日14:30量比大于5");
//! session.save(&mut store).unwrap();
//! assert_eq!(session.state(), EditorState::Locked);
//!
//! let change = session
//!     .set_target_date(&mut store, TargetDate::new(2025, 9, 9).unwrap())
//!     .unwrap();
//! assert_eq!(change, DateChange::Redated);
//! assert_eq!(store.saved_edit("end_day_grab"), Some("2025年9月9日14:30量比大于5"));
//! ```

mod backend;
mod editor;
mod error;
mod model;
mod outcome;
mod store;

pub mod presets;

// Re-export core types
pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use editor::{DATE_WARNING, DateChange, EditorSession, EditorState};
pub use error::{Result, StoreError};
pub use model::{
    CollectionRecord, EDITS_KEY, FavoriteList, NewTemplate, RECENT_LIMIT, RECORD_KEY,
    SCHEMA_VERSION, Template, TemplateEdits,
};
pub use outcome::{Outcome, Refusal};
pub use presets::PresetCategory;
pub use store::{CollectionStore, DEFAULT_DESCRIPTION};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{FileStorage, MemoryStorage, StorageBackend};
    pub use crate::editor::{DateChange, EditorSession, EditorState};
    pub use crate::error::{Result, StoreError};
    pub use crate::model::{CollectionRecord, FavoriteList, NewTemplate, Template};
    pub use crate::outcome::{Outcome, Refusal};
    pub use crate::store::CollectionStore;
}
