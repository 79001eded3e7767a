//! Editor session state machine
//!
//! A session tracks which template is shown, for which date, and whether the
//! user sees the generated text, is typing into a buffer, or is looking at a
//! saved fork:
//!
//! ```text
//!            start_edit              save / cancel (fork exists)
//! Generated ───────────▶ Editing ─────────────────────────────▶ Locked
//!     ▲                    │  ▲                                   │
//!     │  restore / cancel  │  └──────────── start_edit ───────────┘
//!     └────────────────────┘                                      │
//!     ▲                              restore                      │
//!     └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Date changes re-render in `Generated`, re-date the fork in `Locked` and
//! are deferred while `Editing`.

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::outcome::{Outcome, Refusal};
use crate::presets;
use crate::store::CollectionStore;
use screener_prompt::{TargetDate, Variables, rerender_preserving_edits};
use serde::{Deserialize, Serialize};

/// Shown when a fork has no date to move
pub const DATE_WARNING: &str =
    "⚠️ 日期格式提示: 在已保存的编辑内容中未找到可识别的日期格式，日期更改未自动应用。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorState {
    /// Showing the template rendered for the target date
    Generated,
    /// The user is typing; nothing is re-rendered underneath
    Editing,
    /// Showing the saved fork
    Locked,
}

/// What a target-date change did to the displayed text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateChange {
    /// Generated text follows the new date
    Regenerated,
    /// The fork's first date was moved and the fork saved
    Redated,
    /// The fork has no recognisable date and was left as is
    DateNotFound,
    /// Mid-edit; the buffer is untouched
    Deferred,
    /// No template selected
    NoTemplate,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    template_id: Option<String>,
    target_date: TargetDate,
    state: EditorState,
    buffer: String,
    date_warning: bool,
}

impl EditorSession {
    /// An empty session with nothing selected
    pub fn new(target_date: TargetDate) -> Self {
        Self {
            template_id: None,
            target_date,
            state: EditorState::Generated,
            buffer: String::new(),
            date_warning: false,
        }
    }

    /// Reopen on the most recent template, or the first preset
    ///
    /// Does not touch the recent list.
    pub fn resume<B: StorageBackend>(
        store: &mut CollectionStore<B>,
        target_date: TargetDate,
    ) -> Result<Self> {
        let mut session = Self::new(target_date);
        let id = store
            .recent_templates()
            .first()
            .map(|t| t.id.clone())
            .or_else(|| presets::default_preset().map(|t| t.id.clone()));

        if let Some(id) = id {
            tracing::debug!("Resuming editor on {}", id);
            session.template_id = Some(id);
            session.enter_resting_state(store)?;
        }
        Ok(session)
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub fn target_date(&self) -> TargetDate {
        self.target_date
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Set when the last re-dating found no date in the fork
    pub fn date_warning(&self) -> bool {
        self.date_warning
    }

    /// The selected template rendered for the target date
    pub fn generated<B: StorageBackend>(&self, store: &CollectionStore<B>) -> Option<String> {
        let id = self.template_id.as_deref()?;
        store.generate(id, &Variables::with_target_date(self.target_date))
    }

    /// What the user currently sees
    pub fn display_text<B: StorageBackend>(&self, store: &CollectionStore<B>) -> Option<String> {
        match self.state {
            EditorState::Editing => Some(self.buffer.clone()),
            EditorState::Locked => self
                .template_id
                .as_deref()
                .and_then(|id| store.saved_edit(id))
                .map(str::to_string)
                .or_else(|| self.generated(store)),
            EditorState::Generated => self.generated(store),
        }
    }

    /// Switch to another template
    ///
    /// A non-empty in-progress buffer is stashed as the old template's fork.
    /// The new template is recorded in recents and shown locked if it has a
    /// fork, generated otherwise.
    pub fn select<B: StorageBackend>(
        &mut self,
        store: &mut CollectionStore<B>,
        template_id: &str,
    ) -> Result<Outcome> {
        if store.find_template(template_id).is_none() {
            return Ok(Outcome::Refused(Refusal::TemplateNotFound(
                template_id.to_string(),
            )));
        }

        if self.state == EditorState::Editing && !self.buffer.is_empty() {
            if let Some(previous) = self.template_id.as_deref() {
                store.save_edit(previous, &self.buffer)?;
            }
        }

        self.template_id = Some(template_id.to_string());
        self.buffer.clear();
        store.add_to_recent(template_id)?;
        self.enter_resting_state(store)?;

        tracing::debug!("Selected {} ({:?})", template_id, self.state);
        Ok(Outcome::Applied(()))
    }

    /// Copy the displayed text into the buffer and start editing
    ///
    /// Returns false when nothing is selected or already editing.
    pub fn start_edit<B: StorageBackend>(&mut self, store: &CollectionStore<B>) -> bool {
        if self.state == EditorState::Editing {
            return false;
        }
        let Some(text) = self.display_text(store) else {
            return false;
        };
        self.buffer = text;
        self.state = EditorState::Editing;
        true
    }

    /// Replace the buffer; ignored outside `Editing`
    pub fn edit(&mut self, text: impl Into<String>) -> bool {
        if self.state != EditorState::Editing {
            return false;
        }
        self.buffer = text.into();
        true
    }

    /// Persist the buffer as the template's fork and lock it
    pub fn save<B: StorageBackend>(&mut self, store: &mut CollectionStore<B>) -> Result<Outcome> {
        let Some(id) = self.template_id.clone() else {
            return Ok(Outcome::Unchanged);
        };
        if self.state != EditorState::Editing {
            return Ok(Outcome::Unchanged);
        }

        let outcome = store.save_edit(&id, &self.buffer)?;
        self.buffer.clear();
        self.enter_resting_state(store)?;
        Ok(outcome)
    }

    /// Leave edit mode without saving the buffer
    pub fn cancel<B: StorageBackend>(&mut self, store: &mut CollectionStore<B>) -> Result<()> {
        if self.state != EditorState::Editing {
            return Ok(());
        }
        self.buffer.clear();
        self.enter_resting_state(store)?;
        Ok(())
    }

    /// Drop the fork and show the generated text again
    pub fn restore<B: StorageBackend>(
        &mut self,
        store: &mut CollectionStore<B>,
    ) -> Result<Outcome> {
        let Some(id) = self.template_id.clone() else {
            return Ok(Outcome::Unchanged);
        };
        let outcome = store.clear_edit(&id)?;
        self.buffer.clear();
        self.state = EditorState::Generated;
        self.date_warning = false;
        Ok(outcome)
    }

    /// Move the session to a new target date
    pub fn set_target_date<B: StorageBackend>(
        &mut self,
        store: &mut CollectionStore<B>,
        date: TargetDate,
    ) -> Result<DateChange> {
        self.target_date = date;
        if self.template_id.is_none() {
            return Ok(DateChange::NoTemplate);
        }
        let change = match self.state {
            EditorState::Generated => DateChange::Regenerated,
            EditorState::Editing => DateChange::Deferred,
            EditorState::Locked => self.enter_resting_state(store)?,
        };
        tracing::debug!("Target date {} -> {:?}", date.iso(), change);
        Ok(change)
    }

    /// Settle into `Locked` if a fork exists, `Generated` otherwise
    ///
    /// Entering `Locked` re-dates the fork to the session's target date.
    fn enter_resting_state<B: StorageBackend>(
        &mut self,
        store: &mut CollectionStore<B>,
    ) -> Result<DateChange> {
        let Some(id) = self.template_id.clone() else {
            self.state = EditorState::Generated;
            return Ok(DateChange::NoTemplate);
        };
        let Some(fork) = store.saved_edit(&id).map(str::to_string) else {
            self.state = EditorState::Generated;
            self.date_warning = false;
            return Ok(DateChange::Regenerated);
        };

        self.state = EditorState::Locked;
        let rerendered = rerender_preserving_edits(&fork, self.target_date);
        if !rerendered.date_found {
            tracing::warn!("No date found in saved edit for {}", id);
            self.date_warning = true;
            return Ok(DateChange::DateNotFound);
        }

        self.date_warning = false;
        if rerendered.text != fork {
            store.save_edit(&id, &rerendered.text)?;
        }
        Ok(DateChange::Redated)
    }
}
