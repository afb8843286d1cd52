//! Note store - local JSON-file persistence for user-authored prompts

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A user-authored prompt note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to an existing note
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the category
    pub category: Option<Option<String>>,
}

/// JSON-file-backed note store
pub struct NoteStore {
    path: PathBuf,
    notes: Vec<Note>,
}

impl NoteStore {
    /// Open a store backed by the given file, creating an empty store if the
    /// file is missing. A corrupt file is logged and replaced on next save
    /// rather than failing the whole application.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let notes = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(notes) => notes,
                    Err(e) => {
                        warn!("Failed to parse note store, starting empty: {}", e);
                        Vec::new()
                    }
                },
                Err(e) => {
                    warn!("Failed to read note store, starting empty: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(Self { path, notes })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored notes
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Persist the store to its backing file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.notes)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Create a note and persist the store
    pub fn create(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
        category: Option<String>,
    ) -> Result<Note> {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            tags,
            category,
            created_at: now,
            updated_at: now,
        };
        self.notes.push(note.clone());
        self.save()?;
        Ok(note)
    }

    /// Apply a patch to an existing note and persist the store
    pub fn update(&mut self, id: Uuid, patch: NotePatch) -> Result<Note> {
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| anyhow!("note not found: {}", id))?;

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(tags) = patch.tags {
            note.tags = tags;
        }
        if let Some(category) = patch.category {
            note.category = category;
        }
        note.updated_at = Utc::now();

        let updated = note.clone();
        self.save()?;
        Ok(updated)
    }

    /// Delete a note by id, returning whether it existed
    pub fn delete(&mut self, id: Uuid) -> Result<bool> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        let removed = self.notes.len() < before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Fetch a single note
    pub fn get(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// All notes, most recently updated first
    pub fn list(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.iter().collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    /// Case-insensitive substring search over title, content, and tags,
    /// most recently updated first
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.list();
        }

        let mut matches: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&query)
                    || n.content.to_lowercase().contains(&query)
                    || n.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matches
    }

    /// Insert or replace a note as-is, without touching timestamps.
    /// Used by bulk import; call `save` when the batch is done.
    pub(crate) fn upsert_raw(&mut self, note: Note) {
        if let Some(existing) = self.notes.iter_mut().find(|n| n.id == note.id) {
            *existing = note;
        } else {
            self.notes.push(note);
        }
    }
}
