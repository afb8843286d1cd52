//! Bulk import/export of note data

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::store::{Note, NoteStore};

/// Bundle format version accepted by `import_notes`
pub const BUNDLE_VERSION: u32 = 1;

/// Serialized note bundle
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub notes: Vec<Note>,
}

/// Result of an import merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Write the whole store to a bundle file, returning the note count
pub fn export_notes(store: &NoteStore, path: &Path) -> Result<usize> {
    let bundle = NoteBundle {
        version: BUNDLE_VERSION,
        exported_at: Utc::now(),
        notes: store.list().into_iter().cloned().collect(),
    };

    let content = serde_json::to_string_pretty(&bundle)?;
    fs::write(path, content)?;

    info!("Exported {} notes to {:?}", bundle.notes.len(), path);
    Ok(bundle.notes.len())
}

/// Merge a bundle file into the store.
///
/// Notes are matched by id; an incoming note replaces an existing one only
/// when its `updated_at` is newer. Unknown ids are inserted as-is.
pub fn import_notes(store: &mut NoteStore, path: &Path) -> Result<ImportStats> {
    let content = fs::read_to_string(path)?;
    let bundle: NoteBundle =
        serde_json::from_str(&content).map_err(|e| anyhow!("invalid note bundle: {}", e))?;

    if bundle.version != BUNDLE_VERSION {
        return Err(anyhow!(
            "unsupported bundle version {} (expected {})",
            bundle.version,
            BUNDLE_VERSION
        ));
    }

    let mut stats = ImportStats::default();

    for incoming in bundle.notes {
        match store.get(incoming.id) {
            Some(existing) if existing.updated_at >= incoming.updated_at => {
                stats.skipped += 1;
            }
            Some(_) => {
                store.upsert_raw(incoming);
                stats.updated += 1;
            }
            None => {
                store.upsert_raw(incoming);
                stats.imported += 1;
            }
        }
    }

    store.save()?;

    info!(
        "Imported notes from {:?}: {} new, {} updated, {} skipped",
        path, stats.imported, stats.updated, stats.skipped
    );
    Ok(stats)
}
