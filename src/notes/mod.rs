//! Local note persistence and bulk transfer

pub mod store;
pub mod transfer;

pub use store::{Note, NotePatch, NoteStore};
pub use transfer::{export_notes, import_notes, ImportStats, NoteBundle, BUNDLE_VERSION};
