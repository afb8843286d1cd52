//! promptglow library - prompt authoring and AI enhancement

pub mod config;
pub mod enhancer;
pub mod error;
pub mod notes;
pub mod service;

// Re-export commonly used types
pub use config::{default_models, Config};
pub use enhancer::{
    ConnectionState, ConnectionTracker, DomainContext, EnhancementClient, EnhancementLevel,
    EnhancementRequest, EnhancementResult, EnhancerOptions,
};
pub use error::EnhanceError;
pub use notes::{Note, NoteStore};
