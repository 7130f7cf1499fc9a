#![warn(missing_docs)]
//! Core primitives shared across the workspace: the category vocabulary
//! and the layout record model.

pub mod record;
pub mod vocabulary;

// Re-export commonly used types
pub use record::{IdAllocator, LayoutId, LayoutRecord};
pub use vocabulary::{CategoryDef, CategoryId, Vocabulary, VocabularyError};
