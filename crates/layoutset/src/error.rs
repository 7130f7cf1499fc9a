//! Error types for layout-set import and export.

use thiserror::Error;

/// Errors raised by the codec and the import engine.
///
/// All variants are locally recoverable: the failing operation is aborted
/// without mutating the collection, and the error is surfaced to the user.
#[derive(Debug, Error)]
pub enum SetError {
    /// The file is not the expected JSON shape. Covers parse failures and
    /// structural problems such as `bboxes` and `labels` differing in
    /// length.
    #[error("malformed layout-set file: {0}")]
    MalformedFile(String),

    /// A category label in the file has no corresponding vocabulary entry.
    /// The whole file is rejected; labels are never mapped to a default
    /// category.
    #[error("label {label} at entry {entry} is out of range for a {vocab_len}-category vocabulary")]
    LabelOutOfRange {
        /// Position of the offending entry in the file.
        entry: usize,
        /// The out-of-range label value.
        label: u32,
        /// Number of categories in the session vocabulary.
        vocab_len: usize,
    },

    /// Export was requested with zero records in the collection.
    #[error("refusing to export an empty layout set")]
    EmptyExport,
}

impl From<serde_json::Error> for SetError {
    fn from(err: serde_json::Error) -> Self {
        SetError::MalformedFile(err.to_string())
    }
}
