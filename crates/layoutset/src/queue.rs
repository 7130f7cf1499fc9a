//! Pending-import queue for batch review of multiple saved sets.
//!
//! When a single upload action supplies several files, the first is applied
//! immediately, merged onto the current collection, and the rest are held
//! here in arrival order. Advancing pops the next file and applies it with
//! full replacement, clearing the scene between files. Files stay raw until
//! they are applied, so a malformed file only fails at its own turn and
//! never takes the rest of the queue down with it.

use crate::codec::SerializedSet;
use crate::error::SetError;
use crate::set::{ImportOutcome, LayoutSet};
use std::collections::VecDeque;
use tracing::warn;

/// One uploaded file waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// Display name of the uploaded file.
    pub name: String,
    /// Raw file contents, parsed only when the file is applied.
    pub contents: String,
}

impl PendingFile {
    /// Wrap raw file contents.
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    fn parse(&self) -> Result<SerializedSet, SetError> {
        SerializedSet::from_json(&self.contents)
    }
}

/// FIFO queue of files from a multi-file upload.
#[derive(Debug, Clone, Default)]
pub struct ImportQueue {
    pending: VecDeque<PendingFile>,
}

impl ImportQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no files are waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Names of the waiting files, in application order.
    pub fn names(&self) -> Vec<&str> {
        self.pending.iter().map(|f| f.name.as_str()).collect()
    }

    /// Drop all waiting files.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Apply an upload of one or more files.
    ///
    /// The first file is parsed and merged onto the current collection; any
    /// remaining files are queued for [`ImportQueue::advance`]. If the first
    /// file fails to parse or validate, nothing is applied and nothing is
    /// queued.
    pub fn upload(
        &mut self,
        set: &mut LayoutSet,
        mut files: Vec<PendingFile>,
    ) -> Result<ImportOutcome, SetError> {
        if files.is_empty() {
            return Err(SetError::MalformedFile("upload contained no files".into()));
        }
        let first = files.remove(0);
        let parsed = first.parse()?;
        let outcome = set.import(&parsed, false)?;
        self.pending.extend(files);
        Ok(outcome)
    }

    /// Pop the next file and apply it with full replacement.
    ///
    /// Returns `Ok(None)` when the queue is empty. A file that fails to
    /// parse or validate is consumed and reported, the collection is left
    /// untouched, and later files remain queued.
    pub fn advance(&mut self, set: &mut LayoutSet) -> Result<Option<ImportOutcome>, SetError> {
        let Some(file) = self.pending.pop_front() else {
            return Ok(None);
        };
        let parsed = file.parse().inspect_err(|err| {
            warn!(file = %file.name, %err, "skipping malformed queued layout set");
        })?;
        let outcome = set.import(&parsed, true)?;
        Ok(Some(outcome))
    }
}
