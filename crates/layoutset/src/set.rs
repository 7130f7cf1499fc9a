//! The layout-set collection and its merge/import engine.

use crate::codec::{DecodedBox, SerializedSet};
use crate::error::SetError;
use glam::Vec3;
use roomtag_core::{CategoryId, IdAllocator, LayoutRecord, Vocabulary, VocabularyError};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Default render opacity for annotation boxes.
pub const DEFAULT_OPACITY: f32 = 0.6;

/// Summary of an applied import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Records materialized from the imported set.
    pub added: usize,
    /// Records in the collection after the import.
    pub total: usize,
    /// Whether the previous collection was discarded first.
    pub replaced: bool,
}

/// Session-scoped collection of layout records.
///
/// Holds the records in display order together with the derived per-category
/// counts, the running id sequence and the session-global opacity. Counts are
/// maintained incrementally and never contain zero entries; imports are
/// computed off to the side and published atomically so counts can never be
/// observed inconsistent with the records.
#[derive(Debug, Clone)]
pub struct LayoutSet {
    vocab: Vocabulary,
    records: Vec<LayoutRecord>,
    counts: BTreeMap<CategoryId, usize>,
    ids: IdAllocator,
    opacity: f32,
}

impl LayoutSet {
    /// Create an empty collection over the given vocabulary.
    pub fn new(vocab: Vocabulary) -> Self {
        Self {
            vocab,
            records: Vec::new(),
            counts: BTreeMap::new(),
            ids: IdAllocator::new(),
            opacity: DEFAULT_OPACITY,
        }
    }

    /// The session vocabulary.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Records in display order.
    pub fn records(&self) -> &[LayoutRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derived per-category counts. Categories with no records have no
    /// entry at all.
    pub fn counts(&self) -> &BTreeMap<CategoryId, usize> {
        &self.counts
    }

    /// Counts keyed by category name, for display and state reporting.
    pub fn named_counts(&self) -> BTreeMap<String, usize> {
        self.counts
            .iter()
            .filter_map(|(&id, &n)| self.vocab.name(id).map(|name| (name.to_string(), n)))
            .collect()
    }

    /// Session-global render opacity.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set the session-global render opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Record at a display position.
    pub fn get(&self, index: usize) -> Option<&LayoutRecord> {
        self.records.get(index)
    }

    /// Display position of the record with the given uuid.
    pub fn position_of(&self, uuid: Uuid) -> Option<usize> {
        self.records.iter().position(|r| r.uuid == uuid)
    }

    /// Record with the given uuid.
    pub fn get_by_uuid(&self, uuid: Uuid) -> Option<&LayoutRecord> {
        self.records.iter().find(|r| r.uuid == uuid)
    }

    /// Add a new record of the named category at its default spawn pose.
    pub fn add(&mut self, category: &str) -> Result<&LayoutRecord, VocabularyError> {
        let id = self.vocab.index_of(category)?;
        let def = self
            .vocab
            .get(id)
            .ok_or_else(|| VocabularyError::UnknownCategory(category.to_string()))?
            .clone();
        let record = LayoutRecord::spawn(self.ids.allocate(), id, &def);
        debug!(id = %record.id, category, "added layout record");
        self.bump_count(id, 1);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Delete the record at a display position, returning it.
    pub fn delete(&mut self, index: usize) -> Option<LayoutRecord> {
        if index >= self.records.len() {
            return None;
        }
        let record = self.records.remove(index);
        self.drop_count(record.category);
        debug!(id = %record.id, "deleted layout record");
        Some(record)
    }

    /// Delete the record with the given uuid, returning it.
    pub fn delete_by_uuid(&mut self, uuid: Uuid) -> Option<LayoutRecord> {
        let index = self.position_of(uuid)?;
        self.delete(index)
    }

    /// Delete every record. Returns the number removed.
    pub fn delete_all(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        self.counts.clear();
        info!(removed, "cleared layout set");
        removed
    }

    /// Rename the record at a display position.
    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Toggle visibility of the record at a display position.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Swap two display positions. Uuids travel with their records, so
    /// identity is unaffected by reordering.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.records.len() || b >= self.records.len() {
            return false;
        }
        self.records.swap(a, b);
        true
    }

    /// Move the record with the given uuid to a new world-space center.
    pub fn set_position(&mut self, uuid: Uuid, position: Vec3) -> bool {
        self.with_record(uuid, |record| record.position = position)
    }

    /// Set the yaw of the record with the given uuid.
    pub fn set_yaw(&mut self, uuid: Uuid, yaw_degrees: f32) -> bool {
        self.with_record(uuid, |record| record.yaw_degrees = yaw_degrees)
    }

    /// Rescale the record with the given uuid relative to its template
    /// extents.
    pub fn set_scale(&mut self, uuid: Uuid, scale: Vec3) -> bool {
        self.with_record(uuid, |record| record.set_scale(scale))
    }

    fn with_record(&mut self, uuid: Uuid, apply: impl FnOnce(&mut LayoutRecord)) -> bool {
        match self.records.iter_mut().find(|r| r.uuid == uuid) {
            Some(record) => {
                apply(record);
                true
            }
            None => false,
        }
    }

    /// Apply a serialized set onto the collection.
    ///
    /// With `replace` the existing records and counts are discarded first;
    /// otherwise the incoming records are appended and counts are summed.
    /// Incoming boxes are materialized with fresh ids continuing the session
    /// sequence and fresh uuids. The incoming set is fully decoded and
    /// validated before any state changes, then records and counts are
    /// published together.
    pub fn import(&mut self, set: &SerializedSet, replace: bool) -> Result<ImportOutcome, SetError> {
        let boxes = set.decode(&self.vocab)?;
        let added = boxes.len();

        let mut incoming = Vec::with_capacity(added);
        let mut incoming_counts: BTreeMap<CategoryId, usize> = BTreeMap::new();
        for DecodedBox {
            center,
            extents,
            category,
        } in boxes
        {
            incoming.push(LayoutRecord::from_box(
                self.ids.allocate(),
                category,
                center,
                extents,
            ));
            *incoming_counts.entry(category).or_insert(0) += 1;
        }

        if replace {
            self.records = incoming;
            self.counts = incoming_counts;
        } else {
            self.records.extend(incoming);
            for (category, n) in incoming_counts {
                *self.counts.entry(category).or_insert(0) += n;
            }
        }

        let outcome = ImportOutcome {
            added,
            total: self.records.len(),
            replaced: replace,
        };
        info!(added, total = outcome.total, replace, "imported layout set");
        Ok(outcome)
    }

    /// Encode the collection for export.
    ///
    /// An empty collection is an error; the action should be gated off in
    /// the viewer rather than producing an empty-but-valid file.
    pub fn export(&self) -> Result<SerializedSet, SetError> {
        if self.records.is_empty() {
            return Err(SetError::EmptyExport);
        }
        Ok(SerializedSet::encode(&self.records))
    }

    /// Export as pretty-printed JSON, the persisted file form.
    pub fn export_json(&self) -> Result<String, SetError> {
        self.export()?.to_json_pretty()
    }

    fn bump_count(&mut self, category: CategoryId, by: usize) {
        *self.counts.entry(category).or_insert(0) += by;
    }

    fn drop_count(&mut self, category: CategoryId) {
        if let Some(count) = self.counts.get_mut(&category) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&category);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_category_set() -> LayoutSet {
        LayoutSet::new(Vocabulary::from_names(&["wall", "floor"]).unwrap())
    }

    #[test]
    fn add_then_delete_leaves_empty_counts() {
        let mut set = two_category_set();
        set.add("wall").unwrap();
        assert_eq!(set.named_counts().get("wall"), Some(&1));
        set.delete(0).unwrap();
        assert!(set.counts().is_empty());
    }

    #[test]
    fn add_rejects_unknown_category() {
        let mut set = two_category_set();
        assert!(set.add("ceiling").is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn counts_track_every_mutation() {
        let mut set = two_category_set();
        set.add("wall").unwrap();
        set.add("wall").unwrap();
        set.add("floor").unwrap();
        assert_eq!(set.named_counts().get("wall"), Some(&2));
        assert_eq!(set.named_counts().get("floor"), Some(&1));

        set.delete(0).unwrap();
        assert_eq!(set.named_counts().get("wall"), Some(&1));

        set.delete_all();
        assert!(set.counts().is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn merge_import_appends_and_sums_counts() {
        let mut set = two_category_set();
        set.add("wall").unwrap();

        let incoming = SerializedSet {
            bboxes: vec![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]],
            labels: vec![1],
        };
        let outcome = set.import(&incoming, false).unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.total, 2);
        assert_eq!(set.named_counts().get("wall"), Some(&1));
        assert_eq!(set.named_counts().get("floor"), Some(&1));
    }

    #[test]
    fn replace_import_discards_previous_state() {
        let mut set = two_category_set();
        set.add("wall").unwrap();
        set.add("wall").unwrap();

        let incoming = SerializedSet {
            bboxes: vec![[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]],
            labels: vec![1],
        };
        let outcome = set.import(&incoming, true).unwrap();
        assert_eq!(outcome.total, 1);
        assert_eq!(set.named_counts().get("wall"), None);
        assert_eq!(set.named_counts().get("floor"), Some(&1));
    }

    #[test]
    fn replace_import_is_idempotent() {
        let incoming = SerializedSet {
            bboxes: vec![[0.0; 6], [1.0, 1.0, 1.0, 2.0, 2.0, 2.0]],
            labels: vec![0, 1],
        };
        let mut set = two_category_set();
        let first = set.import(&incoming, true).unwrap();
        let counts_first = set.named_counts();
        let second = set.import(&incoming, true).unwrap();
        assert_eq!(first.total, second.total);
        assert_eq!(counts_first, set.named_counts());
    }

    #[test]
    fn failed_import_leaves_state_untouched() {
        let mut set = two_category_set();
        set.add("wall").unwrap();
        let issued_before = set.records()[0].id;

        let bad = SerializedSet {
            bboxes: vec![[0.0; 6]],
            labels: vec![7],
        };
        assert!(set.import(&bad, true).is_err());
        assert_eq!(set.len(), 1);
        assert_eq!(set.records()[0].id, issued_before);
        assert_eq!(set.named_counts().get("wall"), Some(&1));
    }

    #[test]
    fn import_continues_id_sequence() {
        let mut set = two_category_set();
        set.add("wall").unwrap();
        set.delete(0).unwrap();

        let incoming = SerializedSet {
            bboxes: vec![[0.0; 6]],
            labels: vec![0],
        };
        set.import(&incoming, false).unwrap();
        // The deleted record used id 0; the imported one must not reuse it.
        assert_eq!(set.records()[0].id.0, 1);
    }

    #[test]
    fn export_refuses_empty_collection() {
        let set = two_category_set();
        assert!(matches!(set.export(), Err(SetError::EmptyExport)));
    }

    #[test]
    fn swap_keeps_identity_with_records() {
        let mut set = two_category_set();
        set.add("wall").unwrap();
        set.add("floor").unwrap();
        let first = set.get(0).unwrap().uuid;
        assert!(set.swap(0, 1));
        assert_eq!(set.get(1).unwrap().uuid, first);
        assert!(!set.swap(0, 5));
    }

    #[test]
    fn opacity_is_session_global_and_clamped() {
        let mut set = two_category_set();
        assert_eq!(set.opacity(), DEFAULT_OPACITY);
        set.set_opacity(1.5);
        assert_eq!(set.opacity(), 1.0);
        set.set_opacity(-0.2);
        assert_eq!(set.opacity(), 0.0);
    }
}
