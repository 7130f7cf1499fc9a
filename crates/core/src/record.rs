//! Layout record model.
//!
//! A record is one placed bounding-box annotation: category, transform,
//! extents and display properties. Records are identified two ways: a
//! session-monotonic [`LayoutId`] used for display names, and a [`Uuid`]
//! that stays stable while the list is reordered.

use crate::vocabulary::{CategoryDef, CategoryId};
use glam::Vec3;
use std::fmt;
use uuid::Uuid;

/// Session-scoped record id. Monotonically increasing, never reused, even
/// after the record it was assigned to is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(pub u64);

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocator for [`LayoutId`]s.
///
/// Import continues the running sequence rather than restarting at zero, so
/// ids stay unique for the whole session.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Start a fresh sequence at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id.
    pub fn allocate(&mut self) -> LayoutId {
        let id = LayoutId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

/// Yaw applied to a freshly placed box, matching the viewer's convention of
/// orienting new boxes perpendicular to the camera axis.
pub const DEFAULT_SPAWN_YAW_DEGREES: f32 = 90.0;

/// One placed bounding-box annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRecord {
    /// Sequence-assigned id, unique within the session.
    pub id: LayoutId,
    /// Stable identity key, independent of list position.
    pub uuid: Uuid,
    /// Index into the session vocabulary.
    pub category: CategoryId,
    /// World-space center of the box.
    pub position: Vec3,
    /// Yaw rotation in degrees. The observed annotations only ever rotate
    /// about the vertical axis.
    pub yaw_degrees: f32,
    /// Current extents (full side lengths).
    pub size: Vec3,
    /// Template extents the record was created with; `size` is
    /// `original_size` scaled component-wise.
    pub original_size: Vec3,
    /// Per-record visibility toggle.
    pub visible: bool,
    /// User-editable display label.
    pub name: String,
}

impl LayoutRecord {
    /// Create a record at the default spawn pose for its category.
    ///
    /// New boxes sit half-embedded at `z = size.z / 2 - 1`, the pose the
    /// viewer drops fresh boxes at.
    pub fn spawn(id: LayoutId, category: CategoryId, def: &CategoryDef) -> Self {
        let size = def.default_size;
        let position = Vec3::new(0.0, 0.0, size.z / 2.0 - 1.0);
        Self {
            id,
            uuid: Uuid::new_v4(),
            category,
            position,
            yaw_degrees: DEFAULT_SPAWN_YAW_DEGREES,
            size,
            original_size: size,
            visible: true,
            name: Self::default_name(id),
        }
    }

    /// Create a record from imported geometry. Identity fields are fresh:
    /// the file format only persists geometry and category.
    pub fn from_box(id: LayoutId, category: CategoryId, center: Vec3, extents: Vec3) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            category,
            position: center,
            yaw_degrees: 0.0,
            size: extents,
            original_size: extents,
            visible: true,
            name: Self::default_name(id),
        }
    }

    /// Default display label for a record id.
    pub fn default_name(id: LayoutId) -> String {
        format!("idx.{id}")
    }

    /// Component-wise scale relative to the template extents.
    pub fn scale(&self) -> Vec3 {
        self.size / self.original_size
    }

    /// Set the scale, recomputing `size` from the template extents.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.size = self.original_size * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::Vocabulary;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut alloc = IdAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a, LayoutId(0));
        assert_eq!(b, LayoutId(1));
        // Deleting records does not rewind the sequence; the allocator has
        // no way to give an id back.
        assert_eq!(alloc.allocate(), LayoutId(2));
        assert_eq!(alloc.issued(), 3);
    }

    #[test]
    fn spawn_uses_category_defaults() {
        let vocab = Vocabulary::indoor();
        let floor = vocab.index_of("floor").unwrap();
        let record = LayoutRecord::spawn(LayoutId(7), floor, vocab.get(floor).unwrap());
        assert_eq!(record.size, Vec3::new(1.0, 1.0, 0.1));
        assert_eq!(record.original_size, record.size);
        assert_eq!(record.position, Vec3::new(0.0, 0.0, 0.1 / 2.0 - 1.0));
        assert_eq!(record.yaw_degrees, DEFAULT_SPAWN_YAW_DEGREES);
        assert_eq!(record.name, "idx.7");
        assert!(record.visible);
    }

    #[test]
    fn scale_round_trips_through_size() {
        let vocab = Vocabulary::indoor();
        let chair = vocab.index_of("chair").unwrap();
        let mut record = LayoutRecord::spawn(LayoutId(0), chair, vocab.get(chair).unwrap());
        record.set_scale(Vec3::new(2.0, 1.0, 0.5));
        assert_eq!(record.size, record.original_size * Vec3::new(2.0, 1.0, 0.5));
        assert_eq!(record.scale(), Vec3::new(2.0, 1.0, 0.5));
    }

    #[test]
    fn imported_records_get_fresh_identity() {
        let a = LayoutRecord::from_box(LayoutId(0), CategoryId(1), Vec3::ZERO, Vec3::ONE);
        let b = LayoutRecord::from_box(LayoutId(1), CategoryId(1), Vec3::ZERO, Vec3::ONE);
        assert_ne!(a.uuid, b.uuid);
        assert_eq!(a.name, "idx.0");
        assert_eq!(b.name, "idx.1");
    }
}
