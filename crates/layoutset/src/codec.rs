//! Wire codec for persisted layout sets.
//!
//! The file format is a JSON object `{"bboxes": [[cx,cy,cz,sx,sy,sz],..],
//! "labels": [..]}` with both sequences index-aligned. Encoding is lossy by
//! design: only geometry and category survive a round trip. Names,
//! visibility, uuids and opacity are session state, not wire state.

use crate::error::SetError;
use glam::Vec3;
use roomtag_core::{CategoryId, LayoutRecord, Vocabulary};
use serde::{Deserialize, Serialize};

/// Flat serializable form of a layout set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedSet {
    /// One `[cx, cy, cz, sx, sy, sz]` entry per record: world-space center
    /// followed by full extents.
    pub bboxes: Vec<[f64; 6]>,
    /// Positional category label for the box at the same index.
    pub labels: Vec<u32>,
}

/// One decoded box, validated against the session vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedBox {
    /// World-space center.
    pub center: Vec3,
    /// Full extents.
    pub extents: Vec3,
    /// Validated category id.
    pub category: CategoryId,
}

impl SerializedSet {
    /// Encode an ordered record sequence into the wire shape.
    pub fn encode<'a>(records: impl IntoIterator<Item = &'a LayoutRecord>) -> Self {
        let mut bboxes = Vec::new();
        let mut labels = Vec::new();
        for record in records {
            bboxes.push([
                f64::from(record.position.x),
                f64::from(record.position.y),
                f64::from(record.position.z),
                f64::from(record.size.x),
                f64::from(record.size.y),
                f64::from(record.size.z),
            ]);
            labels.push(record.category.0 as u32);
        }
        Self { bboxes, labels }
    }

    /// Parse the wire shape from a JSON string.
    pub fn from_json(input: &str) -> Result<Self, SetError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Render the wire shape as pretty-printed JSON, the form written to
    /// exported files.
    pub fn to_json_pretty(&self) -> Result<String, SetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and decode into boxes.
    ///
    /// All-or-nothing: a length mismatch or any out-of-range label rejects
    /// the whole set, so a failed import can never partially apply.
    pub fn decode(&self, vocab: &Vocabulary) -> Result<Vec<DecodedBox>, SetError> {
        if self.bboxes.len() != self.labels.len() {
            return Err(SetError::MalformedFile(format!(
                "{} bboxes but {} labels",
                self.bboxes.len(),
                self.labels.len()
            )));
        }

        let mut boxes = Vec::with_capacity(self.bboxes.len());
        for (entry, (bbox, &label)) in self.bboxes.iter().zip(&self.labels).enumerate() {
            if label as usize >= vocab.len() {
                return Err(SetError::LabelOutOfRange {
                    entry,
                    label,
                    vocab_len: vocab.len(),
                });
            }
            boxes.push(DecodedBox {
                center: Vec3::new(bbox[0] as f32, bbox[1] as f32, bbox[2] as f32),
                extents: Vec3::new(bbox[3] as f32, bbox[4] as f32, bbox[5] as f32),
                category: CategoryId(label as usize),
            });
        }
        Ok(boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomtag_core::{LayoutId, Vocabulary};

    fn record(category: usize, center: [f32; 3], size: [f32; 3]) -> LayoutRecord {
        LayoutRecord::from_box(
            LayoutId(0),
            CategoryId(category),
            Vec3::from_array(center),
            Vec3::from_array(size),
        )
    }

    #[test]
    fn decodes_against_two_entry_vocabulary() {
        let vocab = Vocabulary::from_names(&["wall", "floor"]).unwrap();
        let set = SerializedSet::from_json(r#"{"bboxes": [[0,0,0,1,1,1]], "labels": [1]}"#).unwrap();
        let boxes = set.decode(&vocab).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].category, CategoryId(1));
        assert_eq!(vocab.name(boxes[0].category), Some("floor"));
        assert_eq!(boxes[0].extents, Vec3::ONE);
    }

    #[test]
    fn label_out_of_range_rejects_whole_file() {
        let vocab = Vocabulary::from_names(&["a", "b", "c"]).unwrap();
        let set = SerializedSet {
            bboxes: vec![[0.0; 6], [0.0; 6]],
            labels: vec![0, 5],
        };
        let err = set.decode(&vocab).unwrap_err();
        match err {
            SetError::LabelOutOfRange {
                entry,
                label,
                vocab_len,
            } => {
                assert_eq!(entry, 1);
                assert_eq!(label, 5);
                assert_eq!(vocab_len, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn length_mismatch_is_malformed() {
        let vocab = Vocabulary::from_names(&["a"]).unwrap();
        let set = SerializedSet {
            bboxes: vec![[0.0; 6]],
            labels: vec![0, 0],
        };
        assert!(matches!(
            set.decode(&vocab),
            Err(SetError::MalformedFile(_))
        ));
    }

    #[test]
    fn unexpected_json_shape_is_malformed() {
        assert!(matches!(
            SerializedSet::from_json(r#"{"boxes": []}"#),
            Err(SetError::MalformedFile(_))
        ));
        assert!(matches!(
            SerializedSet::from_json("not json"),
            Err(SetError::MalformedFile(_))
        ));
    }

    #[test]
    fn encode_drops_identity_fields() {
        let mut r = record(1, [1.0, 2.0, 3.0], [0.5, 0.5, 0.5]);
        r.name = "my wall".to_string();
        r.visible = false;
        let set = SerializedSet::encode([&r]);
        assert_eq!(set.bboxes, vec![[1.0, 2.0, 3.0, 0.5, 0.5, 0.5]]);
        assert_eq!(set.labels, vec![1]);
        // Nothing but geometry and category makes it to the wire.
        let json = set.to_json_pretty().unwrap();
        assert!(!json.contains("my wall"));
        assert!(!json.contains("visible"));
    }
}
