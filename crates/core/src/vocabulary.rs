//! Category vocabulary.
//!
//! The vocabulary is a fixed, **ordered** list of category definitions. The
//! persisted label in a layout-set file is the position of the category in
//! this list, so vocabulary order is part of the wire format and must be
//! stable across export and import.

use glam::Vec3;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Error raised when constructing or querying a [`Vocabulary`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    /// A vocabulary must contain at least one category.
    #[error("vocabulary cannot be empty")]
    Empty,
    /// Category names must be unique; duplicates would make the positional
    /// label ambiguous on re-export.
    #[error("duplicate category name `{0}`")]
    DuplicateName(String),
    /// Lookup by a name that is not in the vocabulary.
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    /// The vocabulary file could not be parsed.
    #[error("malformed vocabulary file: {0}")]
    MalformedFile(String),
}

/// Index of a category within a [`Vocabulary`].
///
/// This is the value persisted as the `labels` entry in layout-set files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub usize);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One category definition: display name, default box extents for a newly
/// placed record, and the display color the viewer renders it with.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDef {
    /// Display name, unique within the vocabulary.
    pub name: String,
    /// Default extents (full side lengths) for a freshly added box.
    pub default_size: Vec3,
    /// Render color as 0xRRGGBB.
    pub color: u32,
}

impl CategoryDef {
    fn new(name: &str, size: [f32; 3], color: u32) -> Self {
        Self {
            name: name.to_string(),
            default_size: Vec3::from_array(size),
            color,
        }
    }
}

/// On-disk shape of one vocabulary entry.
#[derive(Debug, Deserialize)]
struct CategoryDefFile {
    name: String,
    size: [f32; 3],
    color: u32,
}

/// Fixed ordered list of valid categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    entries: Vec<CategoryDef>,
}

impl Vocabulary {
    /// Build a vocabulary from an explicit entry list.
    ///
    /// Rejects empty lists and duplicate names.
    pub fn from_entries(entries: Vec<CategoryDef>) -> Result<Self, VocabularyError> {
        if entries.is_empty() {
            return Err(VocabularyError::Empty);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|other| other.name == entry.name) {
                return Err(VocabularyError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Build a vocabulary from bare names, using a uniform default size and
    /// color. Mostly useful for tests and small custom vocabularies.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, VocabularyError> {
        Self::from_entries(
            names
                .iter()
                .map(|name| CategoryDef::new(name.as_ref(), [0.2, 0.3, 0.5], 0x808080))
                .collect(),
        )
    }

    /// Parse a vocabulary from a JSON array of `{name, size, color}` objects.
    pub fn from_json(input: &str) -> Result<Self, VocabularyError> {
        let entries: Vec<CategoryDefFile> = serde_json::from_str(input)
            .map_err(|err| VocabularyError::MalformedFile(err.to_string()))?;
        Self::from_entries(
            entries
                .into_iter()
                .map(|e| CategoryDef {
                    name: e.name,
                    default_size: Vec3::from_array(e.size),
                    color: e.color,
                })
                .collect(),
        )
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vocabulary has no entries. Always false for a constructed
    /// vocabulary, kept for API completeness.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definition for a category id, if the id is in range.
    pub fn get(&self, id: CategoryId) -> Option<&CategoryDef> {
        self.entries.get(id.0)
    }

    /// Display name for a category id, if the id is in range.
    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.get(id).map(|def| def.name.as_str())
    }

    /// Resolve a category name to its positional id.
    pub fn index_of(&self, name: &str) -> Result<CategoryId, VocabularyError> {
        self.entries
            .iter()
            .position(|def| def.name == name)
            .map(CategoryId)
            .ok_or_else(|| VocabularyError::UnknownCategory(name.to_string()))
    }

    /// Iterate categories in label order.
    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &CategoryDef)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, def)| (CategoryId(i), def))
    }

    /// The built-in indoor-scene vocabulary.
    ///
    /// Order matters: existing exported files reference these entries by
    /// position. New categories may only be appended.
    pub fn indoor() -> Self {
        let entries = vec![
            CategoryDef::new("unlabeled", [0.1, 1.0, 0.6], 0x9ffd32),
            CategoryDef::new("wall", [0.1, 1.0, 0.6], 0xaec7e8),
            CategoryDef::new("floor", [1.0, 1.0, 0.1], 0x98df8a),
            CategoryDef::new("cabinet", [0.2, 0.3, 0.5], 0x1f77b4),
            CategoryDef::new("bed", [0.2, 0.3, 0.5], 0xffbb78),
            CategoryDef::new("chair", [0.2, 0.3, 0.5], 0xbcbd22),
            CategoryDef::new("sofa", [0.2, 0.3, 0.5], 0x8c564b),
            CategoryDef::new("table", [0.2, 0.3, 0.5], 0xff9896),
            CategoryDef::new("door", [0.2, 0.3, 0.5], 0xd62728),
            CategoryDef::new("window", [0.2, 0.3, 0.5], 0xc5b0d5),
            CategoryDef::new("bookshelf", [0.2, 0.3, 0.5], 0x9467bd),
            CategoryDef::new("picture", [0.2, 0.3, 0.5], 0xc49c94),
            CategoryDef::new("counter", [0.2, 0.3, 0.5], 0x17becf),
            CategoryDef::new("blinds", [0.2, 0.3, 0.5], 0xb24c4c),
            CategoryDef::new("desk", [0.2, 0.3, 0.5], 0xf7b6d2),
            CategoryDef::new("shelves", [0.2, 0.3, 0.5], 0x42bc66),
            CategoryDef::new("curtain", [0.2, 0.3, 0.5], 0xdbdb8d),
            CategoryDef::new("dresser", [0.2, 0.3, 0.5], 0x8c39c5),
            CategoryDef::new("pillow", [0.2, 0.3, 0.5], 0xcab934),
            CategoryDef::new("mirror", [0.2, 0.3, 0.5], 0x33b0cb),
            CategoryDef::new("floormat", [0.2, 0.3, 0.5], 0xc83683),
            CategoryDef::new("clothes", [0.2, 0.3, 0.5], 0x5cc13d),
            CategoryDef::new("ceiling", [0.2, 0.3, 0.5], 0x4e47b7),
            CategoryDef::new("books", [0.2, 0.3, 0.5], 0xac7252),
            CategoryDef::new("refrigerator", [0.2, 0.3, 0.5], 0xff7f0e),
            CategoryDef::new("television", [0.2, 0.3, 0.5], 0x5ba38a),
            CategoryDef::new("paper", [0.2, 0.3, 0.5], 0x99629c),
            CategoryDef::new("towel", [0.2, 0.3, 0.5], 0x8c9965),
            CategoryDef::new("showercurtain", [0.2, 0.3, 0.5], 0x9edae5),
            CategoryDef::new("box", [0.2, 0.3, 0.5], 0x647d9a),
            CategoryDef::new("whiteboard", [0.2, 0.3, 0.5], 0xb27f87),
            CategoryDef::new("person", [0.2, 0.3, 0.5], 0x78b980),
            CategoryDef::new("nightstand", [0.2, 0.3, 0.5], 0x926fc2),
            CategoryDef::new("toilet", [0.2, 0.3, 0.5], 0x2ca02c),
            CategoryDef::new("sink", [0.2, 0.3, 0.5], 0x708090),
            CategoryDef::new("lamp", [0.2, 0.3, 0.5], 0x60cfd1),
            CategoryDef::new("bathtub", [0.2, 0.3, 0.5], 0xe377c2),
            CategoryDef::new("bag", [0.2, 0.3, 0.5], 0xd55cb0),
            CategoryDef::new("otherstructure", [0.2, 0.3, 0.5], 0x5e6ad3),
            CategoryDef::new("otherfurniture", [0.2, 0.3, 0.5], 0x5254a3),
            CategoryDef::new("otherprop", [0.2, 0.3, 0.5], 0x645590),
            CategoryDef::new("garbagebin", [0.1, 1.0, 0.6], 0x9ffd32),
        ];
        Self { entries }
    }
}
