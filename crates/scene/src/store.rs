//! Path-keyed scene object store.
//!
//! The external viewer addresses scene objects by hierarchical path
//! (`layouts/<uuid>`). This store is the session's authoritative mirror of
//! that tree: every create, replace and delete goes through it, and the
//! viewer is told about the same paths.

use glam::Vec3;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error raised when constructing a [`ScenePath`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Paths need at least one segment.
    #[error("scene path cannot be empty")]
    EmptyPath,
    /// Segments cannot be empty or contain the separator.
    #[error("invalid scene path segment `{0}`")]
    InvalidSegment(String),
}

/// Hierarchical object path, ordered lexically by segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScenePath {
    segments: Vec<String>,
}

impl ScenePath {
    /// Build a path from segments.
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Result<Self, SceneError> {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(SceneError::EmptyPath);
        }
        for segment in &segments {
            if segment.is_empty() || segment.contains('/') {
                return Err(SceneError::InvalidSegment(segment.clone()));
            }
        }
        Ok(Self { segments })
    }

    /// Parse a `/`-separated path.
    pub fn parse(input: &str) -> Result<Self, SceneError> {
        Self::new(input.split('/'))
    }

    /// Path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `prefix` is a proper prefix of (or equal to) this path.
    pub fn starts_with(&self, prefix: &ScenePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// One renderable box object in the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// World-space center.
    pub position: Vec3,
    /// Yaw rotation in degrees.
    pub yaw_degrees: f32,
    /// Full extents of the box.
    pub extents: Vec3,
    /// Render color as 0xRRGGBB.
    pub color: u32,
    /// Whether the viewer should draw this object.
    pub visible: bool,
}

/// Mirror of the viewer's scene tree.
#[derive(Debug, Clone, Default)]
pub struct SceneStore {
    nodes: BTreeMap<ScenePath, SceneNode>,
}

impl SceneStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create or replace the object at a path, returning the previous
    /// object when replacing.
    pub fn set_object(&mut self, path: ScenePath, node: SceneNode) -> Option<SceneNode> {
        self.nodes.insert(path, node)
    }

    /// Object at a path.
    pub fn get(&self, path: &ScenePath) -> Option<&SceneNode> {
        self.nodes.get(path)
    }

    /// Mutable object at a path.
    pub fn get_mut(&mut self, path: &ScenePath) -> Option<&mut SceneNode> {
        self.nodes.get_mut(path)
    }

    /// Delete the object at a path, returning it.
    pub fn delete(&mut self, path: &ScenePath) -> Option<SceneNode> {
        self.nodes.remove(path)
    }

    /// Delete every object under a prefix. Returns how many were removed.
    pub fn delete_subtree(&mut self, prefix: &ScenePath) -> usize {
        let doomed: Vec<ScenePath> = self
            .nodes
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect();
        for path in &doomed {
            self.nodes.remove(path);
        }
        doomed.len()
    }

    /// Iterate objects in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&ScenePath, &SceneNode)> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> SceneNode {
        SceneNode {
            position: Vec3::ZERO,
            yaw_degrees: 0.0,
            extents: Vec3::ONE,
            color: 0xaec7e8,
            visible: true,
        }
    }

    #[test]
    fn path_validation() {
        assert!(ScenePath::parse("layouts/abc").is_ok());
        assert_eq!(ScenePath::new(Vec::<String>::new()), Err(SceneError::EmptyPath));
        assert!(matches!(
            ScenePath::parse("layouts//abc"),
            Err(SceneError::InvalidSegment(_))
        ));
        assert_eq!(ScenePath::parse("layouts/abc").unwrap().to_string(), "layouts/abc");
    }

    #[test]
    fn set_replaces_existing_object() {
        let mut store = SceneStore::new();
        let path = ScenePath::parse("layouts/a").unwrap();
        assert!(store.set_object(path.clone(), node()).is_none());

        let mut updated = node();
        updated.visible = false;
        let previous = store.set_object(path.clone(), updated).unwrap();
        assert!(previous.visible);
        assert!(!store.get(&path).unwrap().visible);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_subtree_removes_only_prefixed_paths() {
        let mut store = SceneStore::new();
        store.set_object(ScenePath::parse("layouts/a").unwrap(), node());
        store.set_object(ScenePath::parse("layouts/b").unwrap(), node());
        store.set_object(ScenePath::parse("cameras/a").unwrap(), node());

        let removed = store.delete_subtree(&ScenePath::parse("layouts").unwrap());
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&ScenePath::parse("cameras/a").unwrap()).is_some());
    }
}
