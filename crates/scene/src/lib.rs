#![warn(missing_docs)]
//! Scene mirror and manipulation state.
//!
//! Maintains the session's copy of the viewer's scene tree (a path-keyed
//! object store), the box wireframe geometry, and the state around the
//! single shared manipulation gizmo: which record it is attached to and the
//! begin/end adjustment transaction that coalesces drag updates.

pub mod binding;
pub mod geometry;
pub mod store;

pub use binding::{AdjustCommit, AdjustController, AdjustError, BindingChange, GizmoBinding};
pub use geometry::wireframe_edges;
pub use store::{SceneError, SceneNode, ScenePath, SceneStore};
