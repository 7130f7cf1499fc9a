#![warn(missing_docs)]
//! Layout-set collection, wire codec and import engine.
//!
//! A layout set is the full collection of bounding-box annotations for one
//! scene. It is exportable as a single JSON file holding geometry and
//! positional category labels, and re-importable either merged onto or
//! replacing the current collection.

pub mod codec;
pub mod error;
pub mod queue;
pub mod set;

pub use codec::{DecodedBox, SerializedSet};
pub use error::SetError;
pub use queue::{ImportQueue, PendingFile};
pub use set::{ImportOutcome, LayoutSet, DEFAULT_OPACITY};
