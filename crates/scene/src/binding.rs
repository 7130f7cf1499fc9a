//! Gizmo binding and the adjustment transaction.
//!
//! One shared manipulation gizmo exists per session and at most one record
//! may be attached to it at a time. While the user is dragging, interim
//! transform updates are staged in an [`AdjustController`] and committed in
//! a single step when the drag ends; no record state is final until then.

use glam::Vec3;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Result of a toggle on the gizmo binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingChange {
    /// The record was attached; nothing was bound before.
    Attached,
    /// The record was attached after detaching the previously bound one.
    Retargeted {
        /// Record that lost the gizmo.
        previous: Uuid,
    },
    /// The record was already bound and is now detached.
    Detached,
}

/// The single shared manipulation handle.
///
/// Enforces the at-most-one-attached invariant: the only states are
/// unbound, or bound to exactly one record uuid.
#[derive(Debug, Clone, Default)]
pub struct GizmoBinding {
    bound: Option<Uuid>,
}

impl GizmoBinding {
    /// Create an unbound gizmo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently bound record, if any.
    pub fn bound(&self) -> Option<Uuid> {
        self.bound
    }

    /// Whether the given record is the bound target.
    pub fn is_bound(&self, uuid: Uuid) -> bool {
        self.bound == Some(uuid)
    }

    /// Toggle the binding for a record.
    ///
    /// Toggling the bound record detaches it; toggling any other record
    /// detaches the previous target first and then attaches.
    pub fn toggle(&mut self, uuid: Uuid) -> BindingChange {
        match self.bound {
            Some(current) if current == uuid => {
                self.bound = None;
                debug!(%uuid, "gizmo detached");
                BindingChange::Detached
            }
            Some(previous) => {
                self.bound = Some(uuid);
                debug!(%previous, %uuid, "gizmo retargeted");
                BindingChange::Retargeted { previous }
            }
            None => {
                self.bound = Some(uuid);
                debug!(%uuid, "gizmo attached");
                BindingChange::Attached
            }
        }
    }

    /// Detach unconditionally, returning the previous target.
    pub fn clear(&mut self) -> Option<Uuid> {
        self.bound.take()
    }

    /// Detach if the deleted record was the bound target.
    pub fn on_deleted(&mut self, uuid: Uuid) -> bool {
        if self.bound == Some(uuid) {
            self.bound = None;
            true
        } else {
            false
        }
    }
}

/// Errors from the adjustment transaction state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdjustError {
    /// `begin` while a transaction is already open.
    #[error("an adjustment is already in progress for record {0}")]
    AlreadyActive(Uuid),
    /// Staging or `end` with no open transaction.
    #[error("no adjustment in progress")]
    NotActive,
}

/// The staged mutations committed when an adjustment ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustCommit {
    /// Record the adjustment applies to.
    pub target: Uuid,
    /// Final staged center, if the drag moved the record.
    pub position: Option<Vec3>,
    /// Final staged yaw in degrees, if rotated.
    pub yaw_degrees: Option<f32>,
    /// Final staged component-wise scale, if resized.
    pub scale: Option<Vec3>,
}

#[derive(Debug, Clone)]
struct AdjustTransaction {
    target: Uuid,
    position: Option<Vec3>,
    yaw_degrees: Option<f32>,
    scale: Option<Vec3>,
}

/// Begin/end bracket around a manipulation drag.
///
/// Interim updates overwrite each other, so arbitrarily many drag frames
/// collapse into one commit on `end`.
#[derive(Debug, Clone, Default)]
pub struct AdjustController {
    active: Option<AdjustTransaction>,
}

impl AdjustController {
    /// Create an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is open.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Record targeted by the open transaction.
    pub fn target(&self) -> Option<Uuid> {
        self.active.as_ref().map(|tx| tx.target)
    }

    /// Open a transaction for a record.
    pub fn begin(&mut self, target: Uuid) -> Result<(), AdjustError> {
        if let Some(tx) = &self.active {
            return Err(AdjustError::AlreadyActive(tx.target));
        }
        self.active = Some(AdjustTransaction {
            target,
            position: None,
            yaw_degrees: None,
            scale: None,
        });
        Ok(())
    }

    /// Stage a new center for the open transaction.
    pub fn stage_position(&mut self, position: Vec3) -> Result<(), AdjustError> {
        let tx = self.active.as_mut().ok_or(AdjustError::NotActive)?;
        tx.position = Some(position);
        Ok(())
    }

    /// Stage a new yaw for the open transaction.
    pub fn stage_yaw(&mut self, yaw_degrees: f32) -> Result<(), AdjustError> {
        let tx = self.active.as_mut().ok_or(AdjustError::NotActive)?;
        tx.yaw_degrees = Some(yaw_degrees);
        Ok(())
    }

    /// Stage a new scale for the open transaction.
    pub fn stage_scale(&mut self, scale: Vec3) -> Result<(), AdjustError> {
        let tx = self.active.as_mut().ok_or(AdjustError::NotActive)?;
        tx.scale = Some(scale);
        Ok(())
    }

    /// Close the transaction and hand back the coalesced commit.
    pub fn end(&mut self) -> Result<AdjustCommit, AdjustError> {
        let tx = self.active.take().ok_or(AdjustError::NotActive)?;
        debug!(target = %tx.target, "adjustment committed");
        Ok(AdjustCommit {
            target: tx.target,
            position: tx.position,
            yaw_degrees: tx.yaw_degrees,
            scale: tx.scale,
        })
    }

    /// Drop the transaction without committing, e.g. when the target is
    /// deleted mid-drag.
    pub fn cancel(&mut self) -> Option<Uuid> {
        self.active.take().map(|tx| tx.target)
    }
}
