//! The annotation session.
//!
//! [`LayoutSession`] owns the layout-set collection, the scene mirror, the
//! gizmo binding and the pending-import queue. Every viewer action goes
//! through exactly one method here; nothing else mutates the shared state,
//! so the collection and its derived views can never be observed
//! half-updated.

use crate::control::protocol::{self, ErrorCode, Request};
use crate::signals::{SignalSink, ViewerSignal};
use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use roomtag_core::Vocabulary;
use roomtag_layoutset::{ImportOutcome, ImportQueue, LayoutSet, PendingFile};
use roomtag_scene::{AdjustController, BindingChange, GizmoBinding, SceneNode, ScenePath, SceneStore};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Root of the scene subtree the session owns.
const LAYOUTS_ROOT: &str = "layouts";

/// Staged transform patch from one drag frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustPatch {
    pub position: Option<Vec3>,
    pub yaw_degrees: Option<f32>,
    pub scale: Option<Vec3>,
}

/// What the session loop should do after handling a request.
pub struct RequestDisposition {
    /// Events to write back, in order. The last one is the completion
    /// event for the request.
    pub events: Vec<Value>,
    /// Whether the session should shut down.
    pub shutdown: bool,
}

/// One annotation session: the owned collection plus all manipulation
/// state, mutated only through the action methods below.
pub struct LayoutSession {
    set: LayoutSet,
    scene: SceneStore,
    gizmo: GizmoBinding,
    adjust: AdjustController,
    queue: ImportQueue,
    signals: SignalSink,
    export_dir: PathBuf,
    export_seq: u64,
}

impl LayoutSession {
    /// Create an empty session.
    pub fn new(
        vocab: Vocabulary,
        opacity: f32,
        export_dir: PathBuf,
        signals: SignalSink,
    ) -> Self {
        let mut set = LayoutSet::new(vocab);
        set.set_opacity(opacity);
        Self {
            set,
            scene: SceneStore::new(),
            gizmo: GizmoBinding::new(),
            adjust: AdjustController::new(),
            queue: ImportQueue::new(),
            signals,
            export_dir,
            export_seq: 0,
        }
    }

    /// The layout-set collection.
    pub fn set(&self) -> &LayoutSet {
        &self.set
    }

    /// The scene mirror.
    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    /// The gizmo binding.
    pub fn gizmo(&self) -> &GizmoBinding {
        &self.gizmo
    }

    /// Files still waiting in the import queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Add a record of the named category. Returns its display index.
    pub fn add_layout(&mut self, category: &str) -> Result<usize> {
        let record = self
            .set
            .add(category)
            .with_context(|| format!("cannot add `{category}`"))?;
        let uuid = record.uuid;
        self.mirror_record(uuid)?;
        Ok(self.set.len() - 1)
    }

    /// Delete the record at a display index. Detaches the gizmo and drops
    /// any open adjustment if they target it.
    pub fn delete_layout(&mut self, index: usize) -> Result<()> {
        let record = self
            .set
            .delete(index)
            .ok_or_else(|| anyhow!("no record at index {index}"))?;
        if self.adjust.target() == Some(record.uuid) {
            self.adjust.cancel();
        }
        self.gizmo.on_deleted(record.uuid);
        self.scene.delete(&record_path(record.uuid)?);
        Ok(())
    }

    /// Delete every record and reset all manipulation state.
    pub fn delete_all(&mut self) -> usize {
        self.adjust.cancel();
        self.gizmo.clear();
        let removed = self.set.delete_all();
        self.scene.delete_subtree(&layouts_root());
        removed
    }

    /// Rename the record at a display index.
    pub fn rename_layout(&mut self, index: usize, name: &str) -> Result<()> {
        if !self.set.rename(index, name) {
            bail!("no record at index {index}");
        }
        Ok(())
    }

    /// Set visibility of the record at a display index.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        let uuid = self
            .set
            .get(index)
            .map(|r| r.uuid)
            .ok_or_else(|| anyhow!("no record at index {index}"))?;
        self.set.set_visible(index, visible);
        if let Some(node) = self.scene.get_mut(&record_path(uuid)?) {
            node.visible = visible;
        }
        Ok(())
    }

    /// Swap two display positions.
    pub fn swap_layouts(&mut self, a: usize, b: usize) -> Result<()> {
        if !self.set.swap(a, b) {
            bail!("swap indices out of range: {a}, {b}");
        }
        Ok(())
    }

    /// Set the session-global opacity.
    pub fn set_opacity(&mut self, value: f32) {
        self.set.set_opacity(value);
    }

    /// Toggle the gizmo binding for the record at a display index.
    pub fn toggle_gizmo(&mut self, index: usize) -> Result<BindingChange> {
        let record = self
            .set
            .get(index)
            .ok_or_else(|| anyhow!("no record at index {index}"))?;
        let uuid = record.uuid;
        let change = self.gizmo.toggle(uuid);
        if !matches!(change, BindingChange::Detached) && self.adjust.target() != Some(uuid) {
            // Retargeting mid-drag abandons the stale adjustment.
            self.adjust.cancel();
        }
        Ok(change)
    }

    /// Open an adjustment transaction for the record at a display index.
    /// The record must currently hold the gizmo.
    pub fn begin_adjust(&mut self, index: usize) -> Result<()> {
        let record = self
            .set
            .get(index)
            .ok_or_else(|| anyhow!("no record at index {index}"))?;
        let uuid = record.uuid;
        if !self.gizmo.is_bound(uuid) {
            bail!("record at index {index} is not bound to the gizmo");
        }
        self.adjust.begin(uuid)?;
        Ok(())
    }

    /// Stage one drag frame onto the open adjustment.
    pub fn adjust(&mut self, patch: AdjustPatch) -> Result<()> {
        if let Some(position) = patch.position {
            self.adjust.stage_position(position)?;
        }
        if let Some(yaw) = patch.yaw_degrees {
            self.adjust.stage_yaw(yaw)?;
        }
        if let Some(scale) = patch.scale {
            self.adjust.stage_scale(scale)?;
        }
        Ok(())
    }

    /// Commit the open adjustment: the staged pose is applied to the record
    /// and the scene mirror in one step.
    pub fn end_adjust(&mut self) -> Result<()> {
        let commit = self.adjust.end()?;
        if let Some(position) = commit.position {
            self.set.set_position(commit.target, position);
        }
        if let Some(yaw) = commit.yaw_degrees {
            self.set.set_yaw(commit.target, yaw);
        }
        if let Some(scale) = commit.scale {
            self.set.set_scale(commit.target, scale);
        }
        self.mirror_record(commit.target)?;
        Ok(())
    }

    /// Announce that the viewer is about to show the load dialog.
    pub fn open_load_dialog(&mut self) {
        self.signals.send(ViewerSignal::RequestSavedSets);
    }

    /// Apply one saved set, merged onto or replacing the collection.
    pub fn load_set(&mut self, name: &str, contents: &str, replace: bool) -> Result<ImportOutcome> {
        let parsed = roomtag_layoutset::SerializedSet::from_json(contents)
            .with_context(|| format!("cannot load `{name}`"))?;
        let outcome = self
            .set
            .import(&parsed, replace)
            .with_context(|| format!("cannot load `{name}`"))?;
        if replace {
            self.reset_manipulation();
        }
        self.rebuild_scene()?;
        Ok(outcome)
    }

    /// Apply a multi-file upload: first file merges now, the rest queue up
    /// for [`LayoutSession::advance_scene`].
    pub fn upload_sets(&mut self, files: Vec<PendingFile>) -> Result<ImportOutcome> {
        let outcome = self.queue.upload(&mut self.set, files)?;
        self.rebuild_scene()?;
        Ok(outcome)
    }

    /// Move to the next queued set, replacing the current scene.
    pub fn advance_scene(&mut self) -> Result<ImportOutcome> {
        let outcome = self
            .queue
            .advance(&mut self.set)?
            .ok_or_else(|| anyhow!("no queued layout sets"))?;
        self.reset_manipulation();
        self.rebuild_scene()?;
        info!(total = outcome.total, remaining = self.queue.len(), "advanced to next scene");
        Ok(outcome)
    }

    /// Export the collection as a checkpoint file. Returns the checkpoint
    /// name and the written path.
    pub fn export_set(&mut self, name: Option<String>) -> Result<(String, PathBuf)> {
        // Validate before announcing the checkpoint: an empty set must not
        // emit a save signal.
        let json = self.set.export_json()?;

        let name = name.unwrap_or_else(|| {
            self.export_seq += 1;
            format!("layout-set-{}", self.export_seq)
        });
        self.signals.send(ViewerSignal::SaveCheckpoint { name: name.clone() });

        std::fs::create_dir_all(&self.export_dir).with_context(|| {
            format!("failed to create export dir {}", self.export_dir.display())
        })?;
        let path = self.export_dir.join(format!("{name}.json"));
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "exported layout set");
        Ok((name, path))
    }

    /// JSON snapshot of the whole session for `get_state`.
    pub fn snapshot(&self) -> Value {
        let records: Vec<Value> = self
            .set
            .records()
            .iter()
            .enumerate()
            .map(|(index, r)| {
                json!({
                    "index": index,
                    "id": r.id.0,
                    "uuid": r.uuid.to_string(),
                    "name": r.name,
                    "category": self.set.vocabulary().name(r.category),
                    "label": r.category.0,
                    "position": r.position.to_array(),
                    "size": r.size.to_array(),
                    "yaw": r.yaw_degrees,
                    "visible": r.visible,
                })
            })
            .collect();

        let bound = self.gizmo.bound().and_then(|uuid| self.set.position_of(uuid));

        json!({
            "records": records,
            "counts": self.set.named_counts(),
            "opacity": self.set.opacity(),
            "bound": bound,
            "queued": self.queue.names(),
            "adjusting": self.adjust.is_active(),
        })
    }

    fn reset_manipulation(&mut self) {
        self.adjust.cancel();
        self.gizmo.clear();
    }

    fn mirror_record(&mut self, uuid: Uuid) -> Result<()> {
        let record = self
            .set
            .get_by_uuid(uuid)
            .ok_or_else(|| anyhow!("record {uuid} vanished from the collection"))?;
        let color = self
            .set
            .vocabulary()
            .get(record.category)
            .map(|def| def.color)
            .unwrap_or(0x808080);
        self.scene.set_object(
            record_path(uuid)?,
            SceneNode {
                position: record.position,
                yaw_degrees: record.yaw_degrees,
                extents: record.size,
                color,
                visible: record.visible,
            },
        );
        Ok(())
    }

    fn rebuild_scene(&mut self) -> Result<()> {
        self.scene.delete_subtree(&layouts_root());
        let uuids: Vec<Uuid> = self.set.records().iter().map(|r| r.uuid).collect();
        for uuid in uuids {
            self.mirror_record(uuid)?;
        }
        Ok(())
    }
}

fn layouts_root() -> ScenePath {
    ScenePath::new([LAYOUTS_ROOT]).expect("static path is valid")
}

fn record_path(uuid: Uuid) -> Result<ScenePath> {
    ScenePath::new([LAYOUTS_ROOT.to_string(), uuid.to_string()])
        .map_err(|err| anyhow!("record path: {err}"))
}

/// Handle one decoded control request against the session.
pub fn handle_request(session: &mut LayoutSession, request: Request) -> RequestDisposition {
    let id = request.request_id();
    let mut shutdown = false;

    let completion = match request {
        Request::Hello(_) => {
            // Hello is handled by the connection layer before requests reach
            // the session loop.
            protocol::event_error(id, ErrorCode::BadRequest, "hello already completed")
        }
        Request::AddLayout(req) => match session.add_layout(&req.category) {
            Ok(_) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::DeleteLayout(req) => match session.delete_layout(req.index) {
            Ok(()) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::DeleteAll(req) => {
            session.delete_all();
            protocol::event_ok(req.id)
        }
        Request::RenameLayout(req) => match session.rename_layout(req.index, &req.name) {
            Ok(()) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::SetVisible(req) => match session.set_visible(req.index, req.visible) {
            Ok(()) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::SwapLayouts(req) => match session.swap_layouts(req.a, req.b) {
            Ok(()) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::SetOpacity(req) => {
            session.set_opacity(req.value);
            protocol::event_ok(req.id)
        }
        Request::ToggleGizmo(req) => match session.toggle_gizmo(req.index) {
            Ok(_) => {
                let bound = session
                    .gizmo()
                    .bound()
                    .and_then(|uuid| session.set().position_of(uuid));
                protocol::event_gizmo(req.id, bound)
            }
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::BeginAdjust(req) => match session.begin_adjust(req.index) {
            Ok(()) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::Adjust(req) => {
            let patch = AdjustPatch {
                position: req.position.map(Vec3::from_array),
                yaw_degrees: req.yaw_degrees,
                scale: req.scale.map(Vec3::from_array),
            };
            match session.adjust(patch) {
                Ok(()) => protocol::event_ok(req.id),
                Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
            }
        }
        Request::EndAdjust(req) => match session.end_adjust() {
            Ok(()) => protocol::event_ok(req.id),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::OpenLoadDialog(req) => {
            session.open_load_dialog();
            protocol::event_ok(req.id)
        }
        Request::LoadSet(req) => {
            match session.load_set(&req.name, &req.contents, req.replace) {
                Ok(outcome) => protocol::event_imported(
                    req.id,
                    outcome.added,
                    outcome.total,
                    outcome.replaced,
                    session.queued(),
                ),
                Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
            }
        }
        Request::UploadSets(req) => {
            let files = req
                .files
                .into_iter()
                .map(|f| PendingFile::new(f.name, f.contents))
                .collect();
            match session.upload_sets(files) {
                Ok(outcome) => protocol::event_imported(
                    req.id,
                    outcome.added,
                    outcome.total,
                    outcome.replaced,
                    session.queued(),
                ),
                Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
            }
        }
        Request::AdvanceScene(req) => match session.advance_scene() {
            Ok(outcome) => protocol::event_imported(
                req.id,
                outcome.added,
                outcome.total,
                outcome.replaced,
                session.queued(),
            ),
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::ExportSet(req) => match session.export_set(req.name) {
            Ok((name, path)) => {
                protocol::event_exported(req.id, &name, &path.display().to_string())
            }
            Err(err) => protocol::event_error(req.id, ErrorCode::BadRequest, err.to_string()),
        },
        Request::GetState(req) => protocol::event_state(req.id, session.snapshot()),
        Request::Shutdown(req) => {
            shutdown = true;
            protocol::event_ok(req.id)
        }
        Request::Unknown { id, op } => {
            protocol::event_error(id, ErrorCode::Unsupported, format!("unknown op `{op}`"))
        }
    };

    RequestDisposition {
        events: vec![completion],
        shutdown,
    }
}
