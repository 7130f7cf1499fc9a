//! Outbound session-control signals to the viewer.
//!
//! These are best-effort, fire-and-forget notifications: the session emits
//! them and proceeds without waiting for any acknowledgement. A dropped
//! receiver is not an error.

use serde_json::{json, Value};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::trace;

/// One notification to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerSignal {
    /// Ask the viewer to refresh its saved-set options before it shows the
    /// load dialog.
    RequestSavedSets,
    /// Tell the viewer a checkpoint of the named set is about to be
    /// written.
    SaveCheckpoint {
        /// Checkpoint file stem.
        name: String,
    },
}

impl ViewerSignal {
    /// Wire form of the signal, pushed on the control socket.
    pub fn to_event(&self) -> Value {
        match self {
            ViewerSignal::RequestSavedSets => json!({
                "event": "signal",
                "signal": "request_saved_sets",
            }),
            ViewerSignal::SaveCheckpoint { name } => json!({
                "event": "signal",
                "signal": "save_checkpoint",
                "name": name,
            }),
        }
    }
}

/// Sending half handed to the session.
#[derive(Debug, Clone)]
pub struct SignalSink {
    tx: Sender<ViewerSignal>,
}

impl SignalSink {
    /// Emit a signal. Never blocks and never fails.
    pub fn send(&self, signal: ViewerSignal) {
        trace!(?signal, "viewer signal");
        let _ = self.tx.send(signal);
    }
}

/// Create a connected sink/receiver pair.
pub fn signal_channel() -> (SignalSink, Receiver<ViewerSignal>) {
    let (tx, rx) = mpsc::channel();
    (SignalSink { tx }, rx)
}
