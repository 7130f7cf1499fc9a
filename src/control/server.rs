//! Control socket listener.
//!
//! Accepts one active viewer at a time, authenticates it via the protocol
//! hello, and forwards decoded requests into the session loop over a
//! bounded channel. Responses flow back per request until the completion
//! event for that request type has been written.

use crate::control::protocol::{self, ErrorCode, Request};
use anyhow::Result;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
#[cfg(unix)]
use std::os::unix::{fs::FileTypeExt, net::UnixListener, net::UnixStream};

/// Messages from the connection threads to the session loop.
pub enum ControlMsg {
    /// A viewer completed the hello handshake.
    Connected,
    /// The active viewer went away.
    Disconnected,
    /// One decoded request; every response value sent on `respond_to` is
    /// written back to the viewer, and the request is done once the
    /// completion event appears.
    Request {
        request: Request,
        respond_to: SyncSender<serde_json::Value>,
    },
}

/// Receiving half owned by the session loop.
pub struct ControlEndpoint {
    pub rx: Receiver<ControlMsg>,
}

/// Handle to the listening server.
pub struct ControlServerHandle {
    pub endpoint: ControlEndpoint,
    #[allow(dead_code)]
    join: thread::JoinHandle<()>,
}

pub struct ControlServer;

impl ControlServer {
    /// Listen on a TCP address.
    pub fn start(addr: SocketAddr, token: Option<String>) -> Result<ControlServerHandle> {
        let (to_session_tx, to_session_rx) = mpsc::sync_channel::<ControlMsg>(256);
        let listener = TcpListener::bind(addr)?;
        let viewer_active = Arc::new(AtomicBool::new(false));

        let join = thread::spawn(move || {
            tracing::info!(addr = %addr, "control server listening");
            loop {
                let (stream, peer) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(err) => {
                        tracing::warn!(%err, "control server accept failed");
                        continue;
                    }
                };
                spawn_connection(
                    stream,
                    peer.to_string(),
                    token.clone(),
                    Arc::clone(&viewer_active),
                    to_session_tx.clone(),
                );
            }
        });

        Ok(ControlServerHandle {
            endpoint: ControlEndpoint { rx: to_session_rx },
            join,
        })
    }

    /// Listen on a Unix socket, replacing a stale socket file if present.
    #[cfg(unix)]
    pub fn start_uds(path: PathBuf, token: Option<String>) -> Result<ControlServerHandle> {
        let (to_session_tx, to_session_rx) = mpsc::sync_channel::<ControlMsg>(256);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            let meta = std::fs::metadata(&path)?;
            if meta.file_type().is_socket() {
                std::fs::remove_file(&path)?;
            } else {
                anyhow::bail!("socket path exists and is not a socket: {}", path.display());
            }
        }

        let listener = UnixListener::bind(&path)?;
        let viewer_active = Arc::new(AtomicBool::new(false));

        let join = thread::spawn(move || {
            tracing::info!(path = %path.display(), "control server listening (uds)");
            loop {
                let (stream, _peer) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(err) => {
                        tracing::warn!(%err, "control server accept failed");
                        continue;
                    }
                };
                spawn_connection(
                    stream,
                    path.display().to_string(),
                    token.clone(),
                    Arc::clone(&viewer_active),
                    to_session_tx.clone(),
                );
            }
        });

        Ok(ControlServerHandle {
            endpoint: ControlEndpoint { rx: to_session_rx },
            join,
        })
    }
}

trait ControlStream: Read + Write + Send + 'static {
    fn try_clone(&self) -> std::io::Result<Self>
    where
        Self: Sized;
    fn shutdown(&self, how: Shutdown) -> std::io::Result<()>;
}

impl ControlStream for TcpStream {
    fn try_clone(&self) -> std::io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn shutdown(&self, how: Shutdown) -> std::io::Result<()> {
        TcpStream::shutdown(self, how)
    }
}

#[cfg(unix)]
impl ControlStream for UnixStream {
    fn try_clone(&self) -> std::io::Result<Self> {
        UnixStream::try_clone(self)
    }

    fn shutdown(&self, how: Shutdown) -> std::io::Result<()> {
        UnixStream::shutdown(self, how)
    }
}

fn spawn_connection<S: ControlStream>(
    stream: S,
    peer: String,
    token: Option<String>,
    viewer_active: Arc<AtomicBool>,
    to_session: SyncSender<ControlMsg>,
) {
    thread::spawn(move || handle_connection(stream, peer, token, viewer_active, to_session));
}

fn handle_connection<S: ControlStream>(
    mut stream: S,
    peer: String,
    token: Option<String>,
    viewer_active: Arc<AtomicBool>,
    to_session: SyncSender<ControlMsg>,
) {
    let claimed = viewer_active
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok();

    if !claimed {
        let mut writer = BufWriter::new(&mut stream);
        let _ = write_value(
            &mut writer,
            &protocol::event_error(None, ErrorCode::Busy, "viewer already connected"),
        );
        drop(writer);
        let _ = stream.shutdown(Shutdown::Both);
        return;
    }

    tracing::info!(peer, "viewer connected");

    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(%err, "failed to clone control stream");
            viewer_active.store(false, Ordering::SeqCst);
            return;
        }
    });
    let mut writer = BufWriter::new(stream);

    let mut authed = false;
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // disconnect
            Ok(n) => {
                if n > protocol::MAX_LINE_BYTES {
                    let _ = write_value(
                        &mut writer,
                        &protocol::event_error(None, ErrorCode::BadRequest, "line too large"),
                    );
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(%err, "control read failed");
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let req = match protocol::decode_request(trimmed) {
            Ok(req) => req,
            Err(err) => {
                let _ = write_value(
                    &mut writer,
                    &protocol::event_error(err.id, err.code, err.message),
                );
                continue;
            }
        };

        match req {
            Request::Hello(hello) => {
                if authed {
                    let _ = write_value(
                        &mut writer,
                        &protocol::event_error(
                            hello.id,
                            ErrorCode::BadRequest,
                            "hello already completed",
                        ),
                    );
                    continue;
                }

                if hello.version != protocol::PROTOCOL_VERSION {
                    let _ = write_value(
                        &mut writer,
                        &protocol::event_error(
                            hello.id,
                            ErrorCode::Unsupported,
                            format!(
                                "unsupported protocol version {}, expected {}",
                                hello.version,
                                protocol::PROTOCOL_VERSION
                            ),
                        ),
                    );
                    break;
                }

                if let Some(expected) = &token {
                    if hello.token.as_deref() != Some(expected.as_str()) {
                        let _ = write_value(
                            &mut writer,
                            &protocol::event_error(
                                hello.id,
                                ErrorCode::Unauthorized,
                                "invalid token",
                            ),
                        );
                        break;
                    }
                }

                authed = true;
                let capabilities = [
                    "hello",
                    "add_layout",
                    "delete_layout",
                    "delete_all",
                    "rename_layout",
                    "set_visible",
                    "swap_layouts",
                    "set_opacity",
                    "toggle_gizmo",
                    "begin_adjust",
                    "adjust",
                    "end_adjust",
                    "open_load_dialog",
                    "load_set",
                    "upload_sets",
                    "advance_scene",
                    "export_set",
                    "get_state",
                    "shutdown",
                ];
                let _ = write_value(&mut writer, &protocol::event_hello(hello.id, &capabilities));
                let _ = to_session.send(ControlMsg::Connected);
            }
            other => {
                if !authed {
                    let _ = write_value(
                        &mut writer,
                        &protocol::event_error(
                            other.request_id(),
                            ErrorCode::Unauthorized,
                            "hello required",
                        ),
                    );
                    break;
                }

                let (resp_tx, resp_rx) = mpsc::sync_channel(8);
                let completion_event = completion_event_for_request(&other);
                let request_id = other.request_id();
                match to_session.try_send(ControlMsg::Request {
                    request: other,
                    respond_to: resp_tx,
                }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        let _ = write_value(
                            &mut writer,
                            &protocol::event_error(request_id, ErrorCode::Busy, "session busy"),
                        );
                        continue;
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }

                loop {
                    match resp_rx.recv_timeout(Duration::from_secs(30)) {
                        Ok(value) => {
                            let done = is_completion_event(completion_event, &value);
                            let _ = write_value(&mut writer, &value);
                            if done {
                                break;
                            }
                        }
                        Err(_) => {
                            let _ = write_value(
                                &mut writer,
                                &protocol::event_error(
                                    None,
                                    ErrorCode::Internal,
                                    "timeout waiting for response",
                                ),
                            );
                            break;
                        }
                    }
                }
            }
        }
    }

    tracing::info!(peer, "viewer disconnected");
    if authed {
        let _ = to_session.send(ControlMsg::Disconnected);
    }
    viewer_active.store(false, Ordering::SeqCst);
}

fn completion_event_for_request(request: &Request) -> &'static str {
    match request {
        Request::Hello(_) => "hello",
        Request::ToggleGizmo(_) => "gizmo",
        Request::LoadSet(_) | Request::UploadSets(_) | Request::AdvanceScene(_) => "imported",
        Request::ExportSet(_) => "exported",
        Request::GetState(_) => "state",
        Request::Unknown { .. } => "error",
        _ => "ok",
    }
}

fn is_completion_event(expected_event: &str, value: &serde_json::Value) -> bool {
    let event = value
        .get("event")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if event == "error" {
        return true;
    }
    event == expected_event
}

fn write_value<W: Write>(writer: &mut W, value: &serde_json::Value) -> Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
