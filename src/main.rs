//! roomtag - headless 3D room-layout annotation session engine
//!
//! Owns the layout-set data model and drives an external viewer process
//! over a line-delimited JSON control socket.

use anyhow::{Context, Result};
use roomtag::config::{SessionConfig, DEFAULT_CONFIG_PATH};
use roomtag::control::{ControlEndpoint, ControlMsg, ControlServer};
use roomtag::session::{handle_request, LayoutSession};
use roomtag::signals::{signal_channel, ViewerSignal};
use roomtag_core::Vocabulary;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::info;

struct CliArgs {
    config_path: PathBuf,
    listen: Option<String>,
    uds: Option<PathBuf>,
    token: Option<String>,
    export_dir: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("usage: roomtag [options]");
    eprintln!("  --config PATH       config file (default: {DEFAULT_CONFIG_PATH})");
    eprintln!("  --listen ADDR       TCP listen address, overrides config");
    eprintln!("  --uds PATH          Unix socket path, overrides config");
    eprintln!("  --token TOKEN       require this token in the viewer hello");
    eprintln!("  --export-dir PATH   directory for exported layout sets");
}

fn parse_args() -> Result<CliArgs> {
    let mut args = CliArgs {
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        listen: None,
        uds: None,
        token: None,
        export_dir: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config_path = PathBuf::from(
                    iter.next().context("--config requires a path")?,
                );
            }
            "--listen" => {
                args.listen = Some(iter.next().context("--listen requires an address")?);
            }
            "--uds" => {
                args.uds = Some(PathBuf::from(iter.next().context("--uds requires a path")?));
            }
            "--token" => {
                args.token = Some(iter.next().context("--token requires a value")?);
            }
            "--export-dir" => {
                args.export_dir = Some(PathBuf::from(
                    iter.next().context("--export-dir requires a path")?,
                ));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                print_usage();
                anyhow::bail!("unknown argument `{other}`");
            }
        }
    }
    Ok(args)
}

fn load_vocabulary(path: Option<&Path>) -> Result<Vocabulary> {
    match path {
        None => Ok(Vocabulary::indoor()),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read vocabulary {}", path.display()))?;
            Vocabulary::from_json(&raw)
                .with_context(|| format!("invalid vocabulary {}", path.display()))
        }
    }
}

fn main() -> Result<()> {
    // Default to INFO; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let mut config = SessionConfig::load(&args.config_path)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if args.uds.is_some() {
        config.uds = args.uds;
    }
    if args.token.is_some() {
        config.token = args.token;
    }
    if let Some(export_dir) = args.export_dir {
        config.export_dir = export_dir;
    }

    let vocab = load_vocabulary(config.vocabulary.as_deref())?;
    info!(categories = vocab.len(), "vocabulary loaded");

    let (signal_sink, signal_rx) = signal_channel();
    let mut session = LayoutSession::new(
        vocab,
        config.opacity,
        config.export_dir.clone(),
        signal_sink,
    );

    let handle = match &config.uds {
        #[cfg(unix)]
        Some(path) => ControlServer::start_uds(path.clone(), config.token.clone())?,
        #[cfg(not(unix))]
        Some(_) => anyhow::bail!("unix sockets are not supported on this platform"),
        None => {
            let addr = config
                .listen
                .parse()
                .with_context(|| format!("invalid listen address `{}`", config.listen))?;
            ControlServer::start(addr, config.token.clone())?
        }
    };

    run_session_loop(&mut session, handle.endpoint, signal_rx);
    info!("session finished");
    Ok(())
}

/// Drain the control channel until shutdown.
///
/// All session mutation happens here, on one thread; connection threads
/// only decode requests and write responses.
fn run_session_loop(
    session: &mut LayoutSession,
    endpoint: ControlEndpoint,
    signal_rx: Receiver<ViewerSignal>,
) {
    while let Ok(msg) = endpoint.rx.recv() {
        match msg {
            ControlMsg::Connected => info!("viewer session started"),
            ControlMsg::Disconnected => info!("viewer session ended"),
            ControlMsg::Request {
                request,
                respond_to,
            } => {
                let disposition = handle_request(session, request);

                // Fire-and-forget signals emitted while handling go out
                // before the completion event.
                while let Ok(signal) = signal_rx.try_recv() {
                    let _ = respond_to.send(signal.to_event());
                }
                for event in disposition.events {
                    let _ = respond_to.send(event);
                }

                if disposition.shutdown {
                    return;
                }
            }
        }
    }
}
