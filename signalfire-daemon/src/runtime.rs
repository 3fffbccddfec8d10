use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, RwLock};

use signalfire_core::{Cache, Collator, Config, PollRecords, PollTarget, RuleSet, Scheduler};
use signalfire_director::HttpDirector;

use crate::error::{io_err, DaemonError};
use crate::protocol::{DaemonRequest, DaemonResponse};
use crate::views::{directors_view, groups_view, pollers_view};

/// Everything a socket client can read.
struct Shared {
    cache: Arc<Cache>,
    collator: Arc<Collator>,
    records: Arc<RwLock<PollRecords>>,
    socket: PathBuf,
    started_at_unix: u64,
}

/// Install logging, start the daemon runtime, and block until it exits.
pub fn start_blocking(config: Config, socket: PathBuf) -> Result<(), DaemonError> {
    init_tracing(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, socket))
}

/// Connect to every configured director, then serve until stopped.
///
/// A director that cannot be reached or logged into at startup is an error;
/// once running, poll failures are only logged.
pub async fn run(config: Config, socket: PathBuf) -> Result<(), DaemonError> {
    let rules = config.rule_set()?;

    let mut targets = Vec::with_capacity(config.targets.len());
    for target in config.targets {
        let poll_interval = target.poll_interval();
        let director = tokio::task::spawn_blocking(move || HttpDirector::connect(&target))
            .await
            .map_err(|err| DaemonError::Protocol(format!("director connect join error: {err}")))?;
        let director = director?;
        targets.push(PollTarget {
            client: Arc::new(director),
            poll_interval,
        });
    }

    serve(targets, rules, socket).await
}

/// Wire the cache, collator, and pollers together and answer socket requests.
///
/// Returns when a client sends `stop`, on ctrl-c, or when any task fails. A
/// collator consistency fault is returned as the error.
pub async fn serve(
    targets: Vec<PollTarget>,
    rules: RuleSet,
    socket: PathBuf,
) -> Result<(), DaemonError> {
    let cache = Arc::new(Cache::new());
    let collator = Arc::new(Collator::new(rules));
    let scheduler = Scheduler::new(targets, cache.clone());
    let shared = Arc::new(Shared {
        cache: cache.clone(),
        collator: collator.clone(),
        records: scheduler.records(),
        socket: socket.clone(),
        started_at_unix: unix_seconds_now(),
    });

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let collator_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                result = collator.watch(cache) => result.map_err(DaemonError::from),
            };
            if let Err(err) = &result {
                tracing::error!(error = %err, "collator stopped");
            }
            let _ = shutdown.send(());
            result
        })
    };

    let pollers = scheduler.start();

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        let shared = shared.clone();
        tokio::spawn(async move {
            let result = socket_server_task(shared, shutdown.clone(), shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!(
                            "ctrl-c handler failed: {err}"
                        ))),
                    }
                }
            }
        })
    };

    tracing::info!(
        socket = %socket.display(),
        directors = pollers.len(),
        rules = shared.collator.rules().len(),
        "signalfire daemon started",
    );

    let (collator_result, socket_result, signal_result) =
        tokio::join!(collator_handle, socket_handle, signal_handle);

    for poller in &pollers {
        poller.abort();
    }

    handle_join("collator", collator_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn socket_server_task(
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = shared.socket.clone();
    if let Some(parent) = socket.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    prepare_socket_for_bind(&socket)?;
    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let shared = shared.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, shared, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match request.cmd.as_str() {
            "status" => DaemonResponse::ok(build_status_payload(&shared).await),
            "directors" => {
                let environments = shared.cache.get_environments().await;
                DaemonResponse::ok(json!(directors_view(&environments)))
            }
            "groups" => {
                let groups = shared.collator.get_deployment_groups().await;
                DaemonResponse::ok(json!(groups_view(groups, request.group.as_deref())))
            }
            "stop" => DaemonResponse::ok(json!({ "stopping": true })),
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if request.cmd == "stop" {
            tracing::info!("stop requested over socket");
            let _ = shutdown_tx.send(());
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(shared: &Shared) -> Value {
    let directors = shared.cache.len().await;
    let groups = shared.collator.get_deployment_groups().await.len();
    let pollers = {
        let records = shared.records.read().await;
        pollers_view(&records)
    };

    json!({
        "running": true,
        "started_at_unix": shared.started_at_unix,
        "socket": shared.socket.display().to_string(),
        "directors": directors,
        "groups": groups,
        "rules": shared.collator.rules().len(),
        "pollers": pollers,
    })
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `RUST_LOG` wins; otherwise `log.level` from the config.
fn init_tracing(config: &Config) -> Result<(), DaemonError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = config.log_level()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let installed = if config.log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| DaemonError::Logging(err.to_string()))
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
