// src/server/mod.rs

//! Development HTTP server with live reload.
//!
//! [`DevServer`] serves the build directory, pushes reload/stream messages
//! to connected browsers over server-sent events, and injects a small client
//! script into every HTML page it serves.

pub mod client;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{TaskError, TaskResult};

use self::client::{CLIENT_JS, CLIENT_PATH, EVENTS_PATH, inject_client_tag};

/// Message pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadMessage {
    /// Reload the whole page.
    Reload,
    /// These build-relative paths changed; stylesheets are swapped in place.
    Stream { paths: Vec<String> },
}

impl ReloadMessage {
    fn to_event(&self) -> Event {
        match self {
            ReloadMessage::Reload => Event::default().event("reload").data("reload"),
            ReloadMessage::Stream { paths } => {
                Event::default().event("stream").data(paths.join("\n"))
            }
        }
    }
}

/// Static settings of the dev server.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    /// Directory served as the site root.
    pub root: PathBuf,
    pub cors: bool,
    pub log_startup: bool,
}

impl ServerSettings {
    pub fn from_config(config: &ConfigFile, build_dir: PathBuf) -> Self {
        Self {
            addr: SocketAddr::new(config.server.host, config.server.port),
            root: build_dir,
            cors: config.server.cors,
            log_startup: config.server.log_startup,
        }
    }
}

/// How long `stop` waits for in-flight requests before aborting the server.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct RunningServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Shared handle to the development server.
///
/// Constructed once and passed around as `Arc<DevServer>`. Until
/// [`DevServer::start`] succeeds (and after [`DevServer::stop`]) reload and
/// stream requests are silently ignored.
pub struct DevServer {
    settings: ServerSettings,
    tx: broadcast::Sender<ReloadMessage>,
    running: AtomicBool,
    state: Mutex<Option<RunningServer>>,
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServer")
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct AppState {
    tx: broadcast::Sender<ReloadMessage>,
    /// Flips to `true` on stop; open event streams end when it does.
    shutdown: watch::Receiver<bool>,
}

impl DevServer {
    pub fn new(settings: ServerSettings) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            settings,
            tx,
            running: AtomicBool::new(false),
            state: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the listener and start serving in the background.
    ///
    /// Returns the bound address (useful when the configured port is 0).
    /// Starting an already running server is an error.
    pub async fn start(&self) -> TaskResult<SocketAddr> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(TaskError::Other(anyhow!("dev server is already running")));
        }

        let addr = self.settings.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TaskError::Bind { addr, source })?;
        let local = listener
            .local_addr()
            .map_err(|source| TaskError::Bind { addr, source })?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let app = self.router(shutdown_rx.clone());

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            });
            if let Err(e) = serve.await {
                warn!(error = %e, "dev server stopped with error");
            }
        });

        if self.settings.log_startup {
            info!(addr = %local, root = ?self.settings.root, "dev server listening");
        } else {
            debug!(addr = %local, root = ?self.settings.root, "dev server listening");
        }

        *state = Some(RunningServer {
            addr: local,
            shutdown: shutdown_tx,
            handle,
        });
        self.running.store(true, Ordering::SeqCst);
        Ok(local)
    }

    /// Address the server is bound to, if running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().await.as_ref().map(|s| s.addr)
    }

    /// Ask every connected browser to reload.
    pub fn reload(&self) {
        self.send(ReloadMessage::Reload);
    }

    /// Push changed build-relative paths to connected browsers.
    ///
    /// Source maps are left out; browsers pick them up with the stylesheet.
    pub fn stream(&self, paths: Vec<String>) {
        let paths: Vec<String> = paths.into_iter().filter(|p| !p.ends_with(".map")).collect();
        if paths.is_empty() {
            return;
        }
        self.send(ReloadMessage::Stream { paths });
    }

    /// Subscribe to outgoing messages (the SSE endpoint uses this too).
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Stop serving and wait for the server task to finish.
    ///
    /// Live-reload streams are closed first so connected browsers do not
    /// hold the graceful shutdown open. Anything still running after
    /// [`SHUTDOWN_GRACE`] is aborted.
    pub async fn stop(&self) {
        let running = self.state.lock().await.take();
        self.running.store(false, Ordering::SeqCst);
        let Some(mut server) = running else {
            return;
        };

        let _ = server.shutdown.send(true);
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "dev server task did not shut down cleanly"),
            Err(_) => {
                warn!("dev server did not drain in time; aborting open connections");
                server.handle.abort();
            }
        }
        debug!(addr = %server.addr, "dev server stopped");
    }

    fn send(&self, message: ReloadMessage) {
        if !self.is_running() {
            debug!(?message, "dev server not running; dropping message");
            return;
        }
        // An error only means nobody is connected.
        match self.tx.send(message) {
            Ok(receivers) => debug!(receivers, "sent live-reload message"),
            Err(_) => debug!("no live-reload clients connected"),
        }
    }

    fn router(&self, shutdown: watch::Receiver<bool>) -> Router {
        let state = AppState {
            tx: self.tx.clone(),
            shutdown,
        };
        let serve_dir = ServeDir::new(&self.settings.root).append_index_html_on_directories(true);

        let mut app = Router::new()
            .route(EVENTS_PATH, get(events))
            .route(CLIENT_PATH, get(client_script))
            .fallback_service(serve_dir)
            .layer(middleware::map_response(inject_into_html))
            .with_state(state);

        if self.settings.cors {
            app = app.layer(CorsLayer::permissive());
        }
        app
    }
}

async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let messages = BroadcastStream::new(state.tx.subscribe())
        .filter_map(|msg| msg.ok().map(|m| Some(m.to_event())));
    let stopped = WatchStream::new(state.shutdown)
        .filter(|stop| *stop)
        .map(|_| None::<Event>);

    // `None` marks shutdown and ends the stream.
    let stream = messages
        .merge(stopped)
        .take_while(Option::is_some)
        .filter_map(|event| event.map(Ok::<_, Infallible>));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("application/javascript"))],
        CLIENT_JS,
    )
}

async fn inject_into_html(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html || !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to buffer html response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(inject_client_tag(&html)))
}
