// src/reload/server.rs

//! Preview server: static files from the build directory plus the live
//! reload endpoint.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{header, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::errors::{AssetwatchError, Result};
use crate::reload::{LiveReload, RELOAD_MESSAGE};

pub const CLIENT_PATH: &str = "/__assetwatch/client.js";
pub const WS_PATH: &str = "/__assetwatch/ws";

/// Largest HTML body the script injector will buffer.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const CLIENT_JS: &str = r#"(function () {
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  function connect() {
    var ws = new WebSocket(proto + location.host + "/__assetwatch/ws");
    ws.onmessage = function (e) {
      if (e.data === "reload") location.reload();
    };
    ws.onclose = function () {
      setTimeout(connect, 1000);
    };
  }
  connect();
})();
"#;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub base_dir: PathBuf,
}

/// Running preview server. Dropping it stops the server.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait briefly for open ones to close.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(_) => info!(addr = %self.addr, "preview server stopped"),
                Err(_) => {
                    warn!(addr = %self.addr, "preview server did not stop in time; aborting");
                    task.abort();
                }
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Bind and start the preview server.
///
/// Binding failure is a `StartupError`.
pub async fn serve(opts: &ServeOptions, reload: LiveReload) -> Result<ServerHandle> {
    let bind = format!("{}:{}", opts.host, opts.port);
    let listener = TcpListener::bind(&bind).await.map_err(|e| {
        AssetwatchError::StartupError(format!("binding preview server to {}: {}", bind, e))
    })?;
    let addr = listener.local_addr()?;

    let app = router(&opts.base_dir, reload);
    let (tx, rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = rx.await;
        });
        if let Err(e) = server.await {
            warn!(error = %e, "preview server error");
        }
    });

    info!(%addr, base_dir = ?opts.base_dir, "preview server listening");

    Ok(ServerHandle {
        addr,
        shutdown: Some(tx),
        task: Some(task),
    })
}

pub(crate) fn router(base_dir: &Path, reload: LiveReload) -> Router {
    Router::new()
        .route(CLIENT_PATH, get(client_js))
        .route(WS_PATH, get(ws_upgrade))
        .fallback_service(ServeDir::new(base_dir).append_index_html_on_directories(true))
        .layer(map_response(inject_client_script))
        .with_state(reload)
}

async fn client_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(reload): State<LiveReload>) -> Response {
    let rx = reload.subscribe();
    ws.on_upgrade(move |socket| client_session(socket, rx))
}

async fn client_session(mut socket: WebSocket, mut rx: broadcast::Receiver<()>) {
    debug!("live reload client connected");
    loop {
        tokio::select! {
            signal = rx.recv() => match signal {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    if socket.send(Message::Text(RELOAD_MESSAGE.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("live reload client disconnected");
}

async fn inject_client_script(response: Response) -> Response {
    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "could not buffer html response for script injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script_tag(&bytes);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert the client script tag before the last `</body>`, or append it.
///
/// Operates on raw bytes: pages that are not UTF-8 come back unchanged apart
/// from the tag.
pub fn inject_script_tag(html: &[u8]) -> Vec<u8> {
    const CLOSING_BODY: &[u8] = b"</body>";
    let tag = format!(r#"<script src="{}"></script>"#, CLIENT_PATH);
    let idx = html
        .windows(CLOSING_BODY.len())
        .rposition(|w| w.eq_ignore_ascii_case(CLOSING_BODY))
        .unwrap_or(html.len());

    let mut out = Vec::with_capacity(html.len() + tag.len());
    out.extend_from_slice(&html[..idx]);
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(&html[idx..]);
    out
}
