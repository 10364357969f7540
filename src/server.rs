//! HTTP front end for the relay.
//!
//! ## Endpoints
//!
//! - `POST /llm/query`: multipart upload (`file`, optional `voiceId`), runs one turn
//! - `GET /health`: liveness plus the number of recorded exchanges
//! - `GET /static/*`: generated audio and the fallback clip

use crate::config::RelayConfig;
use crate::pipeline::TurnOrchestrator;
use crate::pipeline::coordinator::REQUEST_FAILED_MARKER;
use crate::pipeline::messages::TurnResult;
use crate::storage::MediaStore;
use axum::Router;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details within an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Error type (e.g. `"invalid_request_error"`).
    #[serde(rename = "type")]
    pub error_type: String,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Exchanges recorded since startup.
    pub turns: usize,
}

#[derive(Clone)]
struct AppState {
    orchestrator: TurnOrchestrator,
    media: MediaStore,
    default_voice_id: String,
}

/// Build the router. Exposed for embedding in a larger app.
pub fn router(
    orchestrator: TurnOrchestrator,
    media: MediaStore,
    default_voice_id: impl Into<String>,
    max_upload_bytes: usize,
) -> Router {
    let static_files = ServeDir::new(media.audio_dir());
    let prefix = media.public_prefix().to_owned();
    let state = AppState {
        orchestrator,
        media,
        default_voice_id: default_voice_id.into(),
    };

    let app = Router::new()
        .route("/llm/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state);

    let app = if prefix.is_empty() {
        app.fallback_service(static_files)
    } else {
        app.nest_service(&prefix, static_files)
    };
    app.layer(TraceLayer::new_for_http())
}

/// Running relay HTTP server.
pub struct RelayServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RelayServer {
    /// Bind `{server.host}:{server.port}` (port `0` auto-assigns) and serve in
    /// a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the media directories cannot be created or the
    /// listener cannot bind.
    pub async fn start(
        orchestrator: TurnOrchestrator,
        media: MediaStore,
        config: &RelayConfig,
    ) -> crate::error::Result<Self> {
        media.ensure_dirs()?;

        let app = router(
            orchestrator,
            media,
            config.tts.default_voice_id.clone(),
            config.server.max_upload_bytes,
        );

        let bind_addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            crate::error::RelayError::Server(format!("bind {bind_addr} failed: {e}"))
        })?;
        let addr = listener.local_addr().map_err(|e| {
            crate::error::RelayError::Server(format!("failed to get local addr: {e}"))
        })?;

        info!("relay listening on http://{addr}");

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                tracing::error!("relay server error: {e}");
            }
        });

        Ok(Self {
            addr,
            cancel,
            handle,
        })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and let in-flight requests finish.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the server task to end.
    pub async fn join(&mut self) {
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                tracing::error!("relay server task failed: {e}");
            }
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn bad_request(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            message: message.into(),
            error_type: "invalid_request_error".to_owned(),
        },
    };
    (status, Json(body)).into_response()
}

/// `POST /llm/query`
async fn handle_query(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => return bad_request(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let mut upload: Option<(String, bytes::Bytes)> = None;
    let mut voice_id: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(e.status(), e.body_text()),
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_owned();
                match field.bytes().await {
                    Ok(data) => upload = Some((name, data)),
                    Err(e) => return bad_request(e.status(), e.body_text()),
                }
            }
            Some("voiceId") => match field.text().await {
                Ok(text) => voice_id = Some(text),
                Err(e) => return bad_request(e.status(), e.body_text()),
            },
            _ => {}
        }
    }

    let Some((file_name, data)) = upload else {
        return bad_request(StatusCode::BAD_REQUEST, "missing multipart field `file`");
    };
    let voice_id = voice_id
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.default_voice_id.clone());

    let result: TurnResult = match state.media.save_upload(&file_name, &data).await {
        Ok(path) => {
            info!(path = %path.display(), bytes = data.len(), %voice_id, "upload saved");
            state.orchestrator.run_turn(&data, &voice_id).await
        }
        Err(e) => {
            warn!("upload could not be saved: {e}");
            state.orchestrator.degraded_turn(REQUEST_FAILED_MARKER).await
        }
    };

    Json(result).into_response()
}

/// `GET /health`
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        turns: state.orchestrator.history().len(),
    })
}
