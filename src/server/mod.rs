use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::EngineConfig;
use crate::engine::Engine;

pub mod api;
pub mod jobs;
pub mod routes;

use jobs::JobStore;
use routes::HttpResponse;

/// Shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub jobs: JobStore,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
            jobs: JobStore::new(),
        }
    }
}

/// API routes, with static front-end files from `static_dir` for every other
/// path.
pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/api/*path", any(api_handler))
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .with_state(state)
}

async fn api_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|path_and_query| path_and_query.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let method = method.as_str().to_string();
    let queue = state.engine.queue().clone();
    let pending = queue.submit(move || routes::route_request(&state, &method, &path, &body));
    match pending.await {
        Ok(response) => into_axum_response(response),
        Err(err) => {
            into_axum_response(routes::error_response(500, "Internal Server Error", &err.to_string()))
        }
    }
}

fn into_axum_response(response: HttpResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        Body::from(response.body),
    )
        .into_response()
}

pub async fn serve(config: EngineConfig) -> std::io::Result<()> {
    let bind = config.bind.clone();
    let static_dir = config.static_dir.clone();
    let state = AppState::new(Engine::new(config));
    let app = router(state, &static_dir);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(target: "starforce::server", %bind, %static_dir, "starforce server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(target: "starforce::server", "shutting down"),
        Err(err) => {
            tracing::warn!(target: "starforce::server", error = %err, "no shutdown signal handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Blocking entry point for the CLI.
pub fn run_server(config: EngineConfig) -> std::io::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(config))
}
