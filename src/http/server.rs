//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the API and UI routes
//! - Wire up middleware (request ID, tracing, timeout, headers, entrance gate)
//! - Bind server to listener and stop on the shutdown broadcast

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{Html, IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_api_router;
use crate::cache::{ConfigCache, ConfigReloader};
use crate::http::request::make_request_span;
use crate::http::response::ApiError;
use crate::security::{entrance_middleware, security_headers_middleware, EntranceGate};
use crate::session::SessionManager;
use crate::settings::SettingsService;

const PLACEHOLDER_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Panel</title></head>
<body>
    <h1>Panel</h1>
    <p>The panel UI is not installed. Set <code>ui.dir</code> in panel.toml to serve it.</p>
</body>
</html>
"#;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ConfigCache>,
    pub settings: SettingsService,
    pub sessions: Arc<SessionManager>,
    pub reloader: Arc<ConfigReloader>,
    pub gate: Arc<EntranceGate>,
    pub ui_dir: Option<PathBuf>,
}

/// HTTP server for the panel.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(state, request_timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers run outermost-last: the request ID is set before the trace span
    /// opens, and the security headers also cover responses produced by the
    /// entrance gate.
    #[allow(deprecated)]
    pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
        let gate = state.gate.clone();

        Router::new()
            .nest("/api/v1", setup_api_router(state.clone()))
            .fallback(ui_fallback)
            .with_state(state)
            .layer(middleware::from_fn_with_state(gate, entrance_middleware))
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until the shutdown broadcast fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Unknown API paths get a JSON 404; everything else is the panel UI.
async fn ui_fallback(State(state): State<AppState>, request: Request<Body>) -> Response {
    if is_api_path(request.uri().path()) {
        return ApiError::not_found("API endpoint not found").into_response();
    }

    let Some(dir) = state.ui_dir else {
        return Html(PLACEHOLDER_PAGE).into_response();
    };

    // Client-side routes resolve to index.html.
    let files = ServeDir::new(&dir).fallback(ServeFile::new(dir.join("index.html")));
    match files.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
