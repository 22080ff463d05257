//! Panel management API, mounted under `/api/v1`.
//!
//! `/health` and `/auth/login` are public; every other route runs behind
//! [`auth::require_session`].

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::require_session;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_api_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/config", get(get_config).post(update_config))
        .route("/config/initialized", get(config_initialized))
        .route("/config/reload", post(reload_config))
        .route(
            "/settings",
            get(list_settings).post(create_setting).put(update_setting),
        )
        .route("/settings/{key}", get(get_setting).delete(delete_setting))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .merge(protected)
}
