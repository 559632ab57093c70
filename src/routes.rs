//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health`     - Health check: DB, cache, job queue, geo (public)
//! - `/passport/*`      - Login, captcha, logout
//! - `/values/*`        - Variable administration (admin session required)
//! - `/static/*`        - Static assets
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Sessions** - Cookie session backed by the configured store
//! - **Firewall** - Denied addresses and deny areas get 403
//! - **Rate limiting** - Per-IP token bucket
//! - **Path normalization** - Trailing slash handling

use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_sessions::SessionStore;

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::session::create_session_layer;
use crate::api::middleware::{firewall, rate_limit, tracing};
use crate::state::AppState;

/// Application routes without rate limiting.
///
/// Used directly by integration tests, where requests carry no peer address.
pub fn router<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    compose(state, store, false)
}

/// Production router: rate limits every route group and trims trailing slashes.
pub fn app_router<S>(state: AppState, store: S) -> NormalizePath<Router>
where
    S: SessionStore + Clone,
{
    NormalizePathLayer::trim_trailing_slash().layer(compose(state, store, true))
}

fn compose<S>(state: AppState, store: S, rate_limited: bool) -> Router
where
    S: SessionStore + Clone,
{
    let behind_proxy = state.behind_proxy;

    let mut passport = api::routes::passport_routes(state.clone());
    let mut values = api::routes::variable_routes(state.clone());
    let mut public = Router::new().route("/health", get(health_handler));

    if rate_limited {
        passport = passport.layer(rate_limit::secure_layer(behind_proxy));
        values = values.layer(rate_limit::secure_layer(behind_proxy));
        public = public.layer(rate_limit::layer(behind_proxy));
    }

    Router::new()
        .nest("/passport", passport)
        .nest("/values", values)
        .merge(public)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn_with_state(state.clone(), firewall::layer))
        .layer(create_session_layer(store, state.secure_cookies))
        .with_state(state)
        .layer(tracing::layer())
}
