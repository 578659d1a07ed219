//! Defines routes for the snippet API and shareable pages.
//!
//! ## Structure
//! - **JSON API**
//!   - `POST /api/publish`      — publish a snippet
//!   - `GET  /api/snippet/{id}` — fetch the stored record
//!
//! - **Shareable links** (prefix configurable, `p` by default)
//!   - `GET  /{prefix}/{id}`     — host page (`?view=run|code`)
//!   - `GET  /{prefix}/{id}/raw` — stored bytes under a sandbox CSP
//!
//! - **Health**: `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        snippet_handlers::{get_snippet, publish_snippet, raw_snippet, view_snippet},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// Shareable links are mounted under `/{link_prefix}`. The returned router
/// already carries `state`.
pub fn routes(state: AppState, max_body_bytes: usize) -> Router {
    let links = Router::new()
        .route("/{id}", get(view_snippet))
        .route("/{id}/raw", get(raw_snippet));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/publish", post(publish_snippet))
        .route("/api/snippet/{id}", get(get_snippet))
        .nest(&format!("/{}", state.link_prefix), links)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
