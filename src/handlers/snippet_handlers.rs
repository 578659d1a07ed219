//! HTTP handlers for publishing, fetching and viewing snippets.
//! Storage concerns are delegated to `SnippetStore`, validation to the
//! publisher, and HTML generation to `render`.

use crate::{
    errors::{AppError, SNIPPET_NOT_FOUND},
    models::{snippet::Snippet, snippet_id::SnippetId},
    render::{
        page::{HOST_PAGE_CSP, ViewMode, render_not_found_page, render_snippet_page},
        sandbox::{SandboxPolicy, is_executable},
    },
    services::publisher::{self, PublishRequest},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Response body of a successful publish.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    pub url: String,
}

/// Query accepted by the shareable page.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub view: Option<ViewMode>,
}

/// `POST /api/publish` — validate and store a snippet, return its link.
pub async fn publish_snippet(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>, AppError> {
    let Json(req) = payload?;
    let stored = publisher::publish(&state.store, req).await?;
    Ok(Json(PublishResponse {
        success: true,
        url: state.link_for(&stored.id),
    }))
}

/// `GET /api/snippet/{id}` — the stored record, verbatim.
pub async fn get_snippet(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Snippet>, AppError> {
    match lookup(&state, &raw_id).await? {
        Some(snippet) => Ok(Json(snippet)),
        None => Err(AppError::not_found(SNIPPET_NOT_FOUND)),
    }
}

/// `GET /{prefix}/{id}` — host page that runs or shows the snippet.
///
/// An unrecognised `view` is ignored and the default view for the snippet
/// is used.
pub async fn view_snippet(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let requested = match query {
        Ok(Query(q)) => q.view,
        Err(rejection) => {
            debug!(error = %rejection, "ignoring malformed view query");
            None
        }
    };

    let Some(snippet) = lookup(&state, &raw_id).await? else {
        return Ok(html_response(StatusCode::NOT_FOUND, render_not_found_page()));
    };

    let executable = is_executable(&snippet.language, &snippet.code);
    let view = ViewMode::resolve(requested, executable);
    let page = render_snippet_page(
        &snippet,
        &state.link_for(&snippet.id),
        view,
        executable,
        &state.sandbox,
    );
    Ok(html_response(StatusCode::OK, page))
}

/// `GET /{prefix}/{id}/raw` — the exact stored bytes.
///
/// Executable markup is served as a sandboxed HTML document (CSP `sandbox`
/// gives it an opaque origin even when opened directly); everything else is
/// plain text.
pub async fn raw_snippet(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(snippet) = lookup(&state, &raw_id).await? else {
        return Err(AppError::not_found(SNIPPET_NOT_FOUND));
    };

    let mut response = Response::new(Body::from(snippet.code.clone()));
    let headers = response.headers_mut();
    set_isolation_headers(headers);
    if is_executable(&snippet.language, &snippet.code) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        headers.insert(header::CONTENT_SECURITY_POLICY, sandbox_csp(&state.sandbox));
    } else {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("sandbox; default-src 'none'"),
        );
    }
    Ok(response)
}

/// Resolve a path id to a stored snippet. Ids outside the format policy can
/// never have been stored, so they short-circuit to `None`.
async fn lookup(state: &AppState, raw_id: &str) -> Result<Option<Snippet>, AppError> {
    let Ok(id) = SnippetId::parse(raw_id) else {
        debug!(id = raw_id, "rejected malformed snippet id");
        return Ok(None);
    };
    let found = state.store.get_by_id(&id).await?;
    if found.is_none() {
        debug!(id = %id, "snippet not found");
    }
    Ok(found)
}

/// CSP header for a sandboxed document. Falls back to a bare `sandbox`
/// (deny everything) if the policy cannot be encoded as a header value.
fn sandbox_csp(policy: &SandboxPolicy) -> HeaderValue {
    HeaderValue::from_str(&policy.csp_directive())
        .unwrap_or_else(|_| HeaderValue::from_static("sandbox"))
}

fn html_response(status: StatusCode, page: String) -> Response {
    let mut response = (status, page).into_response();
    let headers = response.headers_mut();
    set_isolation_headers(headers);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(HOST_PAGE_CSP),
    );
    response
}

fn set_isolation_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
}
