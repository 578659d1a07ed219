//! Shared router state.

use crate::{
    models::snippet_id::SnippetId, render::sandbox::SandboxPolicy,
    services::snippet_store::SnippetStore,
};
use std::sync::Arc;

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: SnippetStore,
    /// Shareable link prefix without slashes, e.g. `p`.
    pub link_prefix: Arc<str>,
    pub sandbox: Arc<SandboxPolicy>,
}

impl AppState {
    pub fn new(store: SnippetStore, link_prefix: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            link_prefix: link_prefix.into(),
            sandbox: Arc::new(SandboxPolicy::strict()),
        }
    }

    /// Canonical shareable path for a snippet, e.g. `/p/abc123`.
    pub fn link_for(&self, id: &SnippetId) -> String {
        format!("/{}/{}", self.link_prefix, id)
    }
}
