//! Represents a published snippet and the candidate submitted for publishing.

use super::snippet_id::SnippetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Title stored when the publisher gives none.
pub const DEFAULT_TITLE: &str = "Untitled Snippet";

/// Language stored when the publisher gives none.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// A stored snippet, exactly as written by the store.
///
/// Rows are immutable: the store exposes no update or delete path.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Snippet {
    /// Primary key; also the last segment of the shareable link.
    pub id: SnippetId,

    /// Human-readable title.
    pub title: String,

    /// Full artifact body. Opaque to the service and returned byte-for-byte.
    pub code: String,

    /// How `code` should be interpreted (`html`, `python`, `plaintext`, ...).
    pub language: String,

    /// Set by the store on insert.
    pub created_at: DateTime<Utc>,
}

/// A validated snippet waiting to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSnippet {
    pub id: SnippetId,
    pub title: String,
    pub code: String,
    pub language: String,
}

impl NewSnippet {
    /// Build a candidate, substituting the defaults for a missing or blank
    /// `title` or `language`. Non-blank values are kept verbatim.
    pub fn new(
        id: SnippetId,
        title: Option<String>,
        code: String,
        language: Option<String>,
    ) -> Self {
        Self {
            id,
            title: non_blank(title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            code,
            language: non_blank(language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
