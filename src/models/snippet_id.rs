//! Short, URL-safe identifiers naming published snippets.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

/// Longest identifier a caller may supply.
pub const MAX_ID_LEN: usize = 64;

/// Number of random bytes behind a generated identifier (16 base64 chars).
const GENERATED_ID_BYTES: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnippetIdError {
    #[error("snippet id is empty")]
    Empty,
    #[error("snippet id exceeds {MAX_ID_LEN} characters")]
    TooLong,
    #[error("snippet id contains `{0}`; allowed characters are A-Z, a-z, 0-9, `-` and `_`")]
    InvalidChar(char),
}

/// Identifier of a stored snippet.
///
/// Always 1–64 characters from the URL-safe alphabet `[A-Za-z0-9_-]`, so it
/// can be used verbatim as a path segment and as the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct SnippetId(String);

impl SnippetId {
    /// Generate a fresh identifier.
    ///
    /// The token is built only from the random bits of a v4 UUID; it carries
    /// nothing about the snippet, its author or the time of publishing.
    pub fn generate() -> Self {
        let bytes = *Uuid::new_v4().as_bytes();
        // Bytes 6 and 8 hold the version and variant bits.
        let mut random = [0u8; GENERATED_ID_BYTES];
        random[..6].copy_from_slice(&bytes[..6]);
        random[6..].copy_from_slice(&bytes[10..]);
        Self(general_purpose::URL_SAFE_NO_PAD.encode(random))
    }

    /// Validate a caller-supplied identifier against the format policy.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SnippetIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(SnippetIdError::Empty);
        }
        if raw.len() > MAX_ID_LEN {
            return Err(SnippetIdError::TooLong);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
        {
            return Err(SnippetIdError::InvalidChar(bad));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SnippetId {
    type Err = SnippetIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SnippetId {
    type Error = SnippetIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SnippetId> for String {
    fn from(id: SnippetId) -> Self {
        id.0
    }
}
