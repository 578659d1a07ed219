//! Publishing: turn a client submission into exactly one stored snippet.

use crate::{
    models::{
        snippet::{NewSnippet, Snippet},
        snippet_id::{SnippetId, SnippetIdError},
    },
    services::snippet_store::{SnippetStore, StoreError},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

/// Total insert attempts for a server-generated id before giving up.
const GENERATED_ID_ATTEMPTS: usize = 3;

/// Body of `POST /api/publish`. Every field is optional on the wire so a
/// missing `code` is reported as a validation failure, not a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("missing required fields")]
    MissingFields,
    #[error("invalid snippet id: {0}")]
    InvalidId(#[from] SnippetIdError),
    #[error("snippet `{0}` already exists")]
    Conflict(SnippetId),
    #[error("could not store snippet: {0}")]
    Storage(StoreError),
}

/// Validate `req` and insert it.
///
/// A caller-supplied id is used verbatim; if it is taken the caller gets
/// [`PublishError::Conflict`] and decides what to do. A generated id that
/// collides is silently replaced with a new one.
pub async fn publish(store: &SnippetStore, req: PublishRequest) -> Result<Snippet, PublishError> {
    publish_with(store, req, SnippetId::generate).await
}

/// [`publish`] with the source of generated ids supplied by the caller.
///
/// Running out of attempts on generated ids is a server-side failure and
/// comes back as [`PublishError::Storage`], never as a conflict.
pub async fn publish_with<F>(
    store: &SnippetStore,
    req: PublishRequest,
    mut next_id: F,
) -> Result<Snippet, PublishError>
where
    F: FnMut() -> SnippetId,
{
    let code = match req.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(PublishError::MissingFields),
    };

    let supplied = match req.id.filter(|id| !id.is_empty()) {
        Some(raw) => Some(SnippetId::parse(raw)?),
        None => None,
    };

    match supplied {
        Some(id) => {
            let candidate = NewSnippet::new(id, req.title, code, req.language);
            match store.insert(&candidate).await {
                Ok(stored) => {
                    info!(id = %stored.id, language = %stored.language, "published snippet");
                    Ok(stored)
                }
                Err(StoreError::DuplicateKey(id)) => {
                    warn!(id = %id, "publish rejected: id already taken");
                    Err(PublishError::Conflict(id))
                }
                Err(err) => Err(PublishError::Storage(err)),
            }
        }
        None => {
            let mut candidate =
                NewSnippet::new(next_id(), req.title, code, req.language);
            let mut attempt = 1;
            loop {
                match store.insert(&candidate).await {
                    Ok(stored) => {
                        info!(id = %stored.id, language = %stored.language, "published snippet");
                        return Ok(stored);
                    }
                    Err(StoreError::DuplicateKey(id)) if attempt < GENERATED_ID_ATTEMPTS => {
                        warn!(id = %id, attempt, "generated id collided, regenerating");
                        candidate.id = next_id();
                        attempt += 1;
                    }
                    Err(err @ StoreError::DuplicateKey(_)) => {
                        error!(attempts = attempt, "no free generated id");
                        return Err(PublishError::Storage(err));
                    }
                    Err(err) => return Err(PublishError::Storage(err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::snippet::{DEFAULT_LANGUAGE, DEFAULT_TITLE},
        services::snippet_store::StoreOptions,
    };
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> SnippetStore {
        let url = format!("sqlite://{}", dir.path().join("publish.db").display());
        let store = SnippetStore::open(&StoreOptions::new(url)).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    async fn row_count(store: &SnippetStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM snippets")
            .fetch_one(&*store.db)
            .await
            .unwrap()
    }

    fn request(id: Option<&str>, code: Option<&str>) -> PublishRequest {
        PublishRequest {
            id: id.map(str::to_string),
            code: code.map(str::to_string),
            ..PublishRequest::default()
        }
    }

    #[tokio::test]
    async fn publish_round_trips_every_submitted_field() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let req = PublishRequest {
            id: Some("cube".into()),
            title: Some("Spinning Cube".into()),
            code: Some("<canvas id=c></canvas>\n<script>/* ... */</script>".into()),
            language: Some("html".into()),
        };
        let stored = publish(&store, req).await.unwrap();
        let fetched = store.get_by_id(&stored.id).await.unwrap().unwrap();

        assert_eq!(fetched.id.as_str(), "cube");
        assert_eq!(fetched.title, "Spinning Cube");
        assert_eq!(fetched.code, "<canvas id=c></canvas>\n<script>/* ... */</script>");
        assert_eq!(fetched.language, "html");
    }

    #[tokio::test]
    async fn missing_or_empty_code_is_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        for req in [request(Some("a1"), None), request(Some("a2"), Some(""))] {
            let err = publish(&store, req).await.unwrap_err();
            assert!(matches!(err, PublishError::MissingFields));
        }
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn invalid_caller_id_is_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let err = publish(&store, request(Some("../../etc"), Some("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidId(_)));
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn absent_or_empty_id_gets_a_generated_one() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let a = publish(&store, request(None, Some("one"))).await.unwrap();
        let b = publish(&store, request(Some(""), Some("two"))).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, DEFAULT_TITLE);
        assert_eq!(a.language, DEFAULT_LANGUAGE);
        assert_eq!(row_count(&store).await, 2);
    }

    #[tokio::test]
    async fn republishing_a_caller_id_conflicts_and_keeps_the_original() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        publish(&store, request(Some("same"), Some("original")))
            .await
            .unwrap();
        let err = publish(&store, request(Some("same"), Some("replacement")))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Conflict(ref id) if id.as_str() == "same"));

        let stored = store
            .get_by_id(&SnippetId::parse("same").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.code, "original");
    }

    #[tokio::test]
    async fn concurrent_publishes_of_one_id_produce_one_conflict() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let (a, b) = tokio::join!(
            publish(&store, request(Some("race"), Some("code-a"))),
            publish(&store, request(Some("race"), Some("code-b"))),
        );
        let ok = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(PublishError::Conflict(_))))
            .count();
        assert_eq!((ok, conflicts), (1, 1));
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn colliding_generated_id_is_replaced() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        publish(&store, request(Some("taken"), Some("first")))
            .await
            .unwrap();

        let mut ids = vec![
            SnippetId::parse("fresh").unwrap(),
            SnippetId::parse("taken").unwrap(),
        ];
        let stored = publish_with(&store, request(None, Some("second")), || {
            ids.pop().unwrap()
        })
        .await
        .unwrap();

        assert_eq!(stored.id.as_str(), "fresh");
        assert_eq!(row_count(&store).await, 2);
        let original = store
            .get_by_id(&SnippetId::parse("taken").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(original.code, "first");
    }

    #[tokio::test]
    async fn exhausted_generated_ids_are_a_storage_failure() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        publish(&store, request(Some("taken"), Some("first")))
            .await
            .unwrap();

        let mut calls = 0;
        let err = publish_with(&store, request(None, Some("second")), || {
            calls += 1;
            SnippetId::parse("taken").unwrap()
        })
        .await
        .unwrap_err();

        assert_eq!(calls, GENERATED_ID_ATTEMPTS);
        assert!(matches!(
            err,
            PublishError::Storage(StoreError::DuplicateKey(_))
        ));
        assert_eq!(
            crate::errors::AppError::from(err).status,
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn storage_failure_is_reported_as_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.close().await;

        let err = publish(&store, request(Some("late"), Some("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Storage(StoreError::Unavailable(_))));
    }
}
