//! Core data models for the snippet service.
//!
//! `Snippet` maps onto the `snippets` table via `sqlx::FromRow` and
//! serializes as the JSON record returned by the retrieval endpoint.

pub mod snippet;
pub mod snippet_id;
