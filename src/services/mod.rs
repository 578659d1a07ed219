pub mod publisher;
pub mod snippet_store;
