pub mod health_handlers;
pub mod snippet_handlers;
