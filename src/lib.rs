//! Snippet store: publish code/markup artifacts under short ids and serve
//! them back, with executable markup rendered only inside a sandbox.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;
pub mod state;
