//! QuoteSync Remote - stand-in for the remote post collection.
//!
//! Serves a seeded, read-only page of posts and accepts creates the way a
//! public placeholder API does: the new post gets an id and is echoed back,
//! but never shows up in later listings. Used for local development and as
//! the HTTP peer in the engine's integration tests.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod store;

use crate::config::Config;
use crate::store::PostStore;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostStore>,
}

impl AppState {
    /// State seeded according to `config`.
    pub fn new(config: &Config) -> Self {
        Self::with_store(PostStore::seeded(config.seed_count))
    }

    /// State serving an explicit collection.
    pub fn with_store(posts: PostStore) -> Self {
        Self {
            posts: Arc::new(posts),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
