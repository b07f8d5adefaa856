//! Router assembly.

mod health;
mod posts;

use crate::AppState;
use axum::Router;

/// Health and post routes, still expecting [`AppState`].
pub fn create_routes() -> Router<AppState> {
    Router::new().merge(posts::routes()).merge(health::routes())
}
