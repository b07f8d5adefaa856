//! Post collection routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::handlers::{handle_create, handle_get, handle_list, ListQuery};
use crate::store::{NewPost, Post};
use crate::AppState;

/// Create post routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_handler).post(create_handler))
        .route("/posts/{id}", get(get_handler))
}

/// GET /posts - First page of the collection.
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Post>> {
    Json(handle_list(&state.posts, query))
}

/// GET /posts/{id} - A single post.
async fn get_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Post>> {
    Ok(Json(handle_get(&state.posts, id)?))
}

/// POST /posts - Assign an id to a new post.
async fn create_handler(
    State(state): State<AppState>,
    Json(new): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = handle_create(&state.posts, new)?;
    Ok((StatusCode::CREATED, Json(post)))
}
