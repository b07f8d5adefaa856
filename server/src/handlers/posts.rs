//! Post handlers - list, fetch and create.

use crate::error::{AppError, Result};
use crate::store::{NewPost, Post, PostStore};
use serde::Deserialize;

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Maximum number of posts to return
    #[serde(alias = "_limit")]
    pub limit: Option<usize>,
}

/// Return the first page of the collection.
pub fn handle_list(store: &PostStore, query: ListQuery) -> Vec<Post> {
    let page = store.page(query.limit).to_vec();
    tracing::debug!(limit = ?query.limit, returned = page.len(), "listed posts");
    page
}

/// Return a single post.
pub fn handle_get(store: &PostStore, id: u64) -> Result<Post> {
    store
        .get(id)
        .cloned()
        .ok_or(AppError::PostNotFound(id))
}

/// Accept a new post and assign it an id.
pub fn handle_create(store: &PostStore, new: NewPost) -> Result<Post> {
    if new.title.trim().is_empty() {
        return Err(AppError::InvalidPost("title is required".to_string()));
    }

    let post = store.create(new).ok_or(AppError::IdsExhausted)?;
    tracing::info!(id = post.id, user_id = post.user_id, "created post");
    Ok(post)
}
