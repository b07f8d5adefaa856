//! In-memory post collection.
//!
//! Mirrors the behaviour of a public placeholder API: the seeded page never
//! changes, and created posts get a fresh id but are not stored.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Posts per seeded author.
const POSTS_PER_USER: u64 = 10;

const WORDS: &[&str] = &[
    "sunt", "aut", "facere", "repellat", "provident", "occaecati", "excepturi", "optio",
    "reprehenderit", "qui", "est", "esse", "ea", "molestias", "quasi", "exercitationem",
    "nesciunt", "dolorem", "eum", "magnam", "quis", "vero", "ullam", "et",
];

/// A post as served by the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// Body of a create request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_user_id")]
    pub user_id: u64,
}

fn default_user_id() -> u64 {
    1
}

/// Seeded, read-only collection plus an id counter for creates.
#[derive(Debug)]
pub struct PostStore {
    posts: Vec<Post>,
    next_id: AtomicU64,
}

impl PostStore {
    /// Build a collection of `count` deterministic posts.
    pub fn seeded(count: u64) -> Self {
        let posts = (1..=count).map(seed_post).collect();
        Self {
            posts,
            next_id: AtomicU64::new(count + 1),
        }
    }

    /// Build a collection from explicit posts.
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let next = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Self {
            posts,
            next_id: AtomicU64::new(next),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The first `limit` posts, or all of them.
    pub fn page(&self, limit: Option<usize>) -> &[Post] {
        let end = limit.map_or(self.posts.len(), |l| l.min(self.posts.len()));
        &self.posts[..end]
    }

    pub fn get(&self, id: u64) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Assign an id to a new post. The post itself is not kept.
    pub fn create(&self, new: NewPost) -> Option<Post> {
        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .ok()?;

        Some(Post {
            user_id: new.user_id,
            id,
            title: new.title,
            body: new.body,
        })
    }
}

fn seed_post(id: u64) -> Post {
    let word = |offset: u64| WORDS[((id * 7 + offset * 5) % WORDS.len() as u64) as usize];
    let title = (0..4).map(word).collect::<Vec<_>>().join(" ");
    let body = (4..12).map(word).collect::<Vec<_>>().join(" ");

    Post {
        user_id: (id - 1) / POSTS_PER_USER + 1,
        id,
        title,
        body,
    }
}
