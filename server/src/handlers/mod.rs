//! Request handlers for the post collection.

mod posts;

pub use posts::*;
