//! # Result Enricher
//!
//! Resolves the author reference on each post returned by a search.
//!
//! One lookup per post, all in flight at once. Output order follows input
//! order, and a single miss fails the whole batch.

use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::error::{AppError, AppResult};
use crate::model::{EnrichedPost, Post};
use crate::store::UserStore;

pub const AUTHOR_NOT_FOUND: &str =
    "User info for one of the authors of the list of posts could not be found";

/// Replaces author references with `{username, _id}`
#[derive(Clone)]
pub struct ResultEnricher {
    users: Arc<dyn UserStore>,
}

impl ResultEnricher {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn enrich(&self, posts: Vec<Post>) -> AppResult<Vec<EnrichedPost>> {
        try_join_all(posts.into_iter().map(|post| self.enrich_one(post))).await
    }

    async fn enrich_one(&self, post: Post) -> AppResult<EnrichedPost> {
        let author = self
            .users
            .find_user(&post.author)
            .await?
            .ok_or_else(|| AppError::NotFound(AUTHOR_NOT_FOUND.to_string()))?;

        Ok(EnrichedPost::from_post(post, author.username))
    }
}
