//! # Feed
//!
//! Local post list with optimistic mutations.
//!
//! A mutation snapshots the list (`begin`), applies its change locally, calls
//! the API, then either keeps the change (`confirm`) or restores the snapshot
//! (`rollback`) and hands the error back to the caller.

use tracing::warn;

use super::api::{ClientError, ClientResult, QuoteApi};
use crate::model::{
    AuthorInfo, EnrichedPost, LoginRequest, NewPost, PostEditRequest, RegisterRequest,
    SessionUser, Source,
};
use crate::search::PostsQuery;

/// Snapshot taken before a speculative change
#[must_use = "a pending change must be confirmed or rolled back"]
#[derive(Debug)]
pub struct PendingChange {
    snapshot: Vec<EnrichedPost>,
}

#[derive(Debug, Clone, Default)]
pub struct Feed {
    posts: Vec<EnrichedPost>,
    user: Option<SessionUser>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<EnrichedPost>) -> Self {
        Self { posts, user: None }
    }

    pub fn posts(&self) -> &[EnrichedPost] {
        &self.posts
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Option<SessionUser>) {
        self.user = user;
    }

    pub fn post(&self, id: &str) -> Option<&EnrichedPost> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn begin(&self) -> PendingChange {
        PendingChange {
            snapshot: self.posts.clone(),
        }
    }

    /// Keep the current state
    pub fn confirm(&mut self, pending: PendingChange) {
        drop(pending);
    }

    /// Restore the state captured by `begin`
    pub fn rollback(&mut self, pending: PendingChange) {
        self.posts = pending.snapshot;
    }

    /// Replace the list with a fresh search result
    pub async fn refresh<A>(&mut self, api: &A, query: &PostsQuery) -> ClientResult<()>
    where
        A: QuoteApi + ?Sized,
    {
        self.posts = api.list_posts(query).await?;
        Ok(())
    }

    /// Create a post and append the server's copy. Not optimistic: the
    /// post has no id until the server assigns one.
    pub async fn publish<A>(
        &mut self,
        api: &A,
        quote: &str,
        source: Source,
    ) -> ClientResult<&EnrichedPost>
    where
        A: QuoteApi + ?Sized,
    {
        let user = self.user.as_ref().ok_or(ClientError::NotSignedIn)?;
        let body = NewPost {
            quote: Some(quote.to_string()),
            author: Some(AuthorInfo {
                username: user.username.clone(),
                id: user.uid.clone(),
            }),
            source: Some(source),
        };

        let created = api.create_post(&body).await?;
        self.posts.push(created);
        Ok(&self.posts[self.posts.len() - 1])
    }

    /// Like the post if the signed-in user has not, unlike it otherwise.
    /// Returns whether the post is now liked.
    pub async fn toggle_like<A>(&mut self, api: &A, id: &str) -> ClientResult<bool>
    where
        A: QuoteApi + ?Sized,
    {
        let uid = self.user.as_ref().ok_or(ClientError::NotSignedIn)?.uid.clone();
        let was_liked = self
            .post(id)
            .ok_or_else(|| ClientError::UnknownPost(id.to_string()))?
            .is_liked_by(&uid);

        let pending = self.begin();
        if let Some(post) = self.post_mut(id) {
            if was_liked {
                post.likes.retain(|l| l != &uid);
            } else {
                post.likes.push(uid.clone());
            }
        }

        let result = if was_liked {
            api.unlike(id, &uid).await
        } else {
            api.like(id, &uid).await
        };
        self.settle(pending, result)?;
        Ok(!was_liked)
    }

    pub async fn edit<A>(&mut self, api: &A, id: &str, edit: PostEditRequest) -> ClientResult<()>
    where
        A: QuoteApi + ?Sized,
    {
        let pending = self.begin();
        let post = self
            .post_mut(id)
            .ok_or_else(|| ClientError::UnknownPost(id.to_string()))?;
        if let Some(quote) = &edit.quote {
            post.quote = quote.clone();
        }
        if let Some(text) = &edit.source_author {
            post.source.text = text.clone();
        }
        if let Some(link) = &edit.source_link {
            post.source.link = link.clone();
        }

        let result = api.update_post(id, &edit).await;
        self.settle(pending, result)
    }

    pub async fn remove<A>(&mut self, api: &A, id: &str) -> ClientResult<()>
    where
        A: QuoteApi + ?Sized,
    {
        if self.post(id).is_none() {
            return Err(ClientError::UnknownPost(id.to_string()));
        }

        let pending = self.begin();
        self.posts.retain(|p| p.id != id);

        let result = api.delete_post(id).await;
        self.settle(pending, result)
    }

    pub async fn login<A>(&mut self, api: &A, req: &LoginRequest) -> ClientResult<&SessionUser>
    where
        A: QuoteApi + ?Sized,
    {
        let user = api.login(req).await?;
        Ok(&*self.user.insert(user))
    }

    pub async fn register<A>(&mut self, api: &A, req: &RegisterRequest) -> ClientResult<&SessionUser>
    where
        A: QuoteApi + ?Sized,
    {
        let user = api.register(req).await?;
        Ok(&*self.user.insert(user))
    }

    /// Pick up an existing session, if the server still has one
    pub async fn restore_session<A>(&mut self, api: &A) -> ClientResult<Option<&SessionUser>>
    where
        A: QuoteApi + ?Sized,
    {
        match api.session().await {
            Ok(user) => Ok(Some(&*self.user.insert(user))),
            Err(ClientError::Api { status, .. }) if status.as_u16() == 401 => {
                self.user = None;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn logout<A>(&mut self, api: &A) -> ClientResult<()>
    where
        A: QuoteApi + ?Sized,
    {
        api.logout().await?;
        self.user = None;
        Ok(())
    }

    fn post_mut(&mut self, id: &str) -> Option<&mut EnrichedPost> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    fn settle(&mut self, pending: PendingChange, result: ClientResult<()>) -> ClientResult<()> {
        match result {
            Ok(()) => {
                self.confirm(pending);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "server rejected change, rolling back");
                self.rollback(pending);
                Err(e)
            }
        }
    }
}
