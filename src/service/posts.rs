//! Post operations: list, create, edit, delete, like, unlike.
//!
//! Mutations check, in order: authentication, existence, ownership.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::info;

use super::{parse_object_id, required};
use crate::auth::RequestContext;
use crate::enrich::ResultEnricher;
use crate::error::{AppError, AppResult};
use crate::model::{EnrichedPost, NewPost, Post, PostEdit, SessionUser, Source};
use crate::search::{Pipeline, QueryBuilder, SearchRequest};
use crate::store::{LikeOutcome, PostStore, UserStore};

const ALREADY_LIKED: &str = "User has already liked the specified post";
const NOT_LIKED: &str = "User has not liked the specified post";

pub struct PostService {
    posts: Arc<dyn PostStore>,
    builder: QueryBuilder,
    enricher: ResultEnricher,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, users: Arc<dyn UserStore>, builder: QueryBuilder) -> Self {
        Self {
            posts,
            builder,
            enricher: ResultEnricher::new(users),
        }
    }

    /// The stage sequence `list` would run
    pub fn explain(&self, request: &SearchRequest) -> Pipeline {
        self.builder.build(request)
    }

    pub async fn list(&self, request: &SearchRequest) -> AppResult<Vec<EnrichedPost>> {
        let pipeline = self.builder.build(request);
        let posts = self.posts.aggregate(&pipeline).await?;
        self.enricher.enrich(posts).await
    }

    pub async fn create(&self, ctx: &RequestContext, body: NewPost) -> AppResult<EnrichedPost> {
        let user = ctx.require_user()?;
        if let Some(claimed) = &body.author {
            if claimed.id != user.uid {
                return Err(AppError::Forbidden);
            }
        }

        let quote = required(body.quote.as_deref(), "quote")?.to_string();
        let source = body
            .source
            .ok_or_else(|| AppError::Validation("Missing required field: source".to_string()))?;
        let source = Source {
            text: required(Some(source.text.as_str()), "source.text")?.to_string(),
            link: source.link,
        };

        let post = Post::new(session_object_id(user)?, quote, source);
        self.posts.insert_post(&post).await?;

        info!(
            request_id = %ctx.request_id,
            post_id = %post.id,
            author = %user.username,
            "post created"
        );
        Ok(EnrichedPost::from_post(post, user.username.clone()))
    }

    pub async fn update(&self, ctx: &RequestContext, id: &str, edit: PostEdit) -> AppResult<()> {
        let user = ctx.require_user()?;
        let id = parse_object_id(id)?;
        self.owned_post(user, &id, "Post to be updated could not be found")
            .await?;

        if edit.is_empty() {
            return Err(AppError::Validation(
                "At least one of quote, sourceAuthor, sourceLink is required".to_string(),
            ));
        }
        if !self.posts.update_post(&id, &edit).await? {
            return Err(AppError::NotFound(
                "Post to be updated could not be found".to_string(),
            ));
        }

        info!(request_id = %ctx.request_id, post_id = %id, "post updated");
        Ok(())
    }

    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        let user = ctx.require_user()?;
        let id = parse_object_id(id)?;
        self.owned_post(user, &id, "Post to be deleted could not be found")
            .await?;

        if !self.posts.delete_post(&id).await? {
            return Err(AppError::NotFound(
                "Post to be deleted could not be found".to_string(),
            ));
        }

        info!(request_id = %ctx.request_id, post_id = %id, "post deleted");
        Ok(())
    }

    /// Add the session user to the post's likes.
    ///
    /// `claimed_uid`, when sent, must name the session user.
    pub async fn like(&self, ctx: &RequestContext, id: &str, claimed_uid: Option<&str>) -> AppResult<()> {
        let (post, liker) = self.like_target(ctx, id, claimed_uid)?;

        match self.posts.add_like(&post, &liker).await? {
            LikeOutcome::Applied => {
                info!(
                    request_id = %ctx.request_id,
                    post_id = %post,
                    user = %liker,
                    "post liked"
                );
                Ok(())
            }
            LikeOutcome::Unchanged => Err(AppError::Conflict(ALREADY_LIKED.to_string())),
            LikeOutcome::PostMissing => Err(like_target_missing()),
        }
    }

    pub async fn unlike(&self, ctx: &RequestContext, id: &str, claimed_uid: Option<&str>) -> AppResult<()> {
        let (post, liker) = self.like_target(ctx, id, claimed_uid)?;

        match self.posts.remove_like(&post, &liker).await? {
            LikeOutcome::Applied => {
                info!(
                    request_id = %ctx.request_id,
                    post_id = %post,
                    user = %liker,
                    "post unliked"
                );
                Ok(())
            }
            LikeOutcome::Unchanged => Err(AppError::Conflict(NOT_LIKED.to_string())),
            LikeOutcome::PostMissing => Err(like_target_missing()),
        }
    }

    fn like_target(
        &self,
        ctx: &RequestContext,
        id: &str,
        claimed_uid: Option<&str>,
    ) -> AppResult<(ObjectId, ObjectId)> {
        let user = ctx.require_user()?;
        if claimed_uid.is_some_and(|uid| uid != user.uid) {
            return Err(AppError::Forbidden);
        }
        Ok((parse_object_id(id)?, session_object_id(user)?))
    }

    async fn owned_post(&self, user: &SessionUser, id: &ObjectId, missing: &str) -> AppResult<Post> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(missing.to_string()))?;

        if !post.is_authored_by(&session_object_id(user)?) {
            return Err(AppError::Forbidden);
        }
        Ok(post)
    }
}

fn like_target_missing() -> AppError {
    AppError::NotFound("Post to be liked could not be found".to_string())
}

/// Sessions are only ever opened for stored users, so a bad uid is internal
fn session_object_id(user: &SessionUser) -> AppResult<ObjectId> {
    user.object_id()
        .ok_or_else(|| AppError::Internal(format!("session carries malformed uid {}", user.uid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthorInfo, User};
    use crate::search::{SortSpec, DEFAULT_SEARCH_INDEX};
    use crate::store::{InMemoryPostStore, InMemoryUserStore, StoreResult};

    struct Fixture {
        service: PostService,
        users: Arc<InMemoryUserStore>,
        posts: Arc<InMemoryPostStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let users = Arc::new(InMemoryUserStore::new());
            let posts = Arc::new(InMemoryPostStore::new());
            let service = PostService::new(
                posts.clone(),
                users.clone(),
                QueryBuilder::new(DEFAULT_SEARCH_INDEX),
            );
            Self { service, users, posts }
        }

        async fn login(&self, name: &str) -> RequestContext {
            let user = User::new(name.into(), format!("{}@example.com", name), "h".into());
            self.users.insert_user(&user).await.unwrap();
            RequestContext::authenticated(user.session_user(), format!("token-{}", name))
        }
    }

    /// Loses every delete race: the post vanishes before the delete lands
    struct RacingDeletes(Arc<InMemoryPostStore>);

    #[async_trait::async_trait]
    impl PostStore for RacingDeletes {
        async fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Post>> {
            self.0.aggregate(pipeline).await
        }

        async fn find_post(&self, id: &ObjectId) -> StoreResult<Option<Post>> {
            self.0.find_post(id).await
        }

        async fn insert_post(&self, post: &Post) -> StoreResult<()> {
            self.0.insert_post(post).await
        }

        async fn update_post(&self, id: &ObjectId, edit: &PostEdit) -> StoreResult<bool> {
            self.0.update_post(id, edit).await
        }

        async fn delete_post(&self, id: &ObjectId) -> StoreResult<bool> {
            self.0.delete_post(id).await?;
            Ok(false)
        }

        async fn add_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome> {
            self.0.add_like(id, user).await
        }

        async fn remove_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome> {
            self.0.remove_like(id, user).await
        }
    }

    fn new_post(quote: &str) -> NewPost {
        NewPost {
            quote: Some(quote.into()),
            author: None,
            source: Some(Source {
                text: "Marcus Aurelius".into(),
                link: String::new(),
            }),
        }
    }

    fn quote_edit(quote: &str) -> PostEdit {
        PostEdit {
            quote: Some(quote.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_starts_with_empty_collections() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;

        let post = fx.service.create(&alice, new_post("hello")).await.unwrap();

        assert!(post.likes.is_empty());
        assert!(post.bookmarks.is_empty());
        assert!(post.comments.is_empty());
        assert_eq!(post.author.username, "alice");
        assert_eq!(post.author.id, alice.require_user().unwrap().uid);
    }

    #[tokio::test]
    async fn test_create_requires_session() {
        let fx = Fixture::new();
        let err = fx
            .service
            .create(&RequestContext::anonymous(), new_post("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthenticationMissing));
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_author_claim() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let mut body = new_post("q");
        body.author = Some(AuthorInfo {
            username: "bob".into(),
            id: ObjectId::new().to_hex(),
        });

        let err = fx.service.create(&alice, body).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_create_requires_quote_and_source() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;

        let mut no_quote = new_post("");
        no_quote.quote = None;
        let mut no_source = new_post("q");
        no_source.source = None;

        assert!(matches!(
            fx.service.create(&alice, no_quote).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            fx.service.create(&alice, no_source).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_may_update() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let bob = fx.login("bob").await;
        let post = fx.service.create(&alice, new_post("q")).await.unwrap();

        let err = fx
            .service
            .update(&bob, &post.id, quote_edit("mine now"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = fx
            .service
            .update(&RequestContext::anonymous(), &post.id, quote_edit("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthenticationMissing));

        fx.service
            .update(&alice, &post.id, quote_edit("edited"))
            .await
            .unwrap();
        let stored = fx
            .posts
            .find_post(&parse_object_id(&post.id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quote, "edited");
        assert_eq!(stored.source.text, "Marcus Aurelius");
    }

    #[tokio::test]
    async fn test_empty_edit_is_rejected() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let post = fx.service.create(&alice, new_post("q")).await.unwrap();

        let err = fx
            .service
            .update(&alice, &post.id, PostEdit::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found_before_ownership() {
        let fx = Fixture::new();
        let bob = fx.login("bob").await;
        let id = ObjectId::new().to_hex();

        let err = fx.service.delete(&bob, &id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Post to be deleted could not be found"));
    }

    #[tokio::test]
    async fn test_malformed_id_is_validation_error() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;

        let err = fx.service.delete(&alice, "not-an-id").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_author_may_delete() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let bob = fx.login("bob").await;
        let post = fx.service.create(&alice, new_post("q")).await.unwrap();

        assert!(matches!(
            fx.service.delete(&bob, &post.id).await,
            Err(AppError::Forbidden)
        ));
        fx.service.delete(&alice, &post.id).await.unwrap();
        assert!(fx.service.list(&SearchRequest::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_like_and_unlike_when_absent_conflict() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let bob = fx.login("bob").await;
        let post = fx.service.create(&alice, new_post("q")).await.unwrap();

        let err = fx.service.unlike(&bob, &post.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == NOT_LIKED));

        fx.service.like(&bob, &post.id, None).await.unwrap();
        let err = fx.service.like(&bob, &post.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == ALREADY_LIKED));

        let listed = fx.service.list(&SearchRequest::new()).await.unwrap();
        assert_eq!(listed[0].likes, vec![bob.require_user().unwrap().uid.clone()]);
    }

    #[tokio::test]
    async fn test_like_checks_claimed_uid() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let bob = fx.login("bob").await;
        let post = fx.service.create(&alice, new_post("q")).await.unwrap();
        let alice_uid = alice.require_user().unwrap().uid.clone();

        let err = fx
            .service
            .like(&bob, &post.id, Some(&alice_uid))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let fx = Fixture::new();
        let bob = fx.login("bob").await;

        let err = fx
            .service
            .like(&bob, &ObjectId::new().to_hex(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first_by_default() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        fx.service.create(&alice, new_post("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        fx.service.create(&alice, new_post("second")).await.unwrap();

        let newest = fx.service.list(&SearchRequest::new()).await.unwrap();
        assert_eq!(newest[0].quote, "second");

        let oldest = fx
            .service
            .list(&SearchRequest::new().sorted_by(SortSpec::asc("datePosted")))
            .await
            .unwrap();
        assert_eq!(oldest[0].quote, "first");
    }

    #[tokio::test]
    async fn test_list_fails_when_an_author_is_gone() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        fx.service.create(&alice, new_post("q")).await.unwrap();
        let uid = alice.require_user().unwrap().object_id().unwrap();
        fx.users.remove(&uid).unwrap();

        let err = fx.service.list(&SearchRequest::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_of_vanished_post_is_not_found() {
        let users = Arc::new(InMemoryUserStore::new());
        let posts = Arc::new(InMemoryPostStore::new());
        let service = PostService::new(
            Arc::new(RacingDeletes(posts.clone())),
            users.clone(),
            QueryBuilder::new(DEFAULT_SEARCH_INDEX),
        );
        let user = User::new("alice".into(), "alice@example.com".into(), "h".into());
        users.insert_user(&user).await.unwrap();
        let alice = RequestContext::authenticated(user.session_user(), "token-alice".into());

        let post = service.create(&alice, new_post("q")).await.unwrap();
        let err = service.delete(&alice, &post.id).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(posts.find_post(&ObjectId::parse_str(&post.id).unwrap()).await.unwrap().is_none());
    }
}
