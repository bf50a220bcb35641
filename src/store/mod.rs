//! # Document Store
//!
//! Storage traits for posts and users, with two backends:
//! - `memory`: in-process, executes stage sequences itself (tests, local runs)
//! - `mongo`: MongoDB with an Atlas Search index
//!
//! Handlers never reach a global handle; the process builds one backend and
//! injects it through `AppState`.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;
use thiserror::Error;

use crate::model::{Post, PostEdit, User};
use crate::search::Pipeline;

pub use memory::{InMemoryPostStore, InMemoryUserStore};
pub use mongo::{MongoSessionRepository, MongoStore};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failures
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A unique field already holds this value
    #[error("duplicate value for unique field '{0}'")]
    Duplicate(String),

    #[error("lock poisoned")]
    LockPoisoned,

    #[error("malformed document: {0}")]
    Decode(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result of a conditional like/unlike update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The like set changed
    Applied,
    /// The like set was already in the requested state
    Unchanged,
    PostMissing,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Execute a stage sequence over the posts collection
    async fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Post>>;

    async fn find_post(&self, id: &ObjectId) -> StoreResult<Option<Post>>;

    async fn insert_post(&self, post: &Post) -> StoreResult<()>;

    /// Returns false when no post has this id
    async fn update_post(&self, id: &ObjectId, edit: &PostEdit) -> StoreResult<bool>;

    /// Returns false when no post has this id
    async fn delete_post(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Add `user` to the like set only if absent
    async fn add_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome>;

    /// Remove `user` from the like set only if present
    async fn remove_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Match on username or email
    async fn find_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>>;

    /// Fails with `StoreError::Duplicate` when the username or email is taken
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
}
