//! MongoDB store backend
//!
//! Posts and users live in one database (`social_data` by default); sessions
//! in a separate one (`metadata`). The stage sequence is sent as-is to
//! `aggregate`, so the `$search` stage requires an Atlas Search index.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, Database, IndexModel,
};

use super::{LikeOutcome, PostStore, StoreError, StoreResult, UserStore};
use crate::auth::session::{Session, SessionRepository};
use crate::model::{Post, PostEdit, User};
use crate::search::Pipeline;

const POSTS_COLLECTION: &str = "posts";
const USERS_COLLECTION: &str = "users";
const SESSIONS_COLLECTION: &str = "sessions";

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match &*err.kind {
            ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
                let field = if write.message.contains("email") {
                    "email"
                } else if write.message.contains("username") {
                    "username"
                } else {
                    "_id"
                };
                StoreError::Duplicate(field.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Connect to a MongoDB deployment
pub async fn connect(uri: &str) -> StoreResult<Client> {
    Ok(Client::with_uri_str(uri).await?)
}

/// Posts and users backed by MongoDB
#[derive(Debug, Clone)]
pub struct MongoStore {
    posts: Collection<Post>,
    users: Collection<User>,
}

impl MongoStore {
    pub fn new(database: &Database) -> Self {
        Self {
            posts: database.collection(POSTS_COLLECTION),
            users: database.collection(USERS_COLLECTION),
        }
    }

    /// Unique indexes on username and email.
    ///
    /// Registration checks for duplicates before inserting; these indexes make
    /// the store reject the losing side of a concurrent registration.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        for field in ["username", "email"] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.users.create_index(index, None).await?;
        }
        Ok(())
    }

    async fn post_exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.posts.count_documents(doc! { "_id": *id }, None).await? > 0)
    }
}

fn edit_document(edit: &PostEdit) -> Document {
    let mut set = Document::new();
    if let Some(quote) = &edit.quote {
        set.insert("quote", quote.clone());
    }
    if let Some(text) = &edit.source_text {
        set.insert("source.text", text.clone());
    }
    if let Some(link) = &edit.source_link {
        set.insert("source.link", link.clone());
    }
    set
}

#[async_trait]
impl PostStore for MongoStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Post>> {
        let cursor = self.posts.aggregate(pipeline.to_documents(), None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|d| bson::from_document::<Post>(d).map_err(StoreError::from))
            .collect()
    }

    async fn find_post(&self, id: &ObjectId) -> StoreResult<Option<Post>> {
        Ok(self.posts.find_one(doc! { "_id": *id }, None).await?)
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.posts.insert_one(post, None).await?;
        Ok(())
    }

    async fn update_post(&self, id: &ObjectId, edit: &PostEdit) -> StoreResult<bool> {
        let set = edit_document(edit);
        if set.is_empty() {
            return self.post_exists(id).await;
        }
        let result = self
            .posts
            .update_one(doc! { "_id": *id }, doc! { "$set": set }, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_post(&self, id: &ObjectId) -> StoreResult<bool> {
        let result = self.posts.delete_one(doc! { "_id": *id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome> {
        let result = self
            .posts
            .update_one(
                doc! { "_id": *id, "likes": { "$ne": *user } },
                doc! { "$push": { "likes": *user } },
                None,
            )
            .await?;

        if result.matched_count > 0 {
            Ok(LikeOutcome::Applied)
        } else if self.post_exists(id).await? {
            Ok(LikeOutcome::Unchanged)
        } else {
            Ok(LikeOutcome::PostMissing)
        }
    }

    async fn remove_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome> {
        let result = self
            .posts
            .update_one(
                doc! { "_id": *id, "likes": *user },
                doc! { "$pull": { "likes": *user } },
                None,
            )
            .await?;

        if result.matched_count > 0 {
            Ok(LikeOutcome::Applied)
        } else if self.post_exists(id).await? {
            Ok(LikeOutcome::Unchanged)
        } else {
            Ok(LikeOutcome::PostMissing)
        }
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "username": username }, None).await?)
    }

    async fn find_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>> {
        let filter = doc! {
            "$or": [
                { "username": username_or_email },
                { "email": username_or_email },
            ]
        };
        Ok(self.users.find_one(filter, None).await?)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users.insert_one(user, None).await?;
        Ok(())
    }
}

/// Sessions stored in MongoDB, expired by a TTL index on `expires_at`
#[derive(Debug, Clone)]
pub struct MongoSessionRepository {
    sessions: Collection<Session>,
}

impl MongoSessionRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            sessions: database.collection(SESSIONS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let token = IndexModel::builder()
            .keys(doc! { "token_hash": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let ttl = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(std::time::Duration::from_secs(0))
                    .build(),
            )
            .build();
        self.sessions.create_index(token, None).await?;
        self.sessions.create_index(ttl, None).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MongoSessionRepository {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        self.sessions.insert_one(session, None).await?;
        Ok(())
    }

    async fn find_by_token_hash(&self, hash: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.find_one(doc! { "token_hash": hash }, None).await?)
    }

    async fn delete_by_token_hash(&self, hash: &str) -> StoreResult<bool> {
        let result = self
            .sessions
            .delete_one(doc! { "token_hash": hash }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_expired(&self) -> StoreResult<usize> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .sessions
            .delete_many(doc! { "expires_at": { "$lte": now } }, None)
            .await?;
        Ok(result.deleted_count as usize)
    }
}
