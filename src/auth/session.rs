//! # Session Management
//!
//! Opaque session tokens travel in a cookie; only their SHA-256 hash is stored.
//! A session expires at its stated time and logout removes it immediately.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::crypto::{constant_time_str_eq, generate_token, hash_token};
use crate::model::SessionUser;
use crate::store::{StoreError, StoreResult};

/// Stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,

    /// Identity this session authenticates
    pub user: SessionUser,

    /// Hashed token (raw token given to client)
    pub token_hash: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session manager configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
        }
    }
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> StoreResult<()>;

    async fn find_by_token_hash(&self, hash: &str) -> StoreResult<Option<Session>>;

    /// Returns false when no session had this hash
    async fn delete_by_token_hash(&self, hash: &str) -> StoreResult<bool>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> StoreResult<usize>;
}

/// Creates, resolves and revokes sessions
#[derive(Clone)]
pub struct SessionManager {
    config: SessionConfig,
    repository: Arc<dyn SessionRepository>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, repository: Arc<dyn SessionRepository>) -> Self {
        Self { config, repository }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Open a session for a user.
    ///
    /// Returns the raw token (not hashed) to hand to the client.
    pub async fn create_session(&self, user: SessionUser) -> StoreResult<(Session, String)> {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user,
            token_hash: hash_token(&token),
            created_at: now,
            expires_at: now + self.config.ttl,
        };

        self.repository.create(&session).await?;
        Ok((session, token))
    }

    /// Look up the live session for a raw token. Expired sessions are removed.
    pub async fn resolve(&self, token: &str) -> StoreResult<Option<Session>> {
        let hash = hash_token(token);
        let Some(session) = self.repository.find_by_token_hash(&hash).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.repository.delete_by_token_hash(&hash).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Logout: the token stops resolving immediately
    pub async fn revoke(&self, token: &str) -> StoreResult<bool> {
        self.repository.delete_by_token_hash(&hash_token(token)).await
    }

    pub async fn purge_expired(&self) -> StoreResult<usize> {
        self.repository.delete_expired().await
    }
}

/// In-memory session repository
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<Vec<Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        sessions.push(session.clone());
        Ok(())
    }

    async fn find_by_token_hash(&self, hash: &str) -> StoreResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(sessions
            .iter()
            .find(|s| constant_time_str_eq(&s.token_hash, hash))
            .cloned())
    }

    async fn delete_by_token_hash(&self, hash: &str) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        let len_before = sessions.len();
        sessions.retain(|s| !constant_time_str_eq(&s.token_hash, hash));
        Ok(sessions.len() != len_before)
    }

    async fn delete_expired(&self) -> StoreResult<usize> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        let now = Utc::now();
        let len_before = sessions.len();
        sessions.retain(|s| !s.is_expired(now));
        Ok(len_before - sessions.len())
    }
}
