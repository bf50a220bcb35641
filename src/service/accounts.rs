//! Account operations: register, login, logout, current session.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::required;
use crate::auth::crypto::{hash_password, verify_password};
use crate::auth::{RequestContext, SessionManager};
use crate::error::{AppError, AppResult};
use crate::model::{LoginRequest, RegisterRequest, SessionUser, User};
use crate::store::{StoreError, UserStore};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid")
});

const EMAIL_TAKEN: &str = "Email already exists";
const USERNAME_TAKEN: &str = "Username already exists";

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionManager) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create a user and open a session. Returns the identity and raw token.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<(SessionUser, String)> {
        let username = required(req.username.as_deref(), "username")?.to_string();
        let email = required(req.email.as_deref(), "email")?.to_string();
        let password = req
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("Missing required field: password".to_string()))?;

        if !validate_email(&email) {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
        let user = User::new(username, email, hash);

        // The store enforces uniqueness too; a concurrent registration loses here.
        match self.users.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(field)) if field == "email" => {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()))
            }
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict(USERNAME_TAKEN.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, username = %user.username, "user registered");
        self.open_session(user.session_user()).await
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<(SessionUser, String)> {
        let (Some(login), Some(password)) = (req.username_or_email, req.password) else {
            return Err(AppError::InvalidCredentials);
        };

        let user = self
            .users
            .find_by_login(&login)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
        if !matches {
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        self.open_session(user.session_user()).await
    }

    /// Revoke the session the request came in on
    pub async fn logout(&self, ctx: &RequestContext) -> AppResult<()> {
        let user = ctx.require_user()?;
        let token = ctx.auth.token.as_deref().ok_or(AppError::AuthenticationMissing)?;

        self.sessions.revoke(token).await?;
        info!(request_id = %ctx.request_id, uid = %user.uid, "user logged out");
        Ok(())
    }

    pub fn current(&self, ctx: &RequestContext) -> AppResult<SessionUser> {
        ctx.require_user().cloned()
    }

    /// Resolve a raw cookie token into a request context
    pub async fn context_for(&self, token: Option<String>) -> AppResult<RequestContext> {
        let Some(token) = token else {
            return Ok(RequestContext::anonymous());
        };
        match self.sessions.resolve(&token).await? {
            Some(session) => Ok(RequestContext::authenticated(session.user, token)),
            None => Ok(RequestContext::anonymous()),
        }
    }

    async fn open_session(&self, user: SessionUser) -> AppResult<(SessionUser, String)> {
        let (session, token) = self.sessions.create_session(user).await?;
        Ok((session.user, token))
    }
}
