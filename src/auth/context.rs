//! Request Context
//!
//! Identity and tracing metadata carried from the HTTP layer into services.

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::SessionUser;

/// Context carried through a request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Recorded on every log line a mutation emits
    pub request_id: Uuid,

    pub auth: AuthContext,
}

impl RequestContext {
    pub fn new(auth: AuthContext) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            auth,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(AuthContext::anonymous())
    }

    /// Context for a request carrying a live session
    pub fn authenticated(user: SessionUser, token: String) -> Self {
        Self::new(AuthContext::authenticated(user, token))
    }

    /// The session user, or `AuthenticationMissing`
    pub fn require_user(&self) -> AppResult<&SessionUser> {
        self.auth.user.as_ref().ok_or(AppError::AuthenticationMissing)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Authentication context
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    /// The authenticated user
    pub user: Option<SessionUser>,

    /// Raw session token from the cookie, needed to revoke it on logout
    pub token: Option<String>,
}

impl AuthContext {
    pub fn authenticated(user: SessionUser, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
