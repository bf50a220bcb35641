//! Shared state handed to every handler.

use std::sync::Arc;

use axum_extra::extract::cookie::Cookie;

use crate::auth::{InMemorySessionRepository, SessionConfig, SessionManager, SessionRepository};
use crate::config::SessionSettings;
use crate::search::QueryBuilder;
use crate::service::{AccountService, PostService};
use crate::store::{InMemoryPostStore, InMemoryUserStore, PostStore, UserStore};

pub struct AppState {
    pub posts: PostService,
    pub accounts: AccountService,
    pub session: SessionSettings,
}

impl AppState {
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionRepository>,
        search_index: &str,
        session: SessionSettings,
    ) -> Self {
        let manager = SessionManager::new(SessionConfig { ttl: session.ttl() }, sessions);
        Self {
            posts: PostService::new(posts, users.clone(), QueryBuilder::new(search_index)),
            accounts: AccountService::new(users, manager),
            session,
        }
    }

    /// Every store in process memory
    pub fn in_memory(search_index: &str, session: SessionSettings) -> Self {
        Self::new(
            Arc::new(InMemoryPostStore::new()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionRepository::new()),
            search_index,
            session,
        )
    }

    /// The cookie carrying a freshly opened session
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.session.cookie_name.clone(), token))
            .http_only(true)
            .path("/")
            .secure(self.session.secure)
            .same_site(self.session.same_site.into())
            .max_age(time::Duration::seconds(self.session.ttl().num_seconds()))
            .build()
    }

    /// A cookie that, once removed from the jar, expires the session cookie
    pub fn session_cookie_removal(&self) -> Cookie<'static> {
        Cookie::build((self.session.cookie_name.clone(), ""))
            .path("/")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::DEFAULT_SEARCH_INDEX;
    use axum_extra::extract::cookie::SameSite;

    #[test]
    fn test_session_cookie_attributes() {
        let state = AppState::in_memory(DEFAULT_SEARCH_INDEX, SessionSettings::default());
        let cookie = state.session_cookie("abc".into());

        assert_eq!(cookie.name(), "qv_session");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
    }

    #[test]
    fn test_session_cookie_lives_as_long_as_the_session() {
        let settings = SessionSettings {
            ttl_hours: 2,
            ..SessionSettings::default()
        };
        let state = AppState::in_memory(DEFAULT_SEARCH_INDEX, settings);

        let cookie = state.session_cookie("abc".into());
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(7200)));
    }
}
