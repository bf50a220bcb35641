//! Request extraction: session cookie into `RequestContext`, lenient JSON bodies.

use std::sync::Arc;

use axum::{body::Bytes, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::state::AppState;
use crate::auth::RequestContext;
use crate::error::{AppError, AppResult};

/// Every handler that takes a `RequestContext` resolves the session cookie.
/// A missing, unknown or expired cookie yields an anonymous context; each
/// operation decides whether that is acceptable.
#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.session.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty());

        let ctx = state.accounts.context_for(token).await?;
        debug!(
            request_id = %ctx.request_id,
            method = %parts.method,
            path = %parts.uri.path(),
            authenticated = ctx.auth.is_authenticated(),
            "request context resolved"
        );
        Ok(ctx)
    }
}

/// Parse a JSON body. An empty body is the type's default, so routes whose
/// fields are all optional also accept bodiless requests.
pub fn json_body<T>(body: &Bytes) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}
