//! Account endpoints.
//!
//! - `POST /register` - create a user and open a session (201)
//! - `POST /login` - open a session (200)
//! - `GET /session` - the current session's user
//! - `POST /logout` - revoke the session and clear the cookie

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;

use super::extract::json_body;
use super::response::Envelope;
use super::state::AppState;
use crate::auth::RequestContext;
use crate::error::AppResult;
use crate::model::{LoginRequest, RegisterRequest, SessionUser};

pub fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/session", get(current_session))
        .route("/logout", post(logout))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let req: RegisterRequest = json_body(&body)?;
    let (user, token) = state.accounts.register(req).await?;

    Ok((
        StatusCode::CREATED,
        jar.add(state.session_cookie(token)),
        Json(Envelope::with_content("User registered successfully", user)),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let req: LoginRequest = json_body(&body)?;
    let (user, token) = state.accounts.login(req).await?;

    Ok((
        jar.add(state.session_cookie(token)),
        Json(Envelope::with_content("Login successful", user)),
    ))
}

async fn current_session(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> AppResult<Json<Envelope<SessionUser>>> {
    let user = state.accounts.current(&ctx)?;
    Ok(Json(Envelope::with_content("User is logged in", user)))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    state.accounts.logout(&ctx).await?;

    Ok((
        jar.remove(state.session_cookie_removal()),
        Json(Envelope::message("User successfully logged out")),
    ))
}
