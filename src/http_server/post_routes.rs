//! Post endpoints.
//!
//! - `GET /posts` - search, sort and page posts
//! - `POST /posts` - create a post
//! - `PATCH /posts/:id`, `DELETE /posts/:id` - owner-only edits
//! - `POST /posts/:id/like`, `DELETE /posts/:id/like`

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use super::extract::json_body;
use super::response::Envelope;
use super::state::AppState;
use crate::auth::RequestContext;
use crate::error::{AppError, AppResult};
use crate::model::{EnrichedPost, LikeRequest, NewPost, PostEditRequest};
use crate::search::{PostsQuery, SearchRequest};

pub fn post_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", axum::routing::patch(update_post).delete(delete_post))
        .route("/posts/:id/like", post(like_post).delete(unlike_post))
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PostsQuery>, QueryRejection>,
) -> AppResult<Json<Envelope<Vec<EnrichedPost>>>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = SearchRequest::try_from(query)?;

    let posts = state.posts.list(&request).await?;
    Ok(Json(Envelope::with_content("Posts fetched successfully", posts)))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    ctx.require_user()?;
    let body: NewPost = json_body(&body)?;

    let post = state.posts.create(&ctx, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_content("Post created successfully", post)),
    ))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<StatusCode> {
    ctx.require_user()?;
    let edit: PostEditRequest = json_body(&body)?;

    state.posts.update(&ctx, &id, edit.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.posts.delete(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    ctx.require_user()?;
    let body: LikeRequest = json_body(&body)?;

    state.posts.like(&ctx, &id, body.uid.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::message("Post liked successfully")),
    ))
}

async fn unlike_post(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<StatusCode> {
    ctx.require_user()?;
    let body: LikeRequest = json_body(&body)?;

    state.posts.unlike(&ctx, &id, body.uid.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}
