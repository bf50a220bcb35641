//! Typed HTTP client for the REST API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::http_server::{Envelope, ErrorResponse};
use crate::model::{
    EnrichedPost, LikeRequest, LoginRequest, NewPost, PostEditRequest, RegisterRequest,
    SessionUser,
};
use crate::search::PostsQuery;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },

    #[error("response carried no content")]
    MissingContent,

    #[error("not signed in")]
    NotSignedIn,

    #[error("post {0} is not in the feed")]
    UnknownPost(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// The REST surface, one method per route
#[async_trait]
pub trait QuoteApi: Send + Sync {
    async fn list_posts(&self, query: &PostsQuery) -> ClientResult<Vec<EnrichedPost>>;

    async fn create_post(&self, post: &NewPost) -> ClientResult<EnrichedPost>;

    async fn update_post(&self, id: &str, edit: &PostEditRequest) -> ClientResult<()>;

    async fn delete_post(&self, id: &str) -> ClientResult<()>;

    async fn like(&self, id: &str, uid: &str) -> ClientResult<()>;

    async fn unlike(&self, id: &str, uid: &str) -> ClientResult<()>;

    async fn register(&self, req: &RegisterRequest) -> ClientResult<SessionUser>;

    async fn login(&self, req: &LoginRequest) -> ClientResult<SessionUser>;

    async fn session(&self) -> ClientResult<SessionUser>;

    async fn logout(&self) -> ClientResult<()>;
}

/// reqwest-backed client; the session cookie is kept in its cookie store
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> ClientResult<Response> {
        debug!(%method, path, "api request");
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        check(response).await
    }
}

/// Turn a non-2xx response into `ClientError::Api` using its `{error}` body
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    Err(ClientError::Api { status, message })
}

async fn content<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    response
        .json::<Envelope<T>>()
        .await?
        .content
        .ok_or(ClientError::MissingContent)
}

#[async_trait]
impl QuoteApi for HttpClient {
    async fn list_posts(&self, query: &PostsQuery) -> ClientResult<Vec<EnrichedPost>> {
        let response = self.client.get(self.url("/posts")).query(query).send().await?;
        content(check(response).await?).await
    }

    async fn create_post(&self, post: &NewPost) -> ClientResult<EnrichedPost> {
        let response = self.send_json(reqwest::Method::POST, "/posts", post).await?;
        content(response).await
    }

    async fn update_post(&self, id: &str, edit: &PostEditRequest) -> ClientResult<()> {
        self.send_json(reqwest::Method::PATCH, &format!("/posts/{}", id), edit)
            .await?;
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/posts/{}", id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn like(&self, id: &str, uid: &str) -> ClientResult<()> {
        let body = LikeRequest { uid: Some(uid.to_string()) };
        self.send_json(reqwest::Method::POST, &format!("/posts/{}/like", id), &body)
            .await?;
        Ok(())
    }

    async fn unlike(&self, id: &str, uid: &str) -> ClientResult<()> {
        let body = LikeRequest { uid: Some(uid.to_string()) };
        self.send_json(reqwest::Method::DELETE, &format!("/posts/{}/like", id), &body)
            .await?;
        Ok(())
    }

    async fn register(&self, req: &RegisterRequest) -> ClientResult<SessionUser> {
        let response = self.send_json(reqwest::Method::POST, "/register", req).await?;
        content(response).await
    }

    async fn login(&self, req: &LoginRequest) -> ClientResult<SessionUser> {
        let response = self.send_json(reqwest::Method::POST, "/login", req).await?;
        content(response).await
    }

    async fn session(&self) -> ClientResult<SessionUser> {
        let response = self.client.get(self.url("/session")).send().await?;
        content(check(response).await?).await
    }

    async fn logout(&self) -> ClientResult<()> {
        let response = self.client.post(self.url("/logout")).send().await?;
        check(response).await?;
        Ok(())
    }
}
