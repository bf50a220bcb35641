//! Shared helpers: an in-memory app driven in-process with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use quoteversation::config::SessionSettings;
use quoteversation::http_server::{build_router, AppState, HttpServerConfig};
use quoteversation::search::DEFAULT_SEARCH_INDEX;

pub fn app() -> Router {
    let state = AppState::in_memory(DEFAULT_SEARCH_INDEX, SessionSettings::default());
    build_router(&HttpServerConfig::default(), Arc::new(state))
}

pub struct Reply {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl Reply {
    /// `name=value` of the session cookie the server set
    pub fn session_cookie(&self) -> String {
        let raw = self.set_cookie.as_deref().expect("no Set-Cookie header");
        raw.split(';').next().unwrap().trim().to_string()
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        set_cookie,
        body,
    }
}

/// Register a user; returns (session cookie, uid)
pub async fn register(app: &Router, username: &str) -> (String, String) {
    let reply = send(
        app,
        Method::POST,
        "/register",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct horse battery",
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);

    let uid = reply.body["content"]["uid"].as_str().unwrap().to_string();
    (reply.session_cookie(), uid)
}

/// Create a post as the cookie's user; returns its id
pub async fn create_post(app: &Router, cookie: &str, quote: &str, source: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/posts",
        Some(cookie),
        Some(serde_json::json!({
            "quote": quote,
            "source": { "text": source, "link": "" },
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
    reply.body["content"]["_id"].as_str().unwrap().to_string()
}

pub async fn list(app: &Router, query: &str) -> Vec<Value> {
    let reply = send(app, Method::GET, &format!("/posts{}", query), None, None).await;
    assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);
    reply.body["content"].as_array().unwrap().clone()
}
