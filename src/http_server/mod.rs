//! # HTTP Server Module
//!
//! The REST surface over the post and account services.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/posts`, `/posts/:id`, `/posts/:id/like` - Posts
//! - `/register`, `/login`, `/session`, `/logout` - Accounts
//!
//! Sessions travel in an `HttpOnly` cookie; handlers receive the resolved
//! identity as a `RequestContext`.

pub mod account_routes;
pub mod config;
pub mod extract;
pub mod post_routes;
pub mod response;
pub mod server;
pub mod state;

pub use config::HttpServerConfig;
pub use response::{Envelope, ErrorResponse};
pub use server::{build_router, HttpServer};
pub use state::AppState;
