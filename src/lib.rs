//! quoteversation - share, search and like quotes
//!
//! A REST API over a document store, with a search pipeline builder, an
//! author-resolving result enricher, cookie sessions, and a typed client.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http_server;
pub mod model;
pub mod observability;
pub mod search;
pub mod service;
pub mod store;

pub use error::{AppError, AppResult};
