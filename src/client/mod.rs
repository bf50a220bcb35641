//! # Client
//!
//! A typed client for the REST API and a local feed that applies mutations
//! optimistically, rolling back when the server rejects them.

pub mod api;
pub mod feed;

pub use api::{ClientError, ClientResult, HttpClient, QuoteApi};
pub use feed::{Feed, PendingChange};
