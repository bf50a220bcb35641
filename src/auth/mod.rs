//! # Auth Module
//!
//! Password credentials, cookie sessions, and the per-request identity.
//!
//! - `crypto`: argon2id password hashing, session token generation
//! - `session`: session lifecycle over a pluggable repository
//! - `context`: `RequestContext` threaded from handlers into services

pub mod context;
pub mod crypto;
pub mod session;

pub use context::{AuthContext, RequestContext};
pub use session::{
    InMemorySessionRepository, Session, SessionConfig, SessionManager, SessionRepository,
};
