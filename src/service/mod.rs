//! # Services
//!
//! The operations behind each route, written against an explicit
//! `RequestContext` instead of ambient session state. Handlers only translate
//! between HTTP and these calls.

pub mod accounts;
pub mod posts;

use bson::oid::ObjectId;

use crate::error::{AppError, AppResult};

pub use accounts::AccountService;
pub use posts::PostService;

/// Parse a path id into a store reference
pub fn parse_object_id(value: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(value)
        .map_err(|_| AppError::Validation(format!("Invalid id: {}", value)))
}

/// A required text field: absent or blank is a validation error
pub(crate) fn required<'a>(value: Option<&'a str>, field: &str) -> AppResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("Missing required field: {}", field))),
    }
}
