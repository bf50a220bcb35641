//! # Users
//!
//! Users are stored as documents in the `users` collection.
//! Username and email are each unique.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// User as stored in the `users` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub username: String,

    pub email: String,

    /// Argon2id password hash (never plaintext)
    #[serde(rename = "password")]
    pub password_hash: String,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            username,
            email,
            password_hash,
        }
    }

    /// The identity a session carries for this user
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            uid: self.id.to_hex(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Authenticated identity: `{uid, username, email}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: String,
    pub username: String,
    pub email: String,
}

impl SessionUser {
    /// The user id as a store reference
    pub fn object_id(&self) -> Option<ObjectId> {
        ObjectId::parse_str(&self.uid).ok()
    }
}

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login request; the identifier may be a username or an email
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username_or_email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}
