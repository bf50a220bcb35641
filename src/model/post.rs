//! # Posts
//!
//! The stored post document and the enriched shape returned to clients.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a quote comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub text: String,
    #[serde(default)]
    pub link: String,
}

/// A comment attached to a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default)]
    pub likes: u32,
    pub author: ObjectId,
}

/// Post as stored in the `posts` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub quote: String,

    /// Reference to the authoring user
    pub author: ObjectId,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_posted: DateTime<Utc>,

    pub source: Source,

    /// Users who like this post; each appears at most once
    #[serde(default)]
    pub likes: Vec<ObjectId>,

    #[serde(default)]
    pub bookmarks: Vec<ObjectId>,

    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// A freshly submitted post: no likes, bookmarks or comments yet
    pub fn new(author: ObjectId, quote: String, source: Source) -> Self {
        Self {
            id: ObjectId::new(),
            quote,
            author,
            date_posted: Utc::now(),
            source,
            likes: Vec::new(),
            bookmarks: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn is_liked_by(&self, user: &ObjectId) -> bool {
        self.likes.contains(user)
    }

    pub fn is_authored_by(&self, user: &ObjectId) -> bool {
        &self.author == user
    }
}

/// Fields a post owner may change. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostEdit {
    pub quote: Option<String>,
    pub source_text: Option<String>,
    pub source_link: Option<String>,
}

impl PostEdit {
    pub fn is_empty(&self) -> bool {
        self.quote.is_none() && self.source_text.is_none() && self.source_link.is_none()
    }

    /// Apply this edit to an in-memory post
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(quote) = &self.quote {
            post.quote = quote.clone();
        }
        if let Some(text) = &self.source_text {
            post.source.text = text.clone();
        }
        if let Some(link) = &self.source_link {
            post.source.link = link.clone();
        }
    }
}

/// Body of `POST /posts`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub quote: Option<String>,

    /// Claimed author; when present it must be the session user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorInfo>,

    #[serde(default)]
    pub source: Option<Source>,
}

/// Body of `PATCH /posts/:id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEditRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,

    #[serde(default, alias = "sourceText", skip_serializing_if = "Option::is_none")]
    pub source_author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
}

impl From<PostEditRequest> for PostEdit {
    fn from(req: PostEditRequest) -> Self {
        Self {
            quote: req.quote,
            source_text: req.source_author,
            source_link: req.source_link,
        }
    }
}

/// Body of `POST|DELETE /posts/:id/like`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LikeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Resolved author identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub username: String,
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub text: String,
    pub likes: u32,
    pub author: String,
}

/// Post with its author resolved, as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPost {
    #[serde(rename = "_id")]
    pub id: String,
    pub quote: String,
    pub author: AuthorInfo,
    pub date_posted: DateTime<Utc>,
    pub source: Source,
    pub likes: Vec<String>,
    pub bookmarks: Vec<String>,
    pub comments: Vec<CommentView>,
}

impl EnrichedPost {
    /// Replace the author reference with `{username, _id}`
    pub fn from_post(post: Post, username: String) -> Self {
        Self {
            id: post.id.to_hex(),
            quote: post.quote,
            author: AuthorInfo {
                username,
                id: post.author.to_hex(),
            },
            date_posted: post.date_posted,
            source: post.source,
            likes: post.likes.iter().map(|id| id.to_hex()).collect(),
            bookmarks: post.bookmarks.iter().map(|id| id.to_hex()).collect(),
            comments: post
                .comments
                .into_iter()
                .map(|c| CommentView {
                    text: c.text,
                    likes: c.likes,
                    author: c.author.to_hex(),
                })
                .collect(),
        }
    }

    pub fn is_liked_by(&self, uid: &str) -> bool {
        self.likes.iter().any(|id| id == uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_starts_empty() {
        let author = ObjectId::new();
        let post = Post::new(author, "hi".into(), Source { text: "me".into(), link: String::new() });

        assert!(post.likes.is_empty());
        assert!(post.bookmarks.is_empty());
        assert!(post.comments.is_empty());
        assert!(post.is_authored_by(&author));
    }

    #[test]
    fn test_edit_applies_only_present_fields() {
        let mut post = Post::new(
            ObjectId::new(),
            "old".into(),
            Source { text: "a".into(), link: "l".into() },
        );
        let edit = PostEdit {
            quote: Some("new".into()),
            ..Default::default()
        };
        edit.apply_to(&mut post);

        assert_eq!(post.quote, "new");
        assert_eq!(post.source.text, "a");
        assert_eq!(post.source.link, "l");
    }

    #[test]
    fn test_edit_request_accepts_both_source_field_names() {
        let a: PostEditRequest = serde_json::from_str(r#"{"sourceAuthor":"Seneca"}"#).unwrap();
        let b: PostEditRequest = serde_json::from_str(r#"{"sourceText":"Seneca"}"#).unwrap();

        assert_eq!(PostEdit::from(a).source_text.as_deref(), Some("Seneca"));
        assert_eq!(PostEdit::from(b).source_text.as_deref(), Some("Seneca"));
    }

    #[test]
    fn test_new_post_author_is_optional() {
        let body: NewPost =
            serde_json::from_str(r#"{"quote":"q","source":{"text":"t"}}"#).unwrap();

        assert!(body.author.is_none());
        assert_eq!(body.source.unwrap().link, "");
    }

    #[test]
    fn test_enriched_post_wire_shape() {
        let author = ObjectId::new();
        let liker = ObjectId::new();
        let mut post = Post::new(author, "hi".into(), Source { text: "me".into(), link: String::new() });
        post.likes.push(liker);

        let enriched = EnrichedPost::from_post(post, "alice".into());
        let json = serde_json::to_value(&enriched).unwrap();

        assert_eq!(json["author"]["username"], "alice");
        assert_eq!(json["author"]["_id"], author.to_hex());
        assert_eq!(json["likes"][0], liker.to_hex());
        assert!(json.get("datePosted").is_some());
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn test_stored_post_document_round_trip() {
        let post = Post::new(ObjectId::new(), "q".into(), Source::default());
        let doc = bson::to_document(&post).unwrap();

        assert!(doc.get_datetime("datePosted").is_ok());
        assert!(doc.get_object_id("_id").is_ok());

        let back: Post = bson::from_document(doc).unwrap();
        assert_eq!(back.id, post.id);
        assert_eq!(back.date_posted.timestamp_millis(), post.date_posted.timestamp_millis());
    }
}
