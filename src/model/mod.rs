//! Data model: stored documents and API shapes.

pub mod post;
pub mod user;

pub use post::{
    AuthorInfo, Comment, CommentView, EnrichedPost, LikeRequest, NewPost, Post, PostEdit,
    PostEditRequest, Source,
};
pub use user::{LoginRequest, RegisterRequest, SessionUser, User};
