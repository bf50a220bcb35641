//! # Search
//!
//! Builds the filtered, sorted, paginated stage sequence behind `GET /posts`.
//!
//! ```text
//! PostsQuery --try_from--> SearchRequest --QueryBuilder::build--> Pipeline
//! ```

pub mod builder;
pub mod request;
pub mod stage;

pub use builder::{QueryBuilder, DEFAULT_SEARCH_INDEX, PAGE_SIZE};
pub use request::{PostsQuery, SearchRequest, SearchRequestError};
pub use stage::{Clause, Pipeline, SearchStage, SortDirection, SortKey, SortSpec, Stage};
