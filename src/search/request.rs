//! Search request parsing
//!
//! `PostsQuery` is the raw query string of `GET /posts`; `SearchRequest` is
//! its typed form. Empty strings count as absent. Values that are present but
//! unparseable are rejected here, so the builder only sees typed input.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::{SortDirection, SortKey, SortSpec};

/// Errors raised while parsing a search query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchRequestError {
    #[error("Invalid date for {field}: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid sort specification: {0}")]
    InvalidSort(String),

    #[error("Invalid skip: {0}")]
    InvalidSkip(String),
}

/// Query string of `GET /posts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// `field:dir[,field:dir...]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Kept as text so that `skip=` reads as absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
}

/// Typed search request. Every field is optional; absence means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text term matched against quote and source text
    pub term: Option<String>,
    /// Earliest posting time (inclusive)
    pub date_lower: Option<DateTime<Utc>>,
    /// Latest posting time (inclusive)
    pub date_upper: Option<DateTime<Utc>>,
    /// Source description filter
    pub source: Option<String>,
    pub sort: Option<SortSpec>,
    pub skip: Option<u64>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn posted_after(mut self, lower: DateTime<Utc>) -> Self {
        self.date_lower = Some(lower);
        self
    }

    pub fn posted_before(mut self, upper: DateTime<Utc>) -> Self {
        self.date_upper = Some(upper);
        self
    }

    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skipping(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// True when any field that produces a filter clause is set
    pub fn has_filters(&self) -> bool {
        self.term.is_some()
            || self.date_lower.is_some()
            || self.date_upper.is_some()
            || self.source.is_some()
    }

    /// The query-string form, used by the client
    pub fn to_query(&self) -> PostsQuery {
        PostsQuery {
            search_term: self.term.clone(),
            before_date: self.date_upper.map(|d| d.to_rfc3339()),
            after_date: self.date_lower.map(|d| d.to_rfc3339()),
            source: self.source.clone(),
            sort: self.sort.as_ref().map(SortSpec::to_query_value),
            skip: self.skip.map(|n| n.to_string()),
        }
    }
}

impl TryFrom<PostsQuery> for SearchRequest {
    type Error = SearchRequestError;

    fn try_from(query: PostsQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            term: non_empty(query.search_term),
            date_lower: non_empty(query.after_date)
                .map(|v| parse_date("afterDate", &v))
                .transpose()?,
            date_upper: non_empty(query.before_date)
                .map(|v| parse_date("beforeDate", &v))
                .transpose()?,
            source: non_empty(query.source),
            sort: non_empty(query.sort).map(|v| parse_sort(&v)).transpose()?,
            skip: non_empty(query.skip).map(|v| parse_skip(&v)).transpose()?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_skip(value: &str) -> Result<u64, SearchRequestError> {
    value
        .trim()
        .parse()
        .map_err(|_| SearchRequestError::InvalidSkip(value.to_string()))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, SearchRequestError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| SearchRequestError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

/// Parses `field:dir[,field:dir...]`. Field names are taken verbatim.
pub fn parse_sort(value: &str) -> Result<SortSpec, SearchRequestError> {
    let mut keys = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (field, dir) = part
            .rsplit_once(':')
            .ok_or_else(|| SearchRequestError::InvalidSort(part.to_string()))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(SearchRequestError::InvalidSort(part.to_string()));
        }
        let direction = SortDirection::parse(dir)
            .ok_or_else(|| SearchRequestError::InvalidSort(part.to_string()))?;
        keys.push(SortKey {
            field: field.to_string(),
            direction,
        });
    }

    if keys.is_empty() {
        return Err(SearchRequestError::InvalidSort(value.to_string()));
    }
    Ok(SortSpec::new(keys))
}
