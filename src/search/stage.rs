//! Stage sequence structures
//!
//! Typed form of the aggregation stages sent to the document store, and their
//! rendering as MongoDB documents.

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};

/// Indexed path of the quote text
pub const QUOTE_PATH: &str = "quote";
/// Indexed path of the source description
pub const SOURCE_TEXT_PATH: &str = "source.text";
/// Indexed path of the posting timestamp
pub const DATE_POSTED_PATH: &str = "datePosted";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parses `1`, `-1`, `asc` or `desc`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "asc" => Some(SortDirection::Asc),
            "-1" | "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    /// MongoDB sort value
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordered list of sort keys; earlier keys take precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(vec![SortKey {
            field: field.into(),
            direction: SortDirection::Asc,
        }])
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(vec![SortKey {
            field: field.into(),
            direction: SortDirection::Desc,
        }])
    }

    /// Newest posts first
    pub fn newest_first() -> Self {
        Self::desc(DATE_POSTED_PATH)
    }

    /// Append a lower-precedence key
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `field:dir` pairs joined by commas, the query-string form
    pub fn to_query_value(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}:{}", k.field, k.direction.as_i32()))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn to_document(&self) -> Document {
        let mut sort = Document::new();
        for key in &self.keys {
            sort.insert(key.field.clone(), key.direction.as_i32());
        }
        sort
    }
}

/// A compound-search clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Full-text match of `query` against one or more paths
    Text { query: String, paths: Vec<String> },

    /// Date range on `path`; an absent bound does not constrain
    Range {
        path: String,
        gte: Option<DateTime<Utc>>,
        lte: Option<DateTime<Utc>>,
    },
}

impl Clause {
    pub fn text(query: impl Into<String>, paths: &[&str]) -> Self {
        Clause::Text {
            query: query.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn date_range(
        path: impl Into<String>,
        gte: Option<DateTime<Utc>>,
        lte: Option<DateTime<Utc>>,
    ) -> Self {
        Clause::Range {
            path: path.into(),
            gte,
            lte,
        }
    }

    pub fn is_text_on(&self, path: &str) -> bool {
        matches!(self, Clause::Text { paths, .. } if paths.iter().any(|p| p == path))
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Clause::Range { .. })
    }

    fn to_document(&self) -> Document {
        match self {
            Clause::Text { query, paths } => {
                let path = match paths.as_slice() {
                    [single] => Bson::String(single.clone()),
                    many => Bson::Array(many.iter().cloned().map(Bson::String).collect()),
                };
                doc! { "text": { "query": query.clone(), "path": path } }
            }
            Clause::Range { path, gte, lte } => {
                let mut range = doc! { "path": path.clone() };
                if let Some(upper) = lte {
                    range.insert("lte", bson::DateTime::from_chrono(*upper));
                }
                if let Some(lower) = gte {
                    range.insert("gte", bson::DateTime::from_chrono(*lower));
                }
                doc! { "range": range }
            }
        }
    }
}

/// The filter stage: a compound search against a named index.
///
/// `must` clauses restrict; `should` clauses only boost relevance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStage {
    pub index: String,
    pub must: Vec<Clause>,
    pub should: Vec<Clause>,
}

impl SearchStage {
    fn to_document(&self) -> Document {
        let mut compound = Document::new();
        if !self.must.is_empty() {
            compound.insert(
                "must",
                self.must.iter().map(|c| Bson::Document(c.to_document())).collect::<Vec<_>>(),
            );
        }
        if !self.should.is_empty() {
            compound.insert(
                "should",
                self.should.iter().map(|c| Bson::Document(c.to_document())).collect::<Vec<_>>(),
            );
        }
        doc! { "$search": { "index": self.index.clone(), "compound": compound } }
    }
}

/// One stage of the sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Search(SearchStage),
    Sort(SortSpec),
    Limit(u32),
    Skip(u64),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Search(_) => "$search",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Skip(_) => "$skip",
        }
    }

    /// MongoDB aggregation document for this stage
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Search(search) => search.to_document(),
            Stage::Sort(spec) => doc! { "$sort": spec.to_document() },
            Stage::Limit(n) => doc! { "$limit": i64::from(*n) },
            Stage::Skip(n) => doc! { "$skip": i64::try_from(*n).unwrap_or(i64::MAX) },
        }
    }
}

/// An ordered stage sequence, executed by the store as one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The leading filter stage, if one was emitted
    pub fn filter_stage(&self) -> Option<&SearchStage> {
        self.stages.iter().find_map(|s| match s {
            Stage::Search(search) => Some(search),
            _ => None,
        })
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.stages.iter().find_map(|s| match s {
            Stage::Sort(spec) => Some(spec),
            _ => None,
        })
    }

    pub fn limit(&self) -> Option<u32> {
        self.stages.iter().find_map(|s| match s {
            Stage::Limit(n) => Some(*n),
            _ => None,
        })
    }

    pub fn skip(&self) -> Option<u64> {
        self.stages.iter().find_map(|s| match s {
            Stage::Skip(n) => Some(*n),
            _ => None,
        })
    }

    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }

    /// Relaxed extended JSON, for explain output
    pub fn to_json(&self) -> serde_json::Value {
        Bson::Array(self.to_documents().into_iter().map(Bson::Document).collect())
            .into_relaxed_extjson()
    }
}
