//! Query builder
//!
//! Translates a `SearchRequest` into the stage sequence
//! `[filter?, sort, limit, skip]`. Building never fails.

use super::request::SearchRequest;
use super::stage::{
    Clause, Pipeline, SearchStage, SortSpec, Stage, DATE_POSTED_PATH, QUOTE_PATH,
    SOURCE_TEXT_PATH,
};

/// Posts returned per request
pub const PAGE_SIZE: u32 = 20;

/// Name of the search index over the posts collection
pub const DEFAULT_SEARCH_INDEX: &str = "postsIndex";

/// Builds stage sequences against one search index
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    index: String,
    page_size: u32,
}

impl QueryBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Produce the stage sequence for a request
    pub fn build(&self, request: &SearchRequest) -> Pipeline {
        let mut stages = Vec::with_capacity(4);

        if let Some(search) = self.filter_stage(request) {
            stages.push(Stage::Search(search));
        }
        stages.push(Stage::Sort(
            request.sort.clone().unwrap_or_else(SortSpec::newest_first),
        ));
        stages.push(Stage::Limit(self.page_size));
        stages.push(Stage::Skip(request.skip.unwrap_or(0)));

        Pipeline::new(stages)
    }

    fn filter_stage(&self, request: &SearchRequest) -> Option<SearchStage> {
        if !request.has_filters() {
            return None;
        }

        let mut must = Vec::new();
        let mut should = Vec::new();

        if let Some(source) = &request.source {
            must.push(Clause::text(source.clone(), &[SOURCE_TEXT_PATH]));
        }
        if request.date_lower.is_some() || request.date_upper.is_some() {
            must.push(Clause::date_range(
                DATE_POSTED_PATH,
                request.date_lower,
                request.date_upper,
            ));
        }
        if let Some(term) = &request.term {
            should.push(Clause::text(term.clone(), &[QUOTE_PATH, SOURCE_TEXT_PATH]));
        }

        Some(SearchStage {
            index: self.index.clone(),
            must,
            should,
        })
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_INDEX)
    }
}
