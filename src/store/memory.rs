//! In-memory store backend
//!
//! Executes stage sequences directly over a vector of posts, stage by stage
//! in the order given. Text clauses match when any query token equals a token
//! of the target field (case-insensitive). A compound with only `should`
//! clauses requires at least one of them to match, as the search index does.

use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use super::{LikeOutcome, PostStore, StoreError, StoreResult, UserStore};
use crate::model::{Post, PostEdit, User};
use crate::search::{Clause, Pipeline, SearchStage, SortDirection, SortSpec, Stage};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::LockPoisoned)
}

/// In-memory posts collection
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing posts
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: RwLock::new(posts),
        }
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Post>> {
        let snapshot = read(&self.posts)?.clone();
        Ok(execute(snapshot, pipeline))
    }

    async fn find_post(&self, id: &ObjectId) -> StoreResult<Option<Post>> {
        Ok(read(&self.posts)?.iter().find(|p| &p.id == id).cloned())
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let mut posts = write(&self.posts)?;
        if posts.iter().any(|p| p.id == post.id) {
            return Err(StoreError::Duplicate("_id".to_string()));
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn update_post(&self, id: &ObjectId, edit: &PostEdit) -> StoreResult<bool> {
        let mut posts = write(&self.posts)?;
        match posts.iter_mut().find(|p| &p.id == id) {
            Some(post) => {
                edit.apply_to(post);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_post(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut posts = write(&self.posts)?;
        let len_before = posts.len();
        posts.retain(|p| &p.id != id);
        Ok(posts.len() != len_before)
    }

    async fn add_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome> {
        let mut posts = write(&self.posts)?;
        let Some(post) = posts.iter_mut().find(|p| &p.id == id) else {
            return Ok(LikeOutcome::PostMissing);
        };
        if post.is_liked_by(user) {
            return Ok(LikeOutcome::Unchanged);
        }
        post.likes.push(*user);
        Ok(LikeOutcome::Applied)
    }

    async fn remove_like(&self, id: &ObjectId, user: &ObjectId) -> StoreResult<LikeOutcome> {
        let mut posts = write(&self.posts)?;
        let Some(post) = posts.iter_mut().find(|p| &p.id == id) else {
            return Ok(LikeOutcome::PostMissing);
        };
        if !post.is_liked_by(user) {
            return Ok(LikeOutcome::Unchanged);
        }
        post.likes.retain(|u| u != user);
        Ok(LikeOutcome::Applied)
    }
}

/// In-memory users collection
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a user; posts referencing it keep the dangling reference
    pub fn remove(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut users = write(&self.users)?;
        let len_before = users.len();
        users.retain(|u| &u.id != id);
        Ok(users.len() != len_before)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?
            .iter()
            .find(|u| u.username == username_or_email || u.email == username_or_email)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        // Checked under the write lock, so concurrent registrations cannot both pass.
        let mut users = write(&self.users)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }
}

/// Run every stage in order
fn execute(mut posts: Vec<Post>, pipeline: &Pipeline) -> Vec<Post> {
    for stage in pipeline.stages() {
        match stage {
            Stage::Search(search) => posts.retain(|p| matches_search(p, search)),
            Stage::Sort(spec) => sort_posts(&mut posts, spec),
            Stage::Limit(n) => posts.truncate(*n as usize),
            Stage::Skip(n) => {
                let n = usize::try_from(*n).unwrap_or(usize::MAX).min(posts.len());
                posts.drain(..n);
            }
        }
    }
    posts
}

fn matches_search(post: &Post, search: &SearchStage) -> bool {
    if !search.must.iter().all(|c| matches_clause(post, c)) {
        return false;
    }
    if search.must.is_empty() && !search.should.is_empty() {
        return search.should.iter().any(|c| matches_clause(post, c));
    }
    true
}

fn matches_clause(post: &Post, clause: &Clause) -> bool {
    match clause {
        Clause::Text { query, paths } => {
            let wanted = tokens(query);
            paths.iter().any(|path| {
                text_field(post, path)
                    .map(|text| tokens(text).iter().any(|t| wanted.contains(t)))
                    .unwrap_or(false)
            })
        }
        Clause::Range { path, gte, lte } => match date_field(post, path) {
            Some(value) => {
                gte.map_or(true, |lower| value >= lower) && lte.map_or(true, |upper| value <= upper)
            }
            None => false,
        },
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn text_field<'a>(post: &'a Post, path: &str) -> Option<&'a str> {
    match path {
        "quote" => Some(&post.quote),
        "source.text" => Some(&post.source.text),
        "source.link" => Some(&post.source.link),
        _ => None,
    }
}

fn date_field(post: &Post, path: &str) -> Option<DateTime<Utc>> {
    match path {
        "datePosted" => Some(post.date_posted),
        _ => None,
    }
}

/// Sort key value. Variant order is the cross-type order; missing sorts first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue<'a> {
    Missing,
    Count(usize),
    Text(&'a str),
    Id([u8; 12]),
    Time(DateTime<Utc>),
}

fn sort_value<'a>(post: &'a Post, field: &str) -> SortValue<'a> {
    match field {
        "_id" => SortValue::Id(post.id.bytes()),
        "quote" => SortValue::Text(&post.quote),
        "author" => SortValue::Id(post.author.bytes()),
        "datePosted" => SortValue::Time(post.date_posted),
        "source" | "source.text" => SortValue::Text(&post.source.text),
        "source.link" => SortValue::Text(&post.source.link),
        // arrays order by length
        "likes" => SortValue::Count(post.likes.len()),
        "bookmarks" => SortValue::Count(post.bookmarks.len()),
        "comments" => SortValue::Count(post.comments.len()),
        _ => SortValue::Missing,
    }
}

/// Stable multi-key sort
fn sort_posts(posts: &mut [Post], spec: &SortSpec) {
    posts.sort_by(|a, b| {
        for key in spec.keys() {
            let ordering = sort_value(a, &key.field).cmp(&sort_value(b, &key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use crate::search::{QueryBuilder, SearchRequest};
    use chrono::{Duration, TimeZone};

    fn post(quote: &str, source: &str, days_ago: i64) -> Post {
        let mut post = Post::new(
            ObjectId::new(),
            quote.to_string(),
            Source {
                text: source.to_string(),
                link: String::new(),
            },
        );
        post.date_posted = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() - Duration::days(days_ago);
        post
    }

    fn quotes(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.quote.as_str()).collect()
    }

    #[tokio::test]
    async fn test_default_pipeline_returns_newest_first() {
        let store = InMemoryPostStore::with_posts(vec![
            post("old", "a", 10),
            post("new", "b", 1),
            post("mid", "c", 5),
        ]);
        let pipeline = QueryBuilder::default().build(&SearchRequest::default());

        let result = store.aggregate(&pipeline).await.unwrap();
        assert_eq!(quotes(&result), vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_source_must_clause_filters() {
        let store = InMemoryPostStore::with_posts(vec![
            post("one", "Jane Austen", 1),
            post("two", "Leo Tolstoy", 2),
        ]);
        let pipeline = QueryBuilder::default().build(&SearchRequest::new().with_source("austen"));

        let result = store.aggregate(&pipeline).await.unwrap();
        assert_eq!(quotes(&result), vec!["one"]);
    }

    #[tokio::test]
    async fn test_term_alone_must_match_somewhere() {
        let store = InMemoryPostStore::with_posts(vec![
            post("all you need is love", "Beatles", 1),
            post("to be or not to be", "Shakespeare", 2),
            post("anything", "Love Actually", 3),
        ]);
        let pipeline = QueryBuilder::default().build(&SearchRequest::new().with_term("love"));

        let result = store.aggregate(&pipeline).await.unwrap();
        assert_eq!(quotes(&result), vec!["all you need is love", "anything"]);
    }

    #[tokio::test]
    async fn test_term_does_not_restrict_when_must_present() {
        let store = InMemoryPostStore::with_posts(vec![
            post("war and peace", "Tolstoy", 1),
            post("anna karenina", "Tolstoy", 2),
        ]);
        let request = SearchRequest::new().with_source("Tolstoy").with_term("war");
        let pipeline = QueryBuilder::default().build(&request);

        let result = store.aggregate(&pipeline).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive_and_one_sided() {
        let posts = vec![post("a", "s", 1), post("b", "s", 5), post("c", "s", 9)];
        let boundary = posts[1].date_posted;
        let store = InMemoryPostStore::with_posts(posts);

        let after = QueryBuilder::default().build(&SearchRequest::new().posted_after(boundary));
        assert_eq!(quotes(&store.aggregate(&after).await.unwrap()), vec!["a", "b"]);

        let before = QueryBuilder::default().build(&SearchRequest::new().posted_before(boundary));
        assert_eq!(quotes(&store.aggregate(&before).await.unwrap()), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_limit_applies_before_skip() {
        let posts: Vec<Post> = (0..25).map(|i| post(&format!("q{}", i), "s", i)).collect();
        let store = InMemoryPostStore::with_posts(posts);

        let pipeline = QueryBuilder::default().build(&SearchRequest::new().skipping(5));
        let result = store.aggregate(&pipeline).await.unwrap();

        // 20 newest, then the first 5 of those dropped
        assert_eq!(result.len(), 15);
        assert_eq!(result[0].quote, "q5");
    }

    #[tokio::test]
    async fn test_multi_key_sort() {
        let mut a = post("a", "s", 3);
        a.likes.push(ObjectId::new());
        let b = post("b", "s", 1);
        let mut c = post("c", "s", 2);
        c.likes.push(ObjectId::new());
        let store = InMemoryPostStore::with_posts(vec![a, b, c]);

        let sort = SortSpec::desc("likes").then("datePosted", SortDirection::Desc);
        let pipeline = QueryBuilder::default().build(&SearchRequest::new().sorted_by(sort));
        let result = store.aggregate(&pipeline).await.unwrap();

        assert_eq!(quotes(&result), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_like_outcomes() {
        let p = post("q", "s", 1);
        let id = p.id;
        let store = InMemoryPostStore::with_posts(vec![p]);
        let user = ObjectId::new();

        assert_eq!(store.add_like(&id, &user).await.unwrap(), LikeOutcome::Applied);
        assert_eq!(store.add_like(&id, &user).await.unwrap(), LikeOutcome::Unchanged);
        assert_eq!(store.find_post(&id).await.unwrap().unwrap().likes, vec![user]);

        assert_eq!(store.remove_like(&id, &user).await.unwrap(), LikeOutcome::Applied);
        assert_eq!(store.remove_like(&id, &user).await.unwrap(), LikeOutcome::Unchanged);
        assert_eq!(
            store.add_like(&ObjectId::new(), &user).await.unwrap(),
            LikeOutcome::PostMissing
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_report_missing() {
        let store = InMemoryPostStore::new();
        let missing = ObjectId::new();

        assert!(!store.update_post(&missing, &PostEdit::default()).await.unwrap());
        assert!(!store.delete_post(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = InMemoryUserStore::new();
        store
            .insert_user(&User::new("alice".into(), "a@example.com".into(), "h".into()))
            .await
            .unwrap();

        let same_email = User::new("other".into(), "a@example.com".into(), "h".into());
        assert!(matches!(
            store.insert_user(&same_email).await,
            Err(StoreError::Duplicate(field)) if field == "email"
        ));

        let same_name = User::new("alice".into(), "b@example.com".into(), "h".into());
        assert!(matches!(
            store.insert_user(&same_name).await,
            Err(StoreError::Duplicate(field)) if field == "username"
        ));
    }

    #[tokio::test]
    async fn test_find_by_login_accepts_either_identifier() {
        let store = InMemoryUserStore::new();
        let user = User::new("alice".into(), "a@example.com".into(), "h".into());
        store.insert_user(&user).await.unwrap();

        assert_eq!(store.find_by_login("alice").await.unwrap().unwrap().id, user.id);
        assert_eq!(store.find_by_login("a@example.com").await.unwrap().unwrap().id, user.id);
        assert!(store.find_by_login("bob").await.unwrap().is_none());
    }
}
