//! Storage seams for users and board posts
//!
//! Handlers only see the `UserStore` and `PostStore` traits. The MongoDB
//! adapters back production; the in-memory adapters back dev mode when
//! MongoDB is unreachable, and the test suite.

pub mod memory;
pub mod mongo;

use bson::oid::ObjectId;

use crate::db::schemas::{PostDoc, UserDoc};
use crate::types::GatewayError;

pub use memory::{MemoryPostStore, MemoryUserStore};
pub use mongo::{MongoPostStore, MongoUserStore};

/// Default number of posts per page
pub const DEFAULT_PAGE_SIZE: u64 = 6;

/// Upper bound on the page size a client may request
pub const MAX_PAGE_SIZE: u64 = 100;

/// Account lookup and creation
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Find a live user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, GatewayError>;

    /// Insert a new user and return it with its assigned ID
    ///
    /// Fails with `EmailExists` if the email is already taken.
    async fn insert(&self, user: UserDoc) -> Result<UserDoc, GatewayError>;
}

/// Board post persistence
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<PostDoc>, GatewayError>;

    /// One page of posts, newest first, plus the total matching count
    async fn list(&self, query: &PostQuery) -> Result<PostPage, GatewayError>;

    async fn insert(&self, post: PostDoc) -> Result<PostDoc, GatewayError>;

    /// Apply the given changes; `None` if the post does not exist
    async fn update(
        &self,
        id: &ObjectId,
        changes: &PostChanges,
    ) -> Result<Option<PostDoc>, GatewayError>;

    /// Delete a post; `false` if it did not exist
    async fn delete(&self, id: &ObjectId) -> Result<bool, GatewayError>;
}

/// Paging and filter parameters for listing posts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    /// 1-based page number
    pub page: u64,
    pub size: u64,
    /// Restrict to one category; `None` lists every category
    pub category: Option<String>,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            category: None,
        }
    }
}

impl PostQuery {
    /// Build a query from raw client values, clamping out-of-range input
    pub fn new(page: Option<u64>, size: Option<u64>, category: Option<String>) -> Self {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));

        Self {
            page: page.unwrap_or(1).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            category,
        }
    }

    /// Number of posts to skip
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

/// A page of posts
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostDoc>,
    pub total: u64,
}

/// Partial update of a post; `None` fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category.is_none()
    }

    /// Apply the changes to an in-memory document
    pub fn apply_to(&self, post: &mut PostDoc) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(category) = &self.category {
            post.category = category.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let q = PostQuery::new(None, None, None);
        assert_eq!(q, PostQuery::default());
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_query_clamps_input() {
        let q = PostQuery::new(Some(0), Some(10_000), Some("all".into()));
        assert_eq!(q.page, 1);
        assert_eq!(q.size, MAX_PAGE_SIZE);
        assert_eq!(q.category, None);

        let q = PostQuery::new(Some(3), Some(0), Some(" notice ".into()));
        assert_eq!(q.size, 1);
        assert_eq!(q.offset(), 2);
        assert_eq!(q.category.as_deref(), Some("notice"));
    }
}
