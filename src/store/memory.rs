//! In-memory stores
//!
//! Used when running in dev mode without MongoDB and by the tests. They keep
//! the same observable behavior as the MongoDB adapters: unique emails,
//! newest-first listing, soft delete.

use bson::{oid::ObjectId, DateTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Reverse;

use crate::db::schemas::{Metadata, PostDoc, UserDoc};
use crate::store::{PostChanges, PostPage, PostQuery, PostStore, UserStore};
use crate::types::GatewayError;

/// Users keyed by ID with an email index
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<ObjectId, UserDoc>,
    by_email: DashMap<String, ObjectId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, GatewayError> {
        let Some(id) = self.by_email.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self
            .users
            .get(&id)
            .map(|user| user.value().clone())
            .filter(|user| !user.metadata.is_deleted))
    }

    async fn insert(&self, mut user: UserDoc) -> Result<UserDoc, GatewayError> {
        // The email entry stays locked until the user is stored
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(GatewayError::EmailExists),
            Entry::Vacant(slot) => {
                let id = ObjectId::new();
                user._id = Some(id);
                user.metadata = Metadata::new();
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }
}

/// Posts keyed by ID
#[derive(Default)]
pub struct MemoryPostStore {
    posts: DashMap<ObjectId, PostDoc>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PostStore for MemoryPostStore {
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<PostDoc>, GatewayError> {
        Ok(self
            .posts
            .get(id)
            .map(|post| post.value().clone())
            .filter(|post| !post.metadata.is_deleted))
    }

    async fn list(&self, query: &PostQuery) -> Result<PostPage, GatewayError> {
        let mut matching: Vec<PostDoc> = self
            .posts
            .iter()
            .filter(|entry| !entry.metadata.is_deleted)
            .filter(|entry| match &query.category {
                Some(category) => &entry.category == category,
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by_key(|post| Reverse((post.metadata.created_at, post._id)));

        let total = matching.len() as u64;
        let posts = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.size as usize)
            .collect();

        Ok(PostPage { posts, total })
    }

    async fn insert(&self, mut post: PostDoc) -> Result<PostDoc, GatewayError> {
        let id = ObjectId::new();
        post._id = Some(id);
        post.metadata = Metadata::new();
        self.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn update(
        &self,
        id: &ObjectId,
        changes: &PostChanges,
    ) -> Result<Option<PostDoc>, GatewayError> {
        let Some(mut post) = self.posts.get_mut(id) else {
            return Ok(None);
        };
        if post.metadata.is_deleted {
            return Ok(None);
        }

        changes.apply_to(&mut post);
        post.metadata.touch();
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, GatewayError> {
        let Some(mut post) = self.posts.get_mut(id) else {
            return Ok(false);
        };
        if post.metadata.is_deleted {
            return Ok(false);
        }

        let now = DateTime::now();
        post.metadata.is_deleted = true;
        post.metadata.deleted_at = Some(now);
        post.metadata.updated_at = Some(now);
        Ok(true)
    }
}
