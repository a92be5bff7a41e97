//! MongoDB-backed stores

use bson::{doc, oid::ObjectId, DateTime, Document};
use tracing::debug;

use crate::db::mongo::is_duplicate_key_message;
use crate::db::schemas::{PostDoc, UserDoc, POST_COLLECTION, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::store::{PostChanges, PostPage, PostQuery, PostStore, UserStore};
use crate::types::GatewayError;

/// Users collection adapter
pub struct MongoUserStore {
    users: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    /// Open the users collection, creating the unique email index
    pub async fn new(mongo: &MongoClient) -> Result<Self, GatewayError> {
        Ok(Self {
            users: mongo.collection::<UserDoc>(USER_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, GatewayError> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn insert(&self, mut user: UserDoc) -> Result<UserDoc, GatewayError> {
        match self.users.insert_one(user.clone()).await {
            Ok(id) => {
                user._id = Some(id);
                Ok(user)
            }
            Err(GatewayError::Storage(msg)) if is_duplicate_key_message(&msg) => {
                debug!("Duplicate email rejected by unique index");
                Err(GatewayError::EmailExists)
            }
            Err(e) => Err(e),
        }
    }
}

/// Boards collection adapter
pub struct MongoPostStore {
    posts: MongoCollection<PostDoc>,
}

impl MongoPostStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self, GatewayError> {
        Ok(Self {
            posts: mongo.collection::<PostDoc>(POST_COLLECTION).await?,
        })
    }
}

fn live_post_filter(id: &ObjectId) -> Document {
    doc! { "_id": *id, "metadata.is_deleted": { "$ne": true } }
}

#[async_trait::async_trait]
impl PostStore for MongoPostStore {
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<PostDoc>, GatewayError> {
        self.posts.find_one(doc! { "_id": *id }).await
    }

    async fn list(&self, query: &PostQuery) -> Result<PostPage, GatewayError> {
        let filter = match &query.category {
            Some(category) => doc! { "category": category.as_str() },
            None => doc! {},
        };

        let total = self.posts.count(filter.clone()).await?;
        let posts = self
            .posts
            .find_page(
                filter,
                doc! { "metadata.created_at": -1, "_id": -1 },
                query.offset(),
                query.size as i64,
            )
            .await?;

        Ok(PostPage { posts, total })
    }

    async fn insert(&self, mut post: PostDoc) -> Result<PostDoc, GatewayError> {
        let id = self.posts.insert_one(post.clone()).await?;
        post._id = Some(id);
        Ok(post)
    }

    async fn update(
        &self,
        id: &ObjectId,
        changes: &PostChanges,
    ) -> Result<Option<PostDoc>, GatewayError> {
        let mut set = doc! { "metadata.updated_at": DateTime::now() };
        if let Some(title) = &changes.title {
            set.insert("title", title.clone());
        }
        if let Some(content) = &changes.content {
            set.insert("content", content.clone());
        }
        if let Some(category) = &changes.category {
            set.insert("category", category.clone());
        }

        let result = self
            .posts
            .update_one(live_post_filter(id), doc! { "$set": set })
            .await?;
        if result.matched_count == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, GatewayError> {
        let result = self.posts.soft_delete(live_post_filter(id)).await?;
        Ok(result.matched_count > 0)
    }
}
