//! User document schema
//!
//! Stores account credentials. The email is the unique lookup key; the
//! document ID becomes the token subject.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::IdentityClaim;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub username: String,

    /// Login identifier, unique across users
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            username,
            email,
            password_hash,
        }
    }

    /// Hex form of the document ID, if persisted
    pub fn id_hex(&self) -> Option<String> {
        self._id.map(|id| id.to_hex())
    }

    /// Identity claim carried by this user's tokens
    pub fn identity(&self) -> Option<IdentityClaim> {
        self.id_hex()
            .map(|id| IdentityClaim::new(id, self.username.clone()))
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
