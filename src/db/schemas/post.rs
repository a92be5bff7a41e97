//! Board post document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for board posts
pub const POST_COLLECTION: &str = "boards";

/// Board post stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata; `created_at` is the post's creation time
    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    pub content: String,

    /// User who created the post; only they may change or delete it
    pub author_id: ObjectId,

    pub category: String,
}

impl PostDoc {
    /// Create a new post owned by `author_id`
    pub fn new(title: String, content: String, author_id: ObjectId, category: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            title,
            content,
            author_id,
            category,
        }
    }

    /// Owner ID in the form carried by identity claims
    pub fn owner_id(&self) -> String {
        self.author_id.to_hex()
    }

    pub fn id_hex(&self) -> Option<String> {
        self._id.map(|id| id.to_hex())
    }

    /// JSON representation returned to clients
    pub fn to_view(&self) -> PostView {
        PostView {
            id: self.id_hex().unwrap_or_default(),
            title: self.title.clone(),
            content: self.content.clone(),
            author_id: self.owner_id(),
            category: self.category.clone(),
            created_at: self.metadata.created_at.map(rfc3339),
            updated_at: self.metadata.updated_at.map(rfc3339),
        }
    }
}

fn rfc3339(ts: DateTime) -> String {
    ts.to_chrono().to_rfc3339()
}

/// Post as returned by the API
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Listing sorts newest first, optionally filtered by category
            (
                doc! { "category": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("category_created_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_uses_hex_ids() {
        let author = ObjectId::new();
        let mut post = PostDoc::new("t".into(), "c".into(), author, "notice".into());
        let id = ObjectId::new();
        post._id = Some(id);

        let view = post.to_view();
        assert_eq!(view.id, id.to_hex());
        assert_eq!(view.author_id, author.to_hex());
        assert!(view.created_at.is_some());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["authorId"], author.to_hex());
    }
}
