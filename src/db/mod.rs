//! Database layer for Wicket
//!
//! MongoDB storage for users and board posts.

pub mod mongo;
pub mod schemas;

pub use mongo::{redact_uri, MongoClient, MongoCollection};
pub use schemas::{Metadata, PostDoc, UserDoc};
