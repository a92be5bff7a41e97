//! Database schemas for Wicket
//!
//! Defines MongoDB document structures for users and board posts.

mod metadata;
mod post;
mod user;

pub use metadata::Metadata;
pub use post::{PostDoc, PostView, POST_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
