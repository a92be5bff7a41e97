//! Wicket - token gateway for the board service
//!
//! Wicket authenticates callers with short-lived access tokens, silently
//! renews them from a refresh token carried in an HTTP-only cookie, and lets
//! only a post's author change or delete it.
//!
//! ## Components
//!
//! - **Token codec**: HS256 access and refresh tokens with separate secrets
//! - **Session issuer**: login, registration, renewal and logout
//! - **Auth guard**: per-request gate with one-shot silent renewal
//! - **Ownership**: author-only mutation of board posts
//! - **Stores**: MongoDB adapters with in-memory fallbacks

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{dispatch, run, AppState};
pub use types::{GatewayError, Result};
