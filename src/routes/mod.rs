//! HTTP routes for Wicket

pub mod auth_routes;
pub mod health;
pub mod posts;
pub mod response;

pub use auth_routes::handle_auth_request;
pub use health::{health_check, version_info};
pub use posts::handle_board_request;
pub use response::{error_response, BoxBody, MAX_BODY_BYTES};
