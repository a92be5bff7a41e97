//! Authentication and authorization for Wicket
//!
//! Provides:
//! - JWT access and refresh token codec
//! - Refresh cookie transport
//! - Session issuance (login, register, renew, logout)
//! - Per-request guard with silent renewal
//! - Owner-only mutation checks
//! - Password hashing with Argon2

pub mod cookie;
pub mod guard;
pub mod jwt;
pub mod ownership;
pub mod password;
pub mod session;

pub use cookie::{refresh_token_from_headers, CookiePolicy, SameSite, REFRESH_COOKIE_NAME};
pub use guard::{AuthContext, AuthGuard};
pub use jwt::{
    extract_token_from_header, IdentityClaim, IssuedToken, TokenClaims, TokenCodec, TokenKind,
    TokenVerification,
};
pub use ownership::{authorize_mutation, load_owned_post, parse_post_id};
pub use password::{hash_password, validate_password_complexity, verify_password};
pub use session::{Credentials, Registration, SessionIssuer, SessionTokens};
