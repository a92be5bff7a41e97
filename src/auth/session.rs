//! Session issuance: login, registration, renewal and logout
//!
//! A session is an access token plus a refresh token minted together. Nothing
//! is stored server-side; validity is signature plus expiry. The refresh token
//! is handed back only as a `Set-Cookie` value, never in a JSON body.

use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::cookie::CookiePolicy;
use crate::auth::jwt::{unix_now, IdentityClaim, IssuedToken, TokenCodec, TokenKind, TokenVerification};
use crate::auth::password::{hash_password, validate_password_complexity, verify_password};
use crate::config::AuthConfig;
use crate::db::schemas::UserDoc;
use crate::store::UserStore;
use crate::types::GatewayError;

/// Login input
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration input
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Token pair issued at login or registration
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub identity: IdentityClaim,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Mints sessions and renews access tokens
pub struct SessionIssuer {
    codec: TokenCodec,
    cookie: CookiePolicy,
    users: Arc<dyn UserStore>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn require_fields(fields: &[(&str, &str)]) -> Result<(), GatewayError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::MissingFields(missing.join(", ")))
    }
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserStore>) -> Result<Self, GatewayError> {
        Ok(Self {
            codec: TokenCodec::new(config)?,
            cookie: config.cookie.clone(),
            users,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Check credentials and mint a session
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionTokens, GatewayError> {
        require_fields(&[
            ("email", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
        ])?;

        let email = normalize_email(&credentials.email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Login rejected: unknown email");
            return Err(GatewayError::CredentialsMismatch);
        };

        if !verify_password(&credentials.password, &user.password_hash)? {
            debug!(user_id = ?user.id_hex(), "Login rejected: wrong password");
            return Err(GatewayError::CredentialsMismatch);
        }

        let tokens = self.mint(&user)?;
        info!(user_id = %tokens.identity.subject_id, "User logged in");
        Ok(tokens)
    }

    /// Create an account and mint a session for it
    ///
    /// Checks run in order: required fields, confirmation match, password
    /// complexity, email uniqueness.
    pub async fn register(&self, registration: &Registration) -> Result<SessionTokens, GatewayError> {
        require_fields(&[
            ("username", registration.username.as_str()),
            ("email", registration.email.as_str()),
            ("password", registration.password.as_str()),
            ("confirmPassword", registration.confirm_password.as_str()),
        ])?;

        if registration.password != registration.confirm_password {
            return Err(GatewayError::PasswordMismatch);
        }
        validate_password_complexity(&registration.password)?;

        let email = normalize_email(&registration.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(GatewayError::EmailExists);
        }

        let password_hash = hash_password(&registration.password)?;
        let user = self
            .users
            .insert(UserDoc::new(
                registration.username.trim().to_string(),
                email,
                password_hash,
            ))
            .await?;

        let tokens = self.mint(&user)?;
        info!(user_id = %tokens.identity.subject_id, "User registered");
        Ok(tokens)
    }

    fn mint(&self, user: &UserDoc) -> Result<SessionTokens, GatewayError> {
        let identity = user
            .identity()
            .ok_or_else(|| GatewayError::Internal("stored user has no ID".into()))?;
        let now = unix_now()?;

        let access = self
            .codec
            .issue_at(&identity, TokenKind::Access, self.codec.ttl(TokenKind::Access), now)?;
        let refresh = self
            .codec
            .issue_at(&identity, TokenKind::Refresh, self.codec.ttl(TokenKind::Refresh), now)?;

        Ok(SessionTokens {
            identity,
            access,
            refresh,
        })
    }

    /// Mint a fresh access token from a refresh token
    pub fn renew(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<(IdentityClaim, IssuedToken), GatewayError> {
        self.renew_at(refresh_token, unix_now()?)
    }

    /// Renewal against an explicit clock
    ///
    /// The new access token carries the refresh token's identity and expires
    /// `access_ttl` after `now`. The refresh token itself is not rotated.
    pub fn renew_at(
        &self,
        refresh_token: Option<&str>,
        now: u64,
    ) -> Result<(IdentityClaim, IssuedToken), GatewayError> {
        let token = refresh_token.ok_or(GatewayError::MissingRefreshToken)?;

        let claims = match self.codec.verify_at(token, TokenKind::Refresh, now) {
            TokenVerification::Valid(claims) => claims,
            TokenVerification::Expired => {
                debug!("Refresh token expired");
                return Err(GatewayError::InvalidRefreshToken);
            }
            TokenVerification::Invalid => return Err(GatewayError::InvalidRefreshToken),
        };

        let identity = claims.identity();
        let access = self.codec.issue_at(
            &identity,
            TokenKind::Access,
            self.codec.ttl(TokenKind::Access),
            now,
        )?;

        debug!(user_id = %identity.subject_id, "Access token renewed");
        Ok((identity, access))
    }

    /// `Set-Cookie` value carrying a session's refresh token
    pub fn refresh_cookie(&self, tokens: &SessionTokens) -> String {
        self.cookie.refresh_cookie(&tokens.refresh.token)
    }

    /// `Set-Cookie` value that clears the refresh token. Safe to send repeatedly.
    pub fn logout_cookie(&self) -> String {
        self.cookie.cleared_refresh_cookie()
    }
}
