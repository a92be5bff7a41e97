//! Configuration for Wicket
//!
//! CLI arguments and environment variable handling using clap. `Args` is the
//! raw process configuration; `AuthConfig` is the explicit, validated subset
//! handed to the token codec and session issuer at construction.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::cookie::{CookiePolicy, SameSite};
use crate::types::GatewayError;

/// Minimum accepted length for either signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted refresh token lifetime (30 days)
pub const MAX_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

const DEV_ACCESS_SECRET: &str = "dev-only-insecure-access-secret-0123456789";
const DEV_REFRESH_SECRET: &str = "dev-only-insecure-refresh-secret-9876543210";

/// Wicket - token gateway for the board service
#[derive(Parser, Debug, Clone)]
#[command(name = "wicket")]
#[command(about = "Token gateway: short-lived access tokens, cookie renewal, owner-only mutation")]
pub struct Args {
    /// Unique identifier for this gateway instance
    #[arg(long, env = "INSTANCE_ID", default_value_t = Uuid::new_v4())]
    pub instance_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Enable development mode (dev secrets, in-memory storage fallback, non-secure cookie)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "wicket")]
    pub mongodb_db: String,

    /// Secret for signing access tokens (required in production)
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: Option<String>,

    /// Secret for signing refresh tokens (required in production, must differ from the access secret)
    #[arg(long, env = "REFRESH_TOKEN_SECRET", hide_env_values = true)]
    pub refresh_token_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value = "60")]
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_TTL_SECS", default_value = "3600")]
    pub refresh_token_ttl_secs: u64,

    /// Allowed cross-origin source (credentials are allowed for this origin only)
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Mark the refresh cookie Secure (defaults to true outside dev mode)
    #[arg(long, env = "COOKIE_SECURE")]
    pub cookie_secure: Option<bool>,

    /// SameSite policy for the refresh cookie (strict, lax, none)
    #[arg(long, env = "COOKIE_SAME_SITE", default_value = "none")]
    pub cookie_same_site: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

/// Token and cookie settings passed explicitly into the auth components
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub cookie: CookiePolicy,
}

impl Args {
    /// Get effective access secret (uses default in dev mode)
    fn effective_access_secret(&self) -> Option<String> {
        match (&self.access_token_secret, self.dev_mode) {
            (Some(s), _) => Some(s.clone()),
            (None, true) => Some(DEV_ACCESS_SECRET.to_string()),
            (None, false) => None,
        }
    }

    /// Get effective refresh secret (uses default in dev mode)
    fn effective_refresh_secret(&self) -> Option<String> {
        match (&self.refresh_token_secret, self.dev_mode) {
            (Some(s), _) => Some(s.clone()),
            (None, true) => Some(DEV_REFRESH_SECRET.to_string()),
            (None, false) => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let access = self
            .effective_access_secret()
            .ok_or("ACCESS_TOKEN_SECRET is required in production mode")?;
        let refresh = self
            .effective_refresh_secret()
            .ok_or("REFRESH_TOKEN_SECRET is required in production mode")?;

        if access.len() < MIN_SECRET_LEN {
            return Err(format!(
                "ACCESS_TOKEN_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            ));
        }
        if refresh.len() < MIN_SECRET_LEN {
            return Err(format!(
                "REFRESH_TOKEN_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            ));
        }
        if access == refresh {
            return Err("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string());
        }

        if self.access_token_ttl_secs == 0 || self.refresh_token_ttl_secs == 0 {
            return Err("Token lifetimes must be greater than zero".to_string());
        }
        if self.refresh_token_ttl_secs > MAX_REFRESH_TTL_SECS {
            return Err(format!(
                "REFRESH_TOKEN_TTL_SECS must be at most {} seconds",
                MAX_REFRESH_TTL_SECS
            ));
        }
        if self.access_token_ttl_secs >= self.refresh_token_ttl_secs {
            return Err(
                "ACCESS_TOKEN_TTL_SECS must be shorter than REFRESH_TOKEN_TTL_SECS".to_string(),
            );
        }

        self.cookie_same_site
            .parse::<SameSite>()
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Whether the refresh cookie carries the Secure attribute
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(!self.dev_mode)
    }

    /// Build the explicit auth configuration
    pub fn auth_config(&self) -> Result<AuthConfig, GatewayError> {
        self.validate().map_err(GatewayError::Config)?;

        let mut same_site = self
            .cookie_same_site
            .parse::<SameSite>()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        // Browsers drop SameSite=None cookies that are not Secure
        if same_site == SameSite::None && !self.cookie_secure() {
            same_site = SameSite::Lax;
        }

        Ok(AuthConfig {
            access_secret: self
                .effective_access_secret()
                .ok_or_else(|| GatewayError::Config("missing access secret".into()))?,
            refresh_secret: self
                .effective_refresh_secret()
                .ok_or_else(|| GatewayError::Config("missing refresh secret".into()))?,
            access_ttl: Duration::from_secs(self.access_token_ttl_secs),
            refresh_ttl: Duration::from_secs(self.refresh_token_ttl_secs),
            cookie: CookiePolicy {
                secure: self.cookie_secure(),
                same_site,
                max_age: Duration::from_secs(self.refresh_token_ttl_secs),
            },
        })
    }
}
