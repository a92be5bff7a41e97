//! JWT token codec for access and refresh tokens
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - Access and refresh tokens use different secrets, and each token also
//!   carries its kind; verifying a token as the other kind always fails
//! - Expiry is checked against the system clock with no leeway: a token is
//!   expired from the second `exp` is reached

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::config::{AuthConfig, MIN_SECRET_LEN};
use crate::types::GatewayError;

/// Which secret and lifetime a token is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Identity embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// User ID (hex ObjectId)
    pub subject_id: String,
    /// Username shown to other users
    pub display_name: String,
}

impl IdentityClaim {
    pub fn new(subject_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Payload stored in the JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Token kind
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl TokenClaims {
    pub fn identity(&self) -> IdentityClaim {
        IdentityClaim::new(self.sub.clone(), self.name.clone())
    }
}

/// Outcome of verifying a token. Never an error type: malformed input is `Invalid`.
#[derive(Debug, Clone)]
pub enum TokenVerification {
    Valid(TokenClaims),
    /// Signature checked out but `exp` has passed
    Expired,
    /// Bad signature, wrong kind, or not a token at all
    Invalid,
}

impl TokenVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenVerification::Valid(_))
    }
}

/// A freshly minted token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

#[derive(Clone)]
struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

/// Signs and verifies access and refresh tokens
#[derive(Clone)]
pub struct TokenCodec {
    access: KindKeys,
    refresh: KindKeys,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec from the explicit auth configuration
    ///
    /// Returns an error if either secret is too short or both are equal
    pub fn new(config: &AuthConfig) -> Result<Self, GatewayError> {
        if config.access_secret.len() < MIN_SECRET_LEN
            || config.refresh_secret.len() < MIN_SECRET_LEN
        {
            return Err(GatewayError::Config(format!(
                "token secrets must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        if config.access_secret == config.refresh_secret {
            return Err(GatewayError::Config(
                "access and refresh secrets must differ".into(),
            ));
        }

        // Expiry is checked by hand so that `exp == now` counts as expired
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            access: KindKeys {
                encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
                ttl: config.access_ttl,
            },
            refresh: KindKeys {
                encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
                ttl: config.refresh_ttl,
            },
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Configured lifetime for a token kind
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// Issue a token of `kind` with the configured lifetime
    pub fn issue(&self, claim: &IdentityClaim, kind: TokenKind) -> Result<IssuedToken, GatewayError> {
        self.issue_at(claim, kind, self.ttl(kind), unix_now()?)
    }

    /// Issue a token with an explicit lifetime and issue time
    pub fn issue_at(
        &self,
        claim: &IdentityClaim,
        kind: TokenKind,
        ttl: Duration,
        issued_at: u64,
    ) -> Result<IssuedToken, GatewayError> {
        let expires_at = issued_at.checked_add(ttl.as_secs()).ok_or_else(|| {
            GatewayError::Internal(format!("{} token lifetime overflows expiry", kind))
        })?;
        let claims = TokenClaims {
            sub: claim.subject_id.clone(),
            name: claim.display_name.clone(),
            kind,
            iat: issued_at,
            exp: expires_at,
        };

        let token = encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(|e| GatewayError::Internal(format!("Failed to sign {} token: {}", kind, e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token as `kind` against the current time
    pub fn verify(&self, token: &str, kind: TokenKind) -> TokenVerification {
        match unix_now() {
            Ok(now) => self.verify_at(token, kind, now),
            Err(_) => TokenVerification::Invalid,
        }
    }

    /// Verify a token as `kind` at a given Unix time
    pub fn verify_at(&self, token: &str, kind: TokenKind, now: u64) -> TokenVerification {
        let data = match decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation) {
            Ok(data) => data,
            Err(err) => {
                debug!(kind = %kind, error = ?err.kind(), "Token rejected");
                return TokenVerification::Invalid;
            }
        };

        if data.claims.kind != kind {
            return TokenVerification::Invalid;
        }
        if now >= data.claims.exp {
            return TokenVerification::Expired;
        }

        TokenVerification::Valid(data.claims)
    }
}

/// Current Unix time in seconds
pub fn unix_now() -> Result<u64, GatewayError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| GatewayError::Internal(format!("System time error: {}", e)))
}

/// Extract the token from an `Authorization: Bearer <token>` value.
/// The scheme is matched case-insensitively; anything else yields `None`.
pub fn extract_token_from_header(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty() && !token.contains(' ')).then_some(token)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::cookie::{CookiePolicy, SameSite};

    pub(crate) fn test_config() -> AuthConfig {
        AuthConfig {
            access_secret: "test-access-secret-that-is-at-least-32-chars".into(),
            refresh_secret: "test-refresh-secret-that-is-at-least-32-chars".into(),
            access_ttl: Duration::from_secs(60),
            refresh_ttl: Duration::from_secs(3600),
            cookie: CookiePolicy {
                secure: true,
                same_site: SameSite::Strict,
                max_age: Duration::from_secs(3600),
            },
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&test_config()).unwrap()
    }

    fn alice() -> IdentityClaim {
        IdentityClaim::new("65a1f0c2e4b0a1b2c3d4e5f6", "alice")
    }

    #[test]
    fn test_issue_and_verify() {
        let codec = codec();
        let issued = codec.issue(&alice(), TokenKind::Access).unwrap();

        match codec.verify(&issued.token, TokenKind::Access) {
            TokenVerification::Valid(claims) => {
                assert_eq!(claims.identity(), alice());
                assert_eq!(claims.exp, issued.expires_at);
                assert_eq!(claims.exp - claims.iat, 60);
            }
            other => panic!("expected valid token, got {:?}", other),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let issued = codec
            .issue_at(&alice(), TokenKind::Access, Duration::from_secs(60), 1_000)
            .unwrap();

        assert!(codec.verify_at(&issued.token, TokenKind::Access, 1_059).is_valid());
        assert!(matches!(
            codec.verify_at(&issued.token, TokenKind::Access, 1_060),
            TokenVerification::Expired
        ));
        assert!(matches!(
            codec.verify_at(&issued.token, TokenKind::Access, 5_000),
            TokenVerification::Expired
        ));
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let codec = codec();
        let access = codec.issue(&alice(), TokenKind::Access).unwrap();
        let refresh = codec.issue(&alice(), TokenKind::Refresh).unwrap();

        assert!(matches!(
            codec.verify(&refresh.token, TokenKind::Access),
            TokenVerification::Invalid
        ));
        assert!(matches!(
            codec.verify(&access.token, TokenKind::Refresh),
            TokenVerification::Invalid
        ));
    }

    #[test]
    fn test_kind_claim_checked_even_with_shared_key() {
        // A refresh-kind payload signed with the access secret must still be rejected
        let codec = codec();
        let config = test_config();
        let claims = TokenClaims {
            sub: "x".into(),
            name: "x".into(),
            kind: TokenKind::Refresh,
            iat: unix_now().unwrap(),
            exp: unix_now().unwrap() + 60,
        };
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            codec.verify(&forged, TokenKind::Access),
            TokenVerification::Invalid
        ));
    }

    #[test]
    fn test_malformed_input_is_invalid() {
        let codec = codec();
        for input in ["", "not-a-token", "a.b.c", "Bearer xyz"] {
            assert!(matches!(
                codec.verify(input, TokenKind::Access),
                TokenVerification::Invalid
            ));
        }
    }

    #[test]
    fn test_wrong_secret() {
        let other = TokenCodec::new(&AuthConfig {
            access_secret: "another-access-secret-at-least-32-characters".into(),
            ..test_config()
        })
        .unwrap();
        let issued = other.issue(&alice(), TokenKind::Access).unwrap();

        assert!(matches!(
            codec().verify(&issued.token, TokenKind::Access),
            TokenVerification::Invalid
        ));
    }

    #[test]
    fn test_expired_with_wrong_secret_is_invalid() {
        let other = TokenCodec::new(&AuthConfig {
            access_secret: "another-access-secret-at-least-32-characters".into(),
            ..test_config()
        })
        .unwrap();
        let issued = other
            .issue_at(&alice(), TokenKind::Access, Duration::from_secs(1), 1_000)
            .unwrap();

        assert!(matches!(
            codec().verify(&issued.token, TokenKind::Access),
            TokenVerification::Invalid
        ));
    }

    #[test]
    fn test_secret_validation() {
        assert!(TokenCodec::new(&AuthConfig {
            access_secret: "short".into(),
            ..test_config()
        })
        .is_err());

        let config = test_config();
        assert!(TokenCodec::new(&AuthConfig {
            refresh_secret: config.access_secret.clone(),
            ..config
        })
        .is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_token_from_header("bearer abc123"), Some("abc123"));
        assert_eq!(extract_token_from_header("BEARER  abc123 "), Some("abc123"));
        assert_eq!(extract_token_from_header("abc123"), None);
        assert_eq!(extract_token_from_header(""), None);
        assert_eq!(extract_token_from_header("Bearer "), None);
        assert_eq!(extract_token_from_header("Bearer a b"), None);
        assert_eq!(extract_token_from_header("Basic abc123"), None);
    }

    #[test]
    fn test_issue_rejects_overflowing_lifetime() {
        let codec = TokenCodec::new(&test_config()).unwrap();
        let claim = IdentityClaim::new("a", "alice");
        let err = codec
            .issue_at(&claim, TokenKind::Refresh, Duration::from_secs(u64::MAX), 1_700_000_000)
            .unwrap_err();
        assert!(matches!(err, GatewayError::Internal(_)));
    }
}
