//! Per-request authentication gate
//!
//! The guard is a small state machine over the inbound credentials:
//!
//! | State                           | Outcome                            |
//! |---------------------------------|------------------------------------|
//! | no access token                 | reject `MissingAccessToken`        |
//! | valid access token              | proceed with its claim             |
//! | expired access, no cookie       | reject `MissingRefreshToken`       |
//! | expired access, bad cookie      | reject `InvalidRefreshToken`       |
//! | expired access, good cookie     | renew, proceed with refresh claim  |
//! | invalid access token            | reject `InvalidAccessToken`        |
//!
//! The refresh cookie is only read in the expired-access branch.

use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use hyper::Response;
use std::sync::Arc;
use tracing::debug;

use crate::auth::cookie::refresh_token_from_headers;
use crate::auth::jwt::{
    extract_token_from_header, unix_now, IdentityClaim, IssuedToken, TokenKind, TokenVerification,
};
use crate::auth::session::SessionIssuer;
use crate::types::GatewayError;

/// Where the guard ended up for one request
#[derive(Debug)]
enum GuardState {
    NoToken,
    ValidAccess(IdentityClaim),
    ExpiredAccess,
    InvalidAccess,
}

/// Authenticated identity for one request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claim: IdentityClaim,
    /// Access token minted during this request, if the presented one had expired
    pub renewed: Option<IssuedToken>,
}

impl AuthContext {
    /// Surface a renewed access token on the response
    pub fn apply_renewal<B>(&self, response: &mut Response<B>) {
        let Some(renewed) = &self.renewed else {
            return;
        };
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", renewed.token)) {
            response.headers_mut().insert(AUTHORIZATION, value);
        }
    }
}

/// Gate for protected routes
#[derive(Clone)]
pub struct AuthGuard {
    issuer: Arc<SessionIssuer>,
}

impl AuthGuard {
    pub fn new(issuer: Arc<SessionIssuer>) -> Self {
        Self { issuer }
    }

    /// Authenticate a request from its headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, GatewayError> {
        // A header that is present but not `Bearer <token>` counts as an invalid token
        let access = match headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => Some(
                value
                    .to_str()
                    .ok()
                    .and_then(extract_token_from_header)
                    .ok_or(GatewayError::InvalidAccessToken)?,
            ),
        };

        self.evaluate(access, || refresh_token_from_headers(headers), unix_now()?)
    }

    /// Run the state machine at time `now`
    ///
    /// `refresh` is called at most once, and only when the access token has expired.
    pub fn evaluate<'a>(
        &self,
        access: Option<&str>,
        refresh: impl FnOnce() -> Option<&'a str>,
        now: u64,
    ) -> Result<AuthContext, GatewayError> {
        match self.classify(access, now) {
            GuardState::NoToken => Err(GatewayError::MissingAccessToken),
            GuardState::ValidAccess(claim) => Ok(AuthContext {
                claim,
                renewed: None,
            }),
            GuardState::InvalidAccess => Err(GatewayError::InvalidAccessToken),
            GuardState::ExpiredAccess => {
                debug!("Access token expired, attempting renewal");
                let (claim, renewed) = self.issuer.renew_at(refresh(), now)?;
                Ok(AuthContext {
                    claim,
                    renewed: Some(renewed),
                })
            }
        }
    }

    fn classify(&self, access: Option<&str>, now: u64) -> GuardState {
        let Some(token) = access else {
            return GuardState::NoToken;
        };

        match self.issuer.codec().verify_at(token, TokenKind::Access, now) {
            TokenVerification::Valid(claims) => GuardState::ValidAccess(claims.identity()),
            TokenVerification::Expired => GuardState::ExpiredAccess,
            TokenVerification::Invalid => GuardState::InvalidAccess,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::test_config;
    use crate::store::MemoryUserStore;
    use std::cell::Cell;
    use std::time::Duration;

    const T0: u64 = 1_700_000_000;

    fn guard() -> AuthGuard {
        let issuer = SessionIssuer::new(&test_config(), Arc::new(MemoryUserStore::new())).unwrap();
        AuthGuard::new(Arc::new(issuer))
    }

    fn claim(id: &str) -> IdentityClaim {
        IdentityClaim::new(id, format!("user-{id}"))
    }

    fn token(guard: &AuthGuard, who: &IdentityClaim, kind: TokenKind, ttl: u64, at: u64) -> String {
        guard
            .issuer
            .codec()
            .issue_at(who, kind, Duration::from_secs(ttl), at)
            .unwrap()
            .token
    }

    #[test]
    fn test_missing_access_token() {
        let guard = guard();
        let err = guard.evaluate(None, || None, T0).unwrap_err();
        assert!(matches!(err, GatewayError::MissingAccessToken));
    }

    #[test]
    fn test_valid_access_never_reads_cookie() {
        let guard = guard();
        let alice = claim("a");
        let access = token(&guard, &alice, TokenKind::Access, 60, T0);
        let consulted = Cell::new(false);

        let ctx = guard
            .evaluate(
                Some(&access),
                || {
                    consulted.set(true);
                    None
                },
                T0 + 10,
            )
            .unwrap();

        assert_eq!(ctx.claim, alice);
        assert!(ctx.renewed.is_none());
        assert!(!consulted.get());
    }

    #[test]
    fn test_expired_access_renews_with_refresh_identity() {
        let guard = guard();
        let alice = claim("a");
        let access = token(&guard, &alice, TokenKind::Access, 60, T0);
        let refresh = token(&guard, &alice, TokenKind::Refresh, 3600, T0);
        let now = T0 + 120;

        let ctx = guard
            .evaluate(Some(&access), || Some(refresh.as_str()), now)
            .unwrap();
        assert_eq!(ctx.claim, alice);

        let renewed = ctx.renewed.unwrap();
        assert_eq!(renewed.expires_at, now + 60);
        match guard
            .issuer
            .codec()
            .verify_at(&renewed.token, TokenKind::Access, now)
        {
            TokenVerification::Valid(claims) => assert_eq!(claims.identity(), alice),
            other => panic!("renewed token should verify, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_access_without_cookie() {
        let guard = guard();
        let access = token(&guard, &claim("a"), TokenKind::Access, 60, T0);
        let err = guard.evaluate(Some(&access), || None, T0 + 60).unwrap_err();
        assert!(matches!(err, GatewayError::MissingRefreshToken));
    }

    #[test]
    fn test_expired_access_with_bad_cookie() {
        let guard = guard();
        let alice = claim("a");
        let access = token(&guard, &alice, TokenKind::Access, 60, T0);
        // An access token in the cookie slot is the wrong kind
        let wrong_kind = token(&guard, &alice, TokenKind::Access, 3600, T0);
        let expired_refresh = token(&guard, &alice, TokenKind::Refresh, 100, T0);

        for cookie in ["garbage", wrong_kind.as_str(), expired_refresh.as_str()] {
            let err = guard
                .evaluate(Some(&access), || Some(cookie), T0 + 200)
                .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidRefreshToken));
        }
    }

    #[test]
    fn test_invalid_access_never_renews() {
        let guard = guard();
        let alice = claim("a");
        let refresh = token(&guard, &alice, TokenKind::Refresh, 3600, T0);
        let consulted = Cell::new(false);

        for bad in ["not-a-jwt", refresh.as_str()] {
            let err = guard
                .evaluate(
                    Some(bad),
                    || {
                        consulted.set(true);
                        Some(refresh.as_str())
                    },
                    T0,
                )
                .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidAccessToken));
        }
        assert!(!consulted.get());
    }

    #[test]
    fn test_authorization_header_scheme() {
        let guard = guard();
        let alice = claim("a");
        let access = token(&guard, &alice, TokenKind::Access, 3600, unix_now().unwrap());

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("bearer {}", access)).unwrap(),
        );
        assert_eq!(guard.authenticate(&headers).unwrap().claim, alice);

        let malformed = [
            HeaderValue::from_str(&access).unwrap(),
            HeaderValue::from_static("Basic abc123"),
            HeaderValue::from_static("Bearer "),
            HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
        ];
        for value in malformed {
            headers.insert(AUTHORIZATION, value);
            let err = guard.authenticate(&headers).unwrap_err();
            assert!(matches!(err, GatewayError::InvalidAccessToken));
        }

        let err = guard.authenticate(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, GatewayError::MissingAccessToken));
    }

    #[test]
    fn test_apply_renewal_header() {
        let ctx = AuthContext {
            claim: claim("a"),
            renewed: Some(IssuedToken {
                token: "abc.def.ghi".into(),
                expires_at: 0,
            }),
        };
        let mut response = Response::new(());
        ctx.apply_renewal(&mut response);
        assert_eq!(
            response.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc.def.ghi"
        );
    }
}
