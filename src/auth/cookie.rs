//! Refresh-token cookie transport
//!
//! The refresh token only ever travels in an HTTP-only cookie. This module
//! formats the `Set-Cookie` values the issuer emits and reads the token back
//! out of inbound `Cookie` headers.

use hyper::header::{HeaderMap, COOKIE};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// SameSite attribute for the refresh cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown SameSite policy '{0}' (expected strict, lax or none)")]
pub struct UnknownSameSite(String);

impl FromStr for SameSite {
    type Err = UnknownSameSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(UnknownSameSite(other.to_string())),
        }
    }
}

/// Attributes applied to every refresh cookie
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Duration,
}

impl CookiePolicy {
    /// `Set-Cookie` value delivering a refresh token
    pub fn refresh_cookie(&self, token: &str) -> String {
        self.format(token, self.max_age.as_secs(), None)
    }

    /// `Set-Cookie` value clearing the refresh token
    pub fn cleared_refresh_cookie(&self) -> String {
        self.format("", 0, Some("Thu, 01 Jan 1970 00:00:00 GMT"))
    }

    fn format(&self, value: &str, max_age: u64, expires: Option<&str>) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; Max-Age={}",
            REFRESH_COOKIE_NAME, value, max_age
        );
        if let Some(expires) = expires {
            cookie.push_str("; Expires=");
            cookie.push_str(expires);
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(&self.same_site.to_string());
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Extract a named cookie value from a `Cookie` header value
pub fn get_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Read the refresh token from the cookie channel only
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| get_cookie(v, REFRESH_COOKIE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, AUTHORIZATION};

    fn policy(secure: bool, same_site: SameSite) -> CookiePolicy {
        CookiePolicy {
            secure,
            same_site,
            max_age: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = policy(true, SameSite::None).refresh_cookie("abc.def.ghi");
        assert!(cookie.starts_with("refreshToken=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_insecure_cookie_in_dev() {
        let cookie = policy(false, SameSite::Lax).refresh_cookie("t");
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_cleared_cookie() {
        let cookie = policy(true, SameSite::Strict).cleared_refresh_cookie();
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970"));
    }

    #[test]
    fn test_get_cookie() {
        let header = "theme=dark; refreshToken=tok123; other=1";
        assert_eq!(get_cookie(header, "refreshToken"), Some("tok123"));
        assert_eq!(get_cookie(header, "missing"), None);
        assert_eq!(get_cookie("refreshToken=", "refreshToken"), None);
        assert_eq!(get_cookie("xrefreshToken=a", "refreshToken"), None);
    }

    #[test]
    fn test_refresh_token_only_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok123"));
        assert_eq!(refresh_token_from_headers(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("refreshToken=tok456"));
        assert_eq!(refresh_token_from_headers(&headers), Some("tok456"));
    }

    #[test]
    fn test_same_site_parse() {
        assert_eq!("STRICT".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert_eq!("none".parse::<SameSite>().unwrap(), SameSite::None);
        assert!("maybe".parse::<SameSite>().is_err());
    }
}
