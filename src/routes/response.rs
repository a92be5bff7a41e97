//! Shared response builders and body parsing for route handlers

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{CONTENT_TYPE, SET_COOKIE};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::types::GatewayError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest request body accepted by any route
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

/// JSON response that also sets a cookie
pub fn json_response_with_cookie<T: Serialize>(
    status: StatusCode,
    body: &T,
    cookie: &str,
) -> Result<Response<BoxBody>, GatewayError> {
    let mut response = json_response(status, body);
    let value = hyper::header::HeaderValue::from_str(cookie)
        .map_err(|e| GatewayError::Internal(format!("Invalid cookie header: {}", e)))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}

/// Render a failure as `{code, message}`, logging at a level matching its kind
pub fn error_response(err: GatewayError) -> Response<BoxBody> {
    match &err {
        GatewayError::Storage(_) | GatewayError::Config(_) | GatewayError::Internal(_) => {
            error!(error = %err, "Request failed");
        }
        GatewayError::Forbidden(_) => warn!(code = err.code(), "Request forbidden"),
        _ => debug!(code = err.code(), "Request rejected"),
    }

    let (status, body) = err.into_status_and_body();
    json_response(status, &body)
}

/// Read and deserialize a JSON body of at most `MAX_BODY_BYTES`
pub async fn read_json_body<T, B>(body: B) -> Result<T, GatewayError>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                GatewayError::BadRequest("Request body too large".into())
            } else {
                GatewayError::BadRequest(format!("Failed to read body: {}", e))
            }
        })?;

    Ok(serde_json::from_slice(&collected.to_bytes())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        name: String,
    }

    #[tokio::test]
    async fn test_read_json_body() {
        let probe: Probe = read_json_body(Full::new(Bytes::from(r#"{"name":"x"}"#)))
            .await
            .unwrap();
        assert_eq!(probe.name, "x");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let big = vec![b' '; MAX_BODY_BYTES + 1];
        let err = read_json_body::<Probe, _>(Full::new(Bytes::from(big)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let err = read_json_body::<Probe, _>(Full::new(Bytes::from("{")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(GatewayError::MissingAccessToken);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
