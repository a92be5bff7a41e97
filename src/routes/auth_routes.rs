//! HTTP Routes for Authentication
//!
//! - POST /auth/register - Create an account, returns an access token
//! - POST /auth/login    - Authenticate, returns an access token
//! - POST /auth/logout   - Clear the refresh cookie
//! - POST /auth/token    - Mint an access token from the refresh cookie
//! - GET  /auth/me       - Identity behind the current access token
//!
//! Login and registration set the refresh token as an HTTP-only cookie; it
//! never appears in a response body.

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{refresh_token_from_headers, Credentials, Registration};
use crate::routes::response::{
    error_response, json_response, json_response_with_cookie, read_json_body, BoxBody,
};
use crate::server::AppState;
use crate::types::GatewayError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub username: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Route Handlers
// =============================================================================

async fn handle_register<B>(req: Request<B>, state: &AppState) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: RegisterRequest = read_json_body(req.into_body()).await?;
    let session = state.issuer.register(&body.into()).await?;

    json_response_with_cookie(
        StatusCode::CREATED,
        &TokenResponse {
            access_token: session.access.token.clone(),
        },
        &state.issuer.refresh_cookie(&session),
    )
}

async fn handle_login<B>(req: Request<B>, state: &AppState) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: LoginRequest = read_json_body(req.into_body()).await?;
    let session = state
        .issuer
        .login(&Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    json_response_with_cookie(
        StatusCode::OK,
        &LoginResponse {
            access_token: session.access.token.clone(),
            username: session.identity.display_name.clone(),
            user_id: session.identity.subject_id.clone(),
        },
        &state.issuer.refresh_cookie(&session),
    )
}

fn handle_logout(state: &AppState) -> Result<Response<BoxBody>, GatewayError> {
    info!("Refresh cookie cleared");
    json_response_with_cookie(
        StatusCode::OK,
        &MessageResponse {
            message: "Logged out".into(),
        },
        &state.issuer.logout_cookie(),
    )
}

fn handle_token<B>(req: &Request<B>, state: &AppState) -> Result<Response<BoxBody>, GatewayError> {
    let (_, access) = state
        .issuer
        .renew(refresh_token_from_headers(req.headers()))?;

    Ok(json_response(
        StatusCode::OK,
        &TokenResponse {
            access_token: access.token,
        },
    ))
}

fn handle_me<B>(req: &Request<B>, state: &AppState) -> Result<Response<BoxBody>, GatewayError> {
    let ctx = state.guard.authenticate(req.headers())?;

    let mut response = json_response(
        StatusCode::OK,
        &MeResponse {
            user_id: ctx.claim.subject_id.clone(),
            username: ctx.claim.display_name.clone(),
        },
    );
    ctx.apply_renewal(&mut response);
    Ok(response)
}

/// Route an `/auth/*` request. Returns `None` for paths outside `/auth`.
pub async fn handle_auth_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    if !path.starts_with("/auth") {
        return None;
    }

    let result = match (req.method().clone(), path.as_str()) {
        (Method::POST, "/auth/register") => handle_register(req, &state).await,
        (Method::POST, "/auth/login") => handle_login(req, &state).await,
        (Method::POST, "/auth/logout") => handle_logout(&state),
        (Method::POST, "/auth/token") => handle_token(&req, &state),
        (Method::GET, "/auth/me") => handle_me(&req, &state),
        (
            _,
            "/auth/register" | "/auth/login" | "/auth/logout" | "/auth/token" | "/auth/me",
        ) => Err(GatewayError::MethodNotAllowed),
        _ => Err(GatewayError::NotFound("route".into())),
    };

    Some(result.unwrap_or_else(error_response))
}
