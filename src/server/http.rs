//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling, one task per
//! connection. Routing is a plain match on method and path.

use hyper::body::{Body, Incoming};
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, VARY,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{AuthGuard, SessionIssuer};
use crate::config::Args;
use crate::routes::{self, error_response, BoxBody};
use crate::store::{MemoryPostStore, MemoryUserStore, PostStore, UserStore};
use crate::types::GatewayError;

/// Which backend holds users and posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Mongo => "mongodb",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Login, registration and renewal
    pub issuer: Arc<SessionIssuer>,
    /// Gate for protected routes
    pub guard: AuthGuard,
    pub posts: Arc<dyn PostStore>,
    pub storage: StorageBackend,
    pub started_at: Instant,
    cors_origin: HeaderValue,
}

impl AppState {
    /// Build state over the given stores
    pub fn new(
        args: Args,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        storage: StorageBackend,
    ) -> Result<Self, GatewayError> {
        let auth = args.auth_config()?;
        let issuer = Arc::new(SessionIssuer::new(&auth, users)?);
        let cors_origin = HeaderValue::from_str(&args.cors_origin)
            .map_err(|e| GatewayError::Config(format!("Invalid CORS_ORIGIN: {}", e)))?;

        Ok(Self {
            args,
            guard: AuthGuard::new(Arc::clone(&issuer)),
            issuer,
            posts,
            storage,
            started_at: Instant::now(),
            cors_origin,
        })
    }

    /// Build state over fresh in-memory stores
    pub fn in_memory(args: Args) -> Result<Self, GatewayError> {
        Self::new(
            args,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryPostStore::new()),
            StorageBackend::Memory,
        )
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Wicket listening on {} as instance {}",
        state.args.listen, state.args.instance_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - dev secrets and non-secure cookies may be in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    info!(peer = %addr, method = %req.method(), path = %req.uri().path(), "Request");
    Ok(dispatch(state, req).await)
}

/// Route one request and decorate the response with CORS headers
pub async fn dispatch<B>(state: Arc<AppState>, req: Request<B>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = match (method, path.as_str()) {
        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),
        (Method::GET, "/version") => routes::version_info(),

        (_, p) if p == "/auth" || p.starts_with("/auth/") => {
            routes::handle_auth_request(req, Arc::clone(&state))
                .await
                .unwrap_or_else(not_found_response)
        }

        (_, p) if p == "/boards" || p.starts_with("/boards/") => {
            routes::handle_board_request(req, Arc::clone(&state))
                .await
                .unwrap_or_else(not_found_response)
        }

        _ => not_found_response(),
    };

    apply_cors(response.headers_mut(), &state.cors_origin);
    response
}

fn apply_cors(headers: &mut HeaderMap, origin: &HeaderValue) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Authorization"),
    );
    headers.insert(VARY, HeaderValue::from_static("Origin"));
}

/// CORS preflight response
fn preflight_response() -> Response<BoxBody> {
    let mut response = Response::new(routes::response::empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;

    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

fn not_found_response() -> Response<BoxBody> {
    error_response(GatewayError::NotFound("route".into()))
}
