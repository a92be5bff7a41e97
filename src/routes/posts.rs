//! Board post routes
//!
//! Every route here sits behind the auth guard. Reads need any valid
//! identity; updates and deletes additionally require authorship. When the
//! guard renewed the access token, the new token rides on the response as
//! `Authorization: Bearer <token>`, including on error responses.

use bson::oid::ObjectId;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{load_owned_post, parse_post_id, AuthContext};
use crate::db::schemas::{PostDoc, PostView};
use crate::routes::response::{error_response, json_response, read_json_body, BoxBody};
use crate::server::AppState;
use crate::store::{PostChanges, PostQuery};
use crate::types::GatewayError;

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub boards: Vec<PostView>,
    pub total_count: u64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    pub category: String,
}

impl PostRequest {
    /// Non-blank fields become changes; blank fields keep the stored value
    fn into_changes(self) -> PostChanges {
        fn keep(value: String) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        PostChanges {
            title: keep(self.title),
            content: keep(self.content),
            category: keep(self.category),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<PostView>,
}

enum Target<'a> {
    Collection,
    Item(&'a str),
}

fn target(path: &str) -> Option<Target<'_>> {
    if path == "/boards" {
        return Some(Target::Collection);
    }
    path.strip_prefix("/boards/")
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(Target::Item)
}

async fn list_posts(query: Option<&str>, state: &AppState) -> Result<Response<BoxBody>, GatewayError> {
    let params: ListParams = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| GatewayError::BadRequest(format!("Invalid query: {}", e)))?;
    let query = PostQuery::new(params.page, params.size, params.category);

    let page = state.posts.list(&query).await?;

    Ok(json_response(
        StatusCode::OK,
        &ListResponse {
            boards: page.posts.iter().map(PostDoc::to_view).collect(),
            total_count: page.total,
        },
    ))
}

async fn create_post<B>(
    body: B,
    ctx: &AuthContext,
    state: &AppState,
) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let request: PostRequest = read_json_body(body).await?;
    let missing: Vec<&str> = [
        ("title", &request.title),
        ("content", &request.content),
        ("category", &request.category),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();
    if !missing.is_empty() {
        return Err(GatewayError::MissingFields(missing.join(", ")));
    }

    let author_id = ObjectId::parse_str(&ctx.claim.subject_id)
        .map_err(|_| GatewayError::InvalidAccessToken)?;
    let post = state
        .posts
        .insert(PostDoc::new(
            request.title.trim().to_string(),
            request.content.trim().to_string(),
            author_id,
            request.category.trim().to_string(),
        ))
        .await?;

    info!(post_id = ?post.id_hex(), user_id = %ctx.claim.subject_id, "Post created");
    Ok(json_response(StatusCode::CREATED, &post.to_view()))
}

async fn get_post(raw_id: &str, state: &AppState) -> Result<Response<BoxBody>, GatewayError> {
    let id = parse_post_id(raw_id)?;
    let post = state
        .posts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| GatewayError::NotFound("post".into()))?;

    Ok(json_response(StatusCode::OK, &post.to_view()))
}

async fn update_post<B>(
    raw_id: &str,
    body: B,
    ctx: &AuthContext,
    state: &AppState,
) -> Result<Response<BoxBody>, GatewayError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (id, current) = load_owned_post(state.posts.as_ref(), raw_id, &ctx.claim).await?;
    let request: PostRequest = read_json_body(body).await?;
    let changes = request.into_changes();

    let updated = if changes.is_empty() {
        current
    } else {
        state
            .posts
            .update(&id, &changes)
            .await?
            .ok_or_else(|| GatewayError::NotFound("post".into()))?
    };

    info!(post_id = %id, "Post updated");
    Ok(json_response(
        StatusCode::OK,
        &MutationResponse {
            message: "Post updated".into(),
            board: Some(updated.to_view()),
        },
    ))
}

async fn delete_post(
    raw_id: &str,
    ctx: &AuthContext,
    state: &AppState,
) -> Result<Response<BoxBody>, GatewayError> {
    let (id, _) = load_owned_post(state.posts.as_ref(), raw_id, &ctx.claim).await?;

    if !state.posts.delete(&id).await? {
        return Err(GatewayError::NotFound("post".into()));
    }

    info!(post_id = %id, "Post deleted");
    Ok(json_response(
        StatusCode::OK,
        &MutationResponse {
            message: "Post deleted".into(),
            board: None,
        },
    ))
}

/// Route a `/boards` request. Returns `None` for paths outside `/boards`.
pub async fn handle_board_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let target = target(&path)?;
    let method = req.method().clone();

    let allowed = match target {
        Target::Collection => matches!(method, Method::GET | Method::POST),
        Target::Item(_) => matches!(method, Method::GET | Method::PUT | Method::DELETE),
    };
    if !allowed {
        return Some(error_response(GatewayError::MethodNotAllowed));
    }

    let ctx = match state.guard.authenticate(req.headers()) {
        Ok(ctx) => ctx,
        Err(err) => return Some(error_response(err)),
    };

    let query = req.uri().query().map(str::to_string);
    let body = req.into_body();

    let result = match (method, target) {
        (Method::GET, Target::Collection) => list_posts(query.as_deref(), &state).await,
        (Method::POST, Target::Collection) => create_post(body, &ctx, &state).await,
        (Method::GET, Target::Item(id)) => get_post(id, &state).await,
        (Method::PUT, Target::Item(id)) => update_post(id, body, &ctx, &state).await,
        (Method::DELETE, Target::Item(id)) => delete_post(id, &ctx, &state).await,
        _ => Err(GatewayError::MethodNotAllowed),
    };

    let mut response = result.unwrap_or_else(error_response);
    ctx.apply_renewal(&mut response);
    Some(response)
}
