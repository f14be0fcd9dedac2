//! Public content endpoints: blog posts and the portfolio.
//!
//! Reads are public; every write requires an admin session.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use atelier_shared::models::{PortfolioItem, Post};
use atelier_shared::protocol::{PortfolioInput, PostInput};
use atelier_shared::types::PostId;
use atelier_store::StoreError;

use crate::api::AppState;
use crate::auth;
use crate::error::ServerError;

// ---------------------------------------------------------------------------
// Blog posts
// ---------------------------------------------------------------------------

pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, ServerError> {
    Ok(Json(state.store()?.list_posts()?))
}

/// `GET /posts/{id}`: public read; bumps the view counter atomically.
/// An unknown id is a terminal not-found, no retry semantics.
pub async fn fetch_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ServerError> {
    let post = state
        .store()?
        .fetch_post(PostId(id))
        .map_err(|e| match e {
            StoreError::NotFound => ServerError::NotFound(format!("Post {id}")),
            other => ServerError::Store(other),
        })?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>, ServerError> {
    auth::require_admin(&state, &headers)?;

    if input.title.trim().is_empty() {
        return Err(ServerError::BadRequest("Post title is empty".into()));
    }

    let post = Post {
        id: PostId::new(),
        title: input.title,
        category: input.category,
        date: input.date,
        body: input.body,
        image: input.image,
        excerpt: input.excerpt,
        views: 0,
        created_at: Utc::now(),
    };
    state.store()?.create_post(&post)?;
    info!(post = %post.id, title = %post.title, "Post created");

    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>, ServerError> {
    auth::require_admin(&state, &headers)?;

    let updated = state.store()?.update_post(PostId(id), &input)?;
    Ok(Json(updated))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServerError> {
    auth::require_admin(&state, &headers)?;

    let deleted = state.store()?.delete_post(PostId(id))?;
    if deleted {
        info!(post = %id, "Post deleted");
    }
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

/// `GET /projects`: public list, sorted by explicit order, missing last.
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<PortfolioItem>>, ServerError> {
    Ok(Json(state.store()?.list_portfolio()?))
}

pub async fn create_portfolio_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PortfolioInput>,
) -> Result<Json<PortfolioItem>, ServerError> {
    auth::require_admin(&state, &headers)?;

    if input.title.trim().is_empty() {
        return Err(ServerError::BadRequest("Title is empty".into()));
    }

    let item = PortfolioItem {
        id: Uuid::new_v4(),
        title: input.title,
        category: input.category,
        image: input.image,
        order: input.order,
    };
    state.store()?.create_portfolio_item(&item)?;

    Ok(Json(item))
}

pub async fn delete_portfolio_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServerError> {
    auth::require_admin(&state, &headers)?;

    let deleted = state.store()?.delete_portfolio_item(id)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
