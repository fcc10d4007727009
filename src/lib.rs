//! Wishlist API Library
//!
//! Wishlists, their items and the item booking lifecycle, served over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::AuthRouterExt;

// App state definition
#[derive(Clone)]
pub struct AppState {
    /// Present only when the database storage backend is in use
    pub db: Option<Arc<DatabaseConnection>>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn wishlist_service(&self) -> Arc<services::WishlistService> {
        self.services.wishlists.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ApiError>;

/// Routes mounted under `/api/v1`.
///
/// Requests need an `Arc<auth::AuthService>` in their extensions for the auth
/// layer to resolve bearer tokens.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{items, wishlists};

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .route(
            "/wishlists",
            get(wishlists::list_my_wishlists).post(wishlists::create_wishlist),
        )
        .route(
            "/wishlists/:id",
            get(wishlists::get_wishlist).put(wishlists::update_wishlist),
        )
        .route("/wishlists/:id/archive", post(wishlists::archive_wishlist))
        .route("/wishlists/:id/restore", post(wishlists::restore_wishlist))
        .route(
            "/wishlists/:id/items",
            get(items::list_items).post(items::add_item),
        )
        .route(
            "/wishlists/:id/items/:item_id",
            axum::routing::delete(items::remove_item),
        )
        .route("/wishlists/:id/items/:item_id/book", post(items::book_item))
        .route(
            "/wishlists/:id/items/:item_id/unbook",
            post(items::unbook_item),
        )
        .with_auth()
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "wishlist-api",
        "storage": state.config.storage_backend,
        "environment": state.config.environment,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match &state.db {
        Some(db) => match db::check_connection(db).await {
            Ok(_) => "healthy",
            Err(_) => "unhealthy",
        },
        None => "not_configured",
    };

    let health_data = json!({
        "status": if db_status == "unhealthy" { "unhealthy" } else { "healthy" },
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
