use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{decode_json, parse_wishlist_id, service_failure, validate_input};
use super::guard::{load_owned_wishlist, load_visible_wishlist};
use crate::{auth::AuthUser, models::Wishlist, ApiResponse, ApiResult, AppState};

/// Wishlist as returned to clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "0b5c2f3e-9d41-4b8e-a7a0-3f4f1f3c2b11",
    "userId": "user-42",
    "title": "Birthday",
    "description": "Things I would love to get",
    "avatar": null,
    "isDefault": true,
    "isArchived": false,
    "createdAt": "2024-12-09T10:30:00Z",
    "updatedAt": "2024-12-09T10:30:00Z"
}))]
pub struct WishlistResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    /// Opaque reference to an image owned by the image service
    pub avatar: Option<String>,
    pub is_default: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wishlist> for WishlistResponse {
    fn from(w: Wishlist) -> Self {
        Self {
            id: w.id.into_inner(),
            user_id: w.user_id.into_inner(),
            title: w.title,
            description: w.description,
            avatar: w.avatar.map(|a| a.into_inner()),
            is_default: w.is_default,
            is_archived: w.is_archived,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlist {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"wishlist": {"title": "Birthday", "description": "", "isDefault": false}}))]
pub struct CreateWishlistRequest {
    #[validate]
    pub wishlist: NewWishlist,
}

/// Fields a client may change. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WishlistChanges {
    /// Informational only; the path id wins
    pub id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 4096))]
    pub description: Option<String>,
    pub is_default: Option<bool>,
}

impl WishlistChanges {
    /// Merge onto the stored record. Identity, owner, avatar, archive flag and
    /// creation time are never taken from the payload.
    pub fn apply_to(self, wishlist: &mut Wishlist) {
        if let Some(title) = self.title {
            wishlist.title = title;
        }
        if let Some(description) = self.description {
            wishlist.description = description;
        }
        if let Some(is_default) = self.is_default {
            wishlist.is_default = is_default;
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"wishlist": {"id": "0b5c2f3e-9d41-4b8e-a7a0-3f4f1f3c2b11", "title": "Birthday 2025", "isDefault": true}}))]
pub struct UpdateWishlistRequest {
    #[validate]
    pub wishlist: WishlistChanges,
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlists",
    request_body = CreateWishlistRequest,
    responses(
        (status = 201, description = "Wishlist created", body = ApiResponse<WishlistResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "wishlists"
)]
pub async fn create_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<WishlistResponse>>), crate::errors::ApiError> {
    let request: CreateWishlistRequest = decode_json(&body)?;
    validate_input(&request)?;

    let mut wishlist = Wishlist::new(user.user_id.clone(), request.wishlist.title);
    wishlist.description = request.wishlist.description;
    wishlist.is_default = request.wishlist.is_default;

    let created = state
        .wishlist_service()
        .create(wishlist)
        .await
        .map_err(service_failure("Error creating wishlist"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(WishlistResponse::from(created))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/wishlists",
    responses(
        (status = 200, description = "Wishlists of the caller, archived included", body = ApiResponse<Vec<WishlistResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "wishlists"
)]
pub async fn list_my_wishlists(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Vec<WishlistResponse>> {
    let wishlists = state
        .wishlist_service()
        .get_by_user_id(&user.user_id)
        .await
        .map_err(service_failure("Error listing wishlists"))?;

    Ok(Json(ApiResponse::success(
        wishlists.into_iter().map(WishlistResponse::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/wishlists/:id",
    params(("id" = String, Path, description = "Wishlist ID")),
    responses(
        (status = 200, description = "Wishlist fetched", body = ApiResponse<WishlistResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Wishlist not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "wishlists"
)]
pub async fn get_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<WishlistResponse> {
    let id = parse_wishlist_id(&raw_id)?;
    let wishlist = load_visible_wishlist(&state.wishlist_service(), &id, &user).await?;
    Ok(Json(ApiResponse::success(WishlistResponse::from(wishlist))))
}

#[utoipa::path(
    put,
    path = "/api/v1/wishlists/:id",
    request_body = UpdateWishlistRequest,
    params(("id" = String, Path, description = "Wishlist ID")),
    responses(
        (status = 204, description = "Wishlist updated"),
        (status = 400, description = "Invalid json body", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Wishlist belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "wishlists"
)]
pub async fn update_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, crate::errors::ApiError> {
    let id = parse_wishlist_id(&raw_id)?;
    let service = state.wishlist_service();
    load_owned_wishlist(&service, &id, &user).await?;

    let request: UpdateWishlistRequest = decode_json(&body)?;
    validate_input(&request)?;

    let changes = request.wishlist;
    service
        .update_owned(&id, &user.user_id, move |wishlist| changes.apply_to(wishlist))
        .await
        .map_err(service_failure("Error updating wishlist"))?;

    info!(wishlist_id = %id, "Wishlist updated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlists/:id/archive",
    params(("id" = String, Path, description = "Wishlist ID")),
    responses(
        (status = 200, description = "Wishlist archived", body = ApiResponse<WishlistResponse>),
        (status = 403, description = "Wishlist belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "wishlists"
)]
pub async fn archive_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<WishlistResponse> {
    let id = parse_wishlist_id(&raw_id)?;
    let service = state.wishlist_service();
    load_owned_wishlist(&service, &id, &user).await?;

    let archived = service
        .archive(&id)
        .await
        .map_err(service_failure("Error archiving wishlist"))?;
    Ok(Json(ApiResponse::success(WishlistResponse::from(archived))))
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlists/:id/restore",
    params(("id" = String, Path, description = "Wishlist ID")),
    responses(
        (status = 200, description = "Wishlist restored", body = ApiResponse<WishlistResponse>),
        (status = 403, description = "Wishlist belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "wishlists"
)]
pub async fn restore_wishlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<WishlistResponse> {
    let id = parse_wishlist_id(&raw_id)?;
    let service = state.wishlist_service();
    load_owned_wishlist(&service, &id, &user).await?;

    let restored = service
        .restore(&id)
        .await
        .map_err(service_failure("Error restoring wishlist"))?;
    Ok(Json(ApiResponse::success(WishlistResponse::from(restored))))
}
