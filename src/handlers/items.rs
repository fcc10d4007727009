use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::common::{
    decode_json, parse_item_id, parse_wishlist_id, service_failure, validate_input, PageParams,
};
use super::guard::{load_item_of, load_owned_wishlist, load_visible_wishlist};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{Item, UserId},
    ApiResponse, ApiResult, AppState,
};

pub const OWN_ITEM_BOOKING_MESSAGE: &str = "you can't book items of your own wishlist";

/// Item as seen by a particular viewer. Who booked an item is never exposed;
/// the viewer only learns whether it is booked and whether they hold it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: String,
    pub wishlist_id: String,
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub is_booking_available: bool,
    pub is_booked: bool,
    pub is_booked_by_me: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemResponse {
    pub fn for_viewer(item: Item, viewer: &UserId) -> Self {
        Self {
            is_booked: item.is_booked(),
            is_booked_by_me: item.is_booked_by_user(viewer),
            id: item.id.into_inner(),
            wishlist_id: item.wishlist_id.into_inner(),
            title: item.title,
            description: item.description,
            link: item.link,
            is_booking_available: item.is_booking_available,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPageResponse {
    pub items: Vec<ItemResponse>,
    pub has_more: bool,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub description: String,
    #[validate(url)]
    pub link: Option<String>,
    #[serde(default = "default_booking_available")]
    pub is_booking_available: bool,
}

fn default_booking_available() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"item": {"title": "Kettle", "link": "https://shop.example.com/kettle", "isBookingAvailable": true}}))]
pub struct AddItemRequest {
    #[validate]
    pub item: NewItem,
}

#[utoipa::path(
    get,
    path = "/api/v1/wishlists/:id/items",
    params(("id" = String, Path, description = "Wishlist ID"), PageParams),
    responses(
        (status = 200, description = "One page of items", body = ApiResponse<ItemPageResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn list_items(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<ItemPageResponse> {
    let id = parse_wishlist_id(&raw_id)?;
    let Query(page) = query.map_err(|e| ApiError::bad_data(e.body_text()))?;

    let service = state.wishlist_service();
    load_visible_wishlist(&service, &id, &user).await?;

    let limit = state.config.clamp_page_size(page.limit);
    let offset = page.offset.unwrap_or(0);
    let result = service
        .get_wishlist_items(&id, u64::from(limit), offset)
        .await
        .map_err(service_failure("Error getting wishlist items"))?;

    Ok(Json(ApiResponse::success(ItemPageResponse {
        items: result
            .items
            .into_iter()
            .map(|item| ItemResponse::for_viewer(item, &user.user_id))
            .collect(),
        has_more: result.has_more,
        limit,
        offset,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlists/:id/items",
    request_body = AddItemRequest,
    params(("id" = String, Path, description = "Wishlist ID")),
    responses(
        (status = 201, description = "Item added", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Invalid json body", body = crate::errors::ErrorResponse),
        (status = 403, description = "Wishlist belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn add_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<ItemResponse>>), ApiError> {
    let id = parse_wishlist_id(&raw_id)?;
    let service = state.wishlist_service();
    let wishlist = load_owned_wishlist(&service, &id, &user).await?;

    let request: AddItemRequest = decode_json(&body)?;
    validate_input(&request)?;

    let mut item = Item::new(wishlist.id, request.item.title);
    item.description = request.item.description;
    item.link = request.item.link;
    item.is_booking_available = request.item.is_booking_available;

    let created = service
        .add_wishlist_item(item)
        .await
        .map_err(service_failure("Error adding wishlist item"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ItemResponse::for_viewer(
            created,
            &user.user_id,
        ))),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/wishlists/:id/items/:item_id",
    params(
        ("id" = String, Path, description = "Wishlist ID"),
        ("item_id" = String, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 403, description = "Wishlist belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn remove_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path((raw_id, raw_item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id = parse_wishlist_id(&raw_id)?;
    let item_id = parse_item_id(&raw_item_id)?;
    let service = state.wishlist_service();
    let wishlist = load_owned_wishlist(&service, &id, &user).await?;
    load_item_of(&service, &wishlist, &item_id).await?;

    service
        .remove_item(&item_id)
        .await
        .map_err(service_failure("Error removing wishlist item"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlists/:id/items/:item_id/book",
    params(
        ("id" = String, Path, description = "Wishlist ID"),
        ("item_id" = String, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item booked by the caller"),
        (status = 403, description = "Owners cannot book their own items", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse),
        (status = 409, description = "Booking not available or already booked", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn book_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path((raw_id, raw_item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id = parse_wishlist_id(&raw_id)?;
    let item_id = parse_item_id(&raw_item_id)?;
    let service = state.wishlist_service();
    let wishlist = load_visible_wishlist(&service, &id, &user).await?;
    if wishlist.is_owned_by(&user.user_id) {
        return Err(ApiError::forbidden(OWN_ITEM_BOOKING_MESSAGE));
    }
    load_item_of(&service, &wishlist, &item_id).await?;

    service
        .book_item(&item_id, &user.user_id)
        .await
        .map_err(service_failure("Error booking item"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlists/:id/items/:item_id/unbook",
    params(
        ("id" = String, Path, description = "Wishlist ID"),
        ("item_id" = String, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Booking cleared"),
        (status = 403, description = "Item is booked by another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incorrect path parameter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "items"
)]
pub async fn unbook_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path((raw_id, raw_item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id = parse_wishlist_id(&raw_id)?;
    let item_id = parse_item_id(&raw_item_id)?;
    let service = state.wishlist_service();
    let wishlist = load_visible_wishlist(&service, &id, &user).await?;
    load_item_of(&service, &wishlist, &item_id).await?;

    // The booker check runs against the stored item inside the write.
    service
        .unbook_item_as(
            &item_id,
            &user.user_id,
            wishlist.is_owned_by(&user.user_id),
        )
        .await
        .map_err(service_failure("Error unbooking item"))?;
    Ok(StatusCode::NO_CONTENT)
}
