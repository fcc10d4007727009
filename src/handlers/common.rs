use crate::errors::{ApiError, ServiceError};
use crate::models::{ItemId, WishlistId};
use axum::body::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Parse a path segment into a wishlist id; malformed ids are `NotFound`.
pub fn parse_wishlist_id(raw: &str) -> Result<WishlistId, ApiError> {
    WishlistId::parse(raw).map_err(|e| {
        debug!(error = %e, "rejected wishlist id");
        ApiError::incorrect_path()
    })
}

/// Parse a path segment into an item id; malformed ids are `NotFound`.
pub fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    ItemId::parse(raw).map_err(|e| {
        debug!(error = %e, "rejected item id");
        ApiError::incorrect_path()
    })
}

/// Decode a JSON request body, mapping any failure to `invalid json body`.
pub fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "rejected request body");
        ApiError::invalid_json()
    })
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::bad_data(format!("Validation failed: {}", e)))
}

/// Maps a service failure: domain errors keep their shape, anything else
/// becomes `Internal` carrying `context` as its message.
pub fn service_failure(context: &'static str) -> impl FnOnce(ServiceError) -> ApiError {
    move |err| {
        if err.is_not_found() || err.is_booking_conflict() || err.is_permission_denied() {
            ApiError::from(err)
        } else {
            ApiError::internal(context, err)
        }
    }
}

/// Window parameters for item listings
#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page size; clamped to the configured maximum
    pub limit: Option<u32>,
    /// Number of items to skip
    pub offset: Option<u64>,
}
