//! Ownership and visibility checks shared by the wishlist handlers.

use tracing::warn;

use crate::{
    auth::AuthUser,
    errors::{ApiError, ServiceError},
    models::{Item, ItemId, Wishlist, WishlistId},
    services::WishlistService,
};

pub use crate::errors::NOT_OWNER_MESSAGE;

fn load_failure(err: ServiceError) -> ApiError {
    if err.is_not_found() {
        ApiError::incorrect_path()
    } else {
        ApiError::internal("Error getting wishlist", err)
    }
}

/// Loads `id` and requires the principal to own it.
///
/// Absent wishlists map to the same `NotFound` as a malformed path; other
/// storage failures are `Internal`.
pub async fn load_owned_wishlist(
    service: &WishlistService,
    id: &WishlistId,
    principal: &AuthUser,
) -> Result<Wishlist, ApiError> {
    let wishlist = service.get(id).await.map_err(load_failure)?;

    if !wishlist.is_owned_by(&principal.user_id) {
        warn!(
            wishlist_id = %id,
            user_id = %principal.user_id,
            "rejected access to wishlist of another user"
        );
        return Err(ApiError::forbidden(NOT_OWNER_MESSAGE));
    }

    Ok(wishlist)
}

/// Loads `id` for reading. Archived wishlists are only visible to their owner.
pub async fn load_visible_wishlist(
    service: &WishlistService,
    id: &WishlistId,
    principal: &AuthUser,
) -> Result<Wishlist, ApiError> {
    let wishlist = service.get(id).await.map_err(load_failure)?;

    if wishlist.is_archived && !wishlist.is_owned_by(&principal.user_id) {
        return Err(ApiError::incorrect_path());
    }

    Ok(wishlist)
}

/// Loads an item and checks that it belongs to `wishlist`.
pub async fn load_item_of(
    service: &WishlistService,
    wishlist: &Wishlist,
    item_id: &ItemId,
) -> Result<Item, ApiError> {
    let item = service.get_wishlist_item(item_id).await.map_err(|err| {
        if err.is_not_found() {
            ApiError::incorrect_path()
        } else {
            ApiError::internal("Error getting wishlist item", err)
        }
    })?;

    if item.wishlist_id != wishlist.id {
        return Err(ApiError::incorrect_path());
    }

    Ok(item)
}
