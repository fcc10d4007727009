//! Storage port for wishlists and their items.
//!
//! Plain reads and writes are last-writer-wins. Anything that must inspect a
//! record before changing it goes through [`WishlistRepository::modify_wishlist`]
//! or [`WishlistRepository::modify_item`], which run the closure atomically
//! with respect to other modifications of the same record.

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::models::{Item, ItemId, UserId, Wishlist, WishlistId};

pub mod memory;
pub mod wishlist_repository;

pub use memory::InMemoryWishlistRepository;
pub use wishlist_repository::SeaOrmWishlistRepository;

/// Mutation applied under the record lock.
///
/// `Ok(true)` persists the mutated record, `Ok(false)` leaves storage
/// untouched, and `Err` aborts without writing.
pub type WishlistMutation = Box<dyn FnOnce(&mut Wishlist) -> Result<bool, ServiceError> + Send>;
pub type ItemMutation = Box<dyn FnOnce(&mut Item) -> Result<bool, ServiceError> + Send>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Insert or fully replace a wishlist.
    async fn upsert(&self, wishlist: Wishlist) -> Result<(), ServiceError>;

    /// Fails with [`ServiceError::NotFound`] when absent.
    async fn get(&self, id: &WishlistId) -> Result<Wishlist, ServiceError>;

    /// All wishlists of `user_id`, archived included, oldest first.
    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Vec<Wishlist>, ServiceError>;

    /// Atomic read-modify-write of one wishlist. Returns the record as stored
    /// after the call.
    async fn modify_wishlist(
        &self,
        id: &WishlistId,
        mutation: WishlistMutation,
    ) -> Result<Wishlist, ServiceError>;

    /// One page of items, oldest first, plus whether more follow.
    async fn get_wishlist_items(
        &self,
        wishlist_id: &WishlistId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Item>, bool), ServiceError>;

    /// Fails with [`ServiceError::ItemNotFound`] when absent.
    async fn get_wishlist_item_by_id(&self, id: &ItemId) -> Result<Item, ServiceError>;

    async fn upsert_wishlist_item(&self, item: Item) -> Result<(), ServiceError>;

    /// Atomic read-modify-write of one item.
    async fn modify_item(&self, id: &ItemId, mutation: ItemMutation)
        -> Result<Item, ServiceError>;

    /// Fails with [`ServiceError::ItemNotFound`] when nothing was deleted.
    async fn delete_wishlist_item(&self, id: &ItemId) -> Result<(), ServiceError>;
}

/// Splits a `limit + 1` fetch into the page and the `has_more` flag.
pub(crate) fn split_page<T>(mut rows: Vec<T>, limit: u64) -> (Vec<T>, bool) {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    (rows, has_more)
}
