use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{split_page, ItemMutation, WishlistMutation, WishlistRepository};
use crate::errors::ServiceError;
use crate::models::{Item, ItemId, UserId, Wishlist, WishlistId};

/// Process-local storage backed by [`DashMap`].
///
/// `modify_*` holds the entry's shard write guard for the whole closure, so
/// concurrent modifications of the same record are serialised.
#[derive(Debug, Default)]
pub struct InMemoryWishlistRepository {
    wishlists: DashMap<WishlistId, Wishlist>,
    items: DashMap<ItemId, Item>,
}

impl InMemoryWishlistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wishlist_count(&self) -> usize {
        self.wishlists.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl WishlistRepository for InMemoryWishlistRepository {
    async fn upsert(&self, wishlist: Wishlist) -> Result<(), ServiceError> {
        self.wishlists.insert(wishlist.id.clone(), wishlist);
        Ok(())
    }

    async fn get(&self, id: &WishlistId) -> Result<Wishlist, ServiceError> {
        self.wishlists
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(ServiceError::NotFound)
    }

    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Vec<Wishlist>, ServiceError> {
        let mut owned: Vec<Wishlist> = self
            .wishlists
            .iter()
            .filter(|entry| entry.is_owned_by(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn modify_wishlist(
        &self,
        id: &WishlistId,
        mutation: WishlistMutation,
    ) -> Result<Wishlist, ServiceError> {
        let mut entry = self.wishlists.get_mut(id).ok_or(ServiceError::NotFound)?;
        let mut draft = entry.value().clone();
        if mutation(&mut draft)? {
            *entry.value_mut() = draft;
        } else {
            debug!(wishlist_id = %id, "modification left wishlist unchanged");
        }
        Ok(entry.value().clone())
    }

    async fn get_wishlist_items(
        &self,
        wishlist_id: &WishlistId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Item>, bool), ServiceError> {
        let mut items: Vec<Item> = self
            .items
            .iter()
            .filter(|entry| &entry.wishlist_id == wishlist_id)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let window = usize::try_from(limit.saturating_add(1)).unwrap_or(usize::MAX);
        let rows = items.into_iter().skip(offset).take(window).collect();
        Ok(split_page(rows, limit))
    }

    async fn get_wishlist_item_by_id(&self, id: &ItemId) -> Result<Item, ServiceError> {
        self.items
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(ServiceError::ItemNotFound)
    }

    async fn upsert_wishlist_item(&self, item: Item) -> Result<(), ServiceError> {
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn modify_item(
        &self,
        id: &ItemId,
        mutation: ItemMutation,
    ) -> Result<Item, ServiceError> {
        let mut entry = self.items.get_mut(id).ok_or(ServiceError::ItemNotFound)?;
        let mut draft = entry.value().clone();
        if mutation(&mut draft)? {
            *entry.value_mut() = draft;
        }
        Ok(entry.value().clone())
    }

    async fn delete_wishlist_item(&self, id: &ItemId) -> Result<(), ServiceError> {
        self.items
            .remove(id)
            .map(|_| ())
            .ok_or(ServiceError::ItemNotFound)
    }
}
