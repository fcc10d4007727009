use chrono::Utc;
use metrics::counter;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::{ServiceError, NOT_OWNER_MESSAGE},
    models::{Item, ItemId, UserId, Wishlist, WishlistId},
    repositories::{ItemMutation, WishlistRepository},
};

/// One window of a wishlist's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub has_more: bool,
}

/// Business rules for wishlists and the item booking lifecycle.
#[derive(Clone)]
pub struct WishlistService {
    repo: Arc<dyn WishlistRepository>,
}

impl WishlistService {
    pub fn new(repo: Arc<dyn WishlistRepository>) -> Self {
        Self { repo }
    }

    /// Stores a new wishlist. A blank id is replaced with a fresh UUID.
    #[instrument(skip(self, wishlist), fields(user_id = %wishlist.user_id))]
    pub async fn create(&self, mut wishlist: Wishlist) -> Result<Wishlist, ServiceError> {
        if wishlist.id.is_empty() {
            wishlist.id = WishlistId::generate();
        }
        let now = Utc::now();
        wishlist.created_at = now;
        wishlist.updated_at = now;

        self.repo.upsert(wishlist.clone()).await?;
        info!(wishlist_id = %wishlist.id, "Wishlist created");
        Ok(wishlist)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &WishlistId) -> Result<Wishlist, ServiceError> {
        self.repo.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_user_id(&self, user_id: &UserId) -> Result<Vec<Wishlist>, ServiceError> {
        self.repo.get_by_user_id(user_id).await
    }

    /// Overwrites the stored record with `wishlist`, re-stamping `updated_at`.
    #[instrument(skip(self, wishlist), fields(wishlist_id = %wishlist.id))]
    pub async fn update(&self, mut wishlist: Wishlist) -> Result<Wishlist, ServiceError> {
        wishlist.touch(Utc::now());
        self.repo.upsert(wishlist.clone()).await?;
        debug!("Wishlist updated");
        Ok(wishlist)
    }

    /// Applies `changes` to the stored wishlist of `owner` under the record
    /// lock, so fields the caller does not touch keep their stored values.
    #[instrument(skip(self, changes))]
    pub async fn update_owned<F>(
        &self,
        id: &WishlistId,
        owner: &UserId,
        changes: F,
    ) -> Result<Wishlist, ServiceError>
    where
        F: FnOnce(&mut Wishlist) + Send + 'static,
    {
        let owner = owner.clone();
        let wishlist = self
            .repo
            .modify_wishlist(
                id,
                Box::new(move |w| {
                    if !w.is_owned_by(&owner) {
                        return Err(ServiceError::PermissionDenied(NOT_OWNER_MESSAGE));
                    }
                    changes(w);
                    w.touch(Utc::now());
                    Ok(true)
                }),
            )
            .await?;
        debug!("Wishlist updated");
        Ok(wishlist)
    }

    #[instrument(skip(self))]
    pub async fn archive(&self, id: &WishlistId) -> Result<Wishlist, ServiceError> {
        let wishlist = self
            .repo
            .modify_wishlist(
                id,
                Box::new(|w| {
                    w.archive(Utc::now());
                    Ok(true)
                }),
            )
            .await?;
        info!("Wishlist archived");
        Ok(wishlist)
    }

    #[instrument(skip(self))]
    pub async fn restore(&self, id: &WishlistId) -> Result<Wishlist, ServiceError> {
        let wishlist = self
            .repo
            .modify_wishlist(
                id,
                Box::new(|w| {
                    w.restore(Utc::now());
                    Ok(true)
                }),
            )
            .await?;
        info!("Wishlist restored");
        Ok(wishlist)
    }

    /// Adds an item to an existing wishlist. A blank id is replaced with a
    /// fresh UUID.
    #[instrument(skip(self, item), fields(wishlist_id = %item.wishlist_id))]
    pub async fn add_wishlist_item(&self, mut item: Item) -> Result<Item, ServiceError> {
        self.repo.get(&item.wishlist_id).await?;

        if item.id.is_empty() {
            item.id = ItemId::generate();
        }
        let now = Utc::now();
        item.created_at = now;
        item.updated_at = now;

        self.repo.upsert_wishlist_item(item.clone()).await?;
        info!(item_id = %item.id, "Wishlist item added");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn get_wishlist_item(&self, id: &ItemId) -> Result<Item, ServiceError> {
        self.repo.get_wishlist_item_by_id(id).await
    }

    #[instrument(skip(self))]
    pub async fn get_wishlist_items(
        &self,
        wishlist_id: &WishlistId,
        limit: u64,
        offset: u64,
    ) -> Result<ItemPage, ServiceError> {
        let (items, has_more) = self
            .repo
            .get_wishlist_items(wishlist_id, limit, offset)
            .await?;
        Ok(ItemPage { items, has_more })
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, id: &ItemId) -> Result<(), ServiceError> {
        self.repo.delete_wishlist_item(id).await?;
        info!("Wishlist item removed");
        Ok(())
    }

    /// Books `item_id` for `user_id`.
    ///
    /// Re-booking by the current booker succeeds without touching the item.
    #[instrument(skip(self))]
    pub async fn book_item(&self, item_id: &ItemId, user_id: &UserId) -> Result<(), ServiceError> {
        let booker = user_id.clone();
        let result = self
            .repo
            .modify_item(item_id, Box::new(move |item| item.book(&booker, Utc::now())))
            .await;

        match &result {
            Ok(_) => {
                counter!("wishlist.items.booked", 1);
                info!("Item booked");
            }
            Err(e) if e.is_booking_conflict() => {
                counter!("wishlist.items.booking_rejected", 1);
                warn!(error = %e, "Booking rejected");
            }
            Err(_) => {}
        }

        result.map(|_| ())
    }

    /// Clears any booking on `item_id`; unbooked items are left alone.
    ///
    /// Returns whether a booking was cleared.
    #[instrument(skip(self))]
    pub async fn unbook_item(&self, item_id: &ItemId) -> Result<bool, ServiceError> {
        self.release_booking(item_id, Box::new(|item| Ok(item.unbook(Utc::now()))))
            .await
    }

    /// Clears the booking on `item_id` for `user_id`. Anyone but the current
    /// booker gets `PermissionDenied` unless `is_owner` is set.
    #[instrument(skip(self))]
    pub async fn unbook_item_as(
        &self,
        item_id: &ItemId,
        user_id: &UserId,
        is_owner: bool,
    ) -> Result<bool, ServiceError> {
        let requester = user_id.clone();
        self.release_booking(
            item_id,
            Box::new(move |item| item.unbook_as(&requester, is_owner, Utc::now())),
        )
        .await
    }

    async fn release_booking(
        &self,
        item_id: &ItemId,
        release: ItemMutation,
    ) -> Result<bool, ServiceError> {
        let cleared = Arc::new(AtomicBool::new(false));
        let flag = cleared.clone();
        self.repo
            .modify_item(
                item_id,
                Box::new(move |item| {
                    let changed = release(item)?;
                    flag.store(changed, Ordering::Relaxed);
                    Ok(changed)
                }),
            )
            .await?;

        let cleared = cleared.load(Ordering::Relaxed);
        if cleared {
            counter!("wishlist.items.unbooked", 1);
            debug!("Item unbooked");
        } else {
            debug!("Item was not booked");
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryWishlistRepository, MockWishlistRepository};
    use assert_matches::assert_matches;
    use chrono::Duration;
    use mockall::predicate::eq;

    fn memory_service() -> (WishlistService, Arc<InMemoryWishlistRepository>) {
        let repo = Arc::new(InMemoryWishlistRepository::new());
        (WishlistService::new(repo.clone()), repo)
    }

    async fn seeded_item(service: &WishlistService) -> Item {
        let wishlist = service
            .create(Wishlist::new(UserId::new("owner"), "Birthday"))
            .await
            .unwrap();
        service
            .add_wishlist_item(Item::new(wishlist.id, "Kettle"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_unique_ids_when_blank() {
        let (service, _) = memory_service();
        let a = service
            .create(Wishlist::new(UserId::new("u"), "a"))
            .await
            .unwrap();
        let b = service
            .create(Wishlist::new(UserId::new("u"), "b"))
            .await
            .unwrap();

        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn create_keeps_preset_id() {
        let (service, repo) = memory_service();
        let mut wishlist = Wishlist::new(UserId::new("u"), "a");
        wishlist.id = WishlistId::new("preset");

        let created = service.create(wishlist).await.unwrap();
        assert_eq!(created.id, WishlistId::new("preset"));
        assert_eq!(repo.wishlist_count(), 1);
    }

    #[tokio::test]
    async fn update_never_moves_updated_at_backwards() {
        let (service, _) = memory_service();
        let mut wishlist = service
            .create(Wishlist::new(UserId::new("u"), "a"))
            .await
            .unwrap();
        let future = wishlist.updated_at + Duration::hours(1);
        wishlist.updated_at = future;

        let updated = service.update(wishlist).await.unwrap();
        assert_eq!(updated.updated_at, future);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn archive_then_restore_only_changes_updated_at() {
        let (service, _) = memory_service();
        let original = service
            .create(Wishlist::new(UserId::new("u"), "a"))
            .await
            .unwrap();

        let archived = service.archive(&original.id).await.unwrap();
        assert!(archived.is_archived);
        let restored = service.restore(&original.id).await.unwrap();

        assert!(restored.updated_at >= original.updated_at);
        assert_eq!(
            Wishlist {
                updated_at: original.updated_at,
                ..restored
            },
            original
        );
    }

    #[tokio::test]
    async fn archive_unknown_wishlist_is_not_found() {
        let (service, _) = memory_service();
        assert_matches!(
            service.archive(&WishlistId::new("nope")).await,
            Err(ServiceError::NotFound)
        );
    }

    #[tokio::test]
    async fn add_item_requires_existing_wishlist() {
        let (service, repo) = memory_service();
        let result = service
            .add_wishlist_item(Item::new(WishlistId::new("ghost"), "Kettle"))
            .await;
        assert_matches!(result, Err(ServiceError::NotFound));
        assert_eq!(repo.item_count(), 0);
    }

    #[tokio::test]
    async fn booking_is_idempotent_for_the_same_user() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;
        let alice = UserId::new("alice");

        service.book_item(&item.id, &alice).await.unwrap();
        let first = service.get_wishlist_item(&item.id).await.unwrap();
        service.book_item(&item.id, &alice).await.unwrap();
        let second = service.get_wishlist_item(&item.id).await.unwrap();

        assert_eq!(first, second);
        assert!(second.is_booked_by_user(&alice));
    }

    #[tokio::test]
    async fn booking_conflict_leaves_item_unchanged() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;
        service
            .book_item(&item.id, &UserId::new("alice"))
            .await
            .unwrap();
        let before = service.get_wishlist_item(&item.id).await.unwrap();

        assert_matches!(
            service.book_item(&item.id, &UserId::new("bob")).await,
            Err(ServiceError::AlreadyBooked)
        );
        assert_eq!(service.get_wishlist_item(&item.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn closed_items_cannot_be_booked() {
        let (service, repo) = memory_service();
        let mut item = seeded_item(&service).await;
        item.is_booking_available = false;
        repo.upsert_wishlist_item(item.clone()).await.unwrap();

        assert_matches!(
            service.book_item(&item.id, &UserId::new("alice")).await,
            Err(ServiceError::BookingNotAvailable)
        );
    }

    #[tokio::test]
    async fn unbook_of_unbooked_item_is_a_noop() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;

        assert!(!service.unbook_item(&item.id).await.unwrap());
        assert_eq!(service.get_wishlist_item(&item.id).await.unwrap(), item);
    }

    #[tokio::test]
    async fn unbook_clears_the_booking() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;
        service
            .book_item(&item.id, &UserId::new("alice"))
            .await
            .unwrap();

        assert!(service.unbook_item(&item.id).await.unwrap());
        assert!(!service.get_wishlist_item(&item.id).await.unwrap().is_booked());
    }

    #[tokio::test]
    async fn unbook_as_stranger_keeps_the_booking() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;
        let bob = UserId::new("bob");
        service.book_item(&item.id, &bob).await.unwrap();

        assert_matches!(
            service
                .unbook_item_as(&item.id, &UserId::new("carol"), false)
                .await,
            Err(ServiceError::PermissionDenied(_))
        );
        assert!(service
            .get_wishlist_item(&item.id)
            .await
            .unwrap()
            .is_booked_by_user(&bob));

        assert!(service
            .unbook_item_as(&item.id, &UserId::new("owner"), true)
            .await
            .unwrap());
        assert!(!service.get_wishlist_item(&item.id).await.unwrap().is_booked());
    }

    #[tokio::test]
    async fn unbook_as_on_free_item_reports_no_change() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;

        assert!(!service
            .unbook_item_as(&item.id, &UserId::new("carol"), false)
            .await
            .unwrap());
        assert_eq!(service.get_wishlist_item(&item.id).await.unwrap(), item);
    }

    #[tokio::test]
    async fn update_owned_keeps_fields_it_does_not_touch() {
        let (service, _) = memory_service();
        let owner = UserId::new("owner");
        let original = service
            .create(Wishlist::new(owner.clone(), "Birthday"))
            .await
            .unwrap();
        service.archive(&original.id).await.unwrap();

        let updated = service
            .update_owned(&original.id, &owner, |w| w.title = "Birthday 2025".into())
            .await
            .unwrap();

        assert_eq!(updated.title, "Birthday 2025");
        assert!(updated.is_archived);
        assert_eq!(service.get(&original.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_owned_rejects_other_users() {
        let (service, _) = memory_service();
        let original = service
            .create(Wishlist::new(UserId::new("owner"), "Birthday"))
            .await
            .unwrap();

        assert_matches!(
            service
                .update_owned(&original.id, &UserId::new("mallory"), |w| {
                    w.title = "Hacked".into()
                })
                .await,
            Err(ServiceError::PermissionDenied(NOT_OWNER_MESSAGE))
        );
        assert_eq!(service.get(&original.id).await.unwrap(), original);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookers_have_exactly_one_winner() {
        let (service, _) = memory_service();
        let item = seeded_item(&service).await;

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let service = service.clone();
                let item_id = item.id.clone();
                tokio::spawn(async move {
                    service
                        .book_item(&item_id, &UserId::new(format!("user-{}", n)))
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(e) => assert_matches!(e, ServiceError::AlreadyBooked),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn storage_failures_propagate_unchanged() {
        let mut repo = MockWishlistRepository::new();
        repo.expect_get()
            .with(eq(WishlistId::new("w")))
            .times(1)
            .returning(|_| Err(ServiceError::StorageError("disk on fire".into())));
        let service = WishlistService::new(Arc::new(repo));

        assert_matches!(
            service.get(&WishlistId::new("w")).await,
            Err(ServiceError::StorageError(msg)) if msg == "disk on fire"
        );
    }

    #[tokio::test]
    async fn page_is_passed_through_from_storage() {
        let mut repo = MockWishlistRepository::new();
        repo.expect_get_wishlist_items()
            .withf(|id, limit, offset| id.as_str() == "w" && *limit == 2 && *offset == 4)
            .times(1)
            .returning(|id, _, _| Ok((vec![Item::new(id.clone(), "x")], true)));
        let service = WishlistService::new(Arc::new(repo));

        let page = service
            .get_wishlist_items(&WishlistId::new("w"), 2, 4)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn remove_item_does_not_write_anything_else() {
        let mut repo = MockWishlistRepository::new();
        repo.expect_delete_wishlist_item()
            .with(eq(ItemId::new("i")))
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_upsert().never();
        repo.expect_upsert_wishlist_item().never();
        let service = WishlistService::new(Arc::new(repo));

        service.remove_item(&ItemId::new("i")).await.unwrap();
    }
}
