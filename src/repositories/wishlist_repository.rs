use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{split_page, ItemMutation, WishlistMutation, WishlistRepository};
use crate::db::{DatabaseAccess, DbPool};
use crate::entities::{wishlist, wishlist_item};
use crate::errors::ServiceError;
use crate::models::{Item, ItemId, UserId, Wishlist, WishlistId};

/// Repository backed by sea-orm (SQLite or Postgres).
///
/// `modify_*` selects the row with `lock_exclusive()` inside a transaction,
/// applies the mutation and writes it back before committing.
#[derive(Debug, Clone)]
pub struct SeaOrmWishlistRepository {
    db: Arc<DbPool>,
    access: DatabaseAccess,
}

impl SeaOrmWishlistRepository {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            access: DatabaseAccess::new(db.clone()),
            db,
        }
    }

    fn wishlist_conflict() -> OnConflict {
        OnConflict::column(wishlist::Column::Id)
            .update_columns([
                wishlist::Column::UserId,
                wishlist::Column::Title,
                wishlist::Column::Description,
                wishlist::Column::Avatar,
                wishlist::Column::IsDefault,
                wishlist::Column::IsArchived,
                wishlist::Column::CreatedAt,
                wishlist::Column::UpdatedAt,
            ])
            .to_owned()
    }

    fn item_conflict() -> OnConflict {
        OnConflict::column(wishlist_item::Column::Id)
            .update_columns([
                wishlist_item::Column::WishlistId,
                wishlist_item::Column::Title,
                wishlist_item::Column::Description,
                wishlist_item::Column::Link,
                wishlist_item::Column::IsBookingAvailable,
                wishlist_item::Column::IsBookedBy,
                wishlist_item::Column::CreatedAt,
                wishlist_item::Column::UpdatedAt,
            ])
            .to_owned()
    }
}

#[async_trait]
impl WishlistRepository for SeaOrmWishlistRepository {
    #[instrument(skip(self, wishlist), fields(wishlist_id = %wishlist.id))]
    async fn upsert(&self, wishlist: Wishlist) -> Result<(), ServiceError> {
        let model: wishlist::ActiveModel = (&wishlist).into();
        wishlist::Entity::insert(model)
            .on_conflict(Self::wishlist_conflict())
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    async fn get(&self, id: &WishlistId) -> Result<Wishlist, ServiceError> {
        wishlist::Entity::find_by_id(id.to_string())
            .one(&*self.db)
            .await?
            .map(Wishlist::from)
            .ok_or(ServiceError::NotFound)
    }

    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Vec<Wishlist>, ServiceError> {
        let rows = wishlist::Entity::find()
            .filter(wishlist::Column::UserId.eq(user_id.as_str()))
            .order_by_asc(wishlist::Column::CreatedAt)
            .order_by_asc(wishlist::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(Wishlist::from).collect())
    }

    #[instrument(skip(self, mutation))]
    async fn modify_wishlist(
        &self,
        id: &WishlistId,
        mutation: WishlistMutation,
    ) -> Result<Wishlist, ServiceError> {
        let id = id.to_string();
        self.access
            .transaction(move |txn| {
                Box::pin(async move {
                    let model = wishlist::Entity::find_by_id(id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or(ServiceError::NotFound)?;

                    let stored = Wishlist::from(model);
                    let mut record = stored.clone();
                    if !mutation(&mut record)? {
                        debug!("modification left wishlist unchanged");
                        return Ok(stored);
                    }
                    let active: wishlist::ActiveModel = (&record).into();
                    active.update(txn).await?;
                    Ok(record)
                })
            })
            .await
    }

    async fn get_wishlist_items(
        &self,
        wishlist_id: &WishlistId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Item>, bool), ServiceError> {
        let rows = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist_id.as_str()))
            .order_by_asc(wishlist_item::Column::CreatedAt)
            .order_by_asc(wishlist_item::Column::Id)
            .offset(offset)
            .limit(limit.saturating_add(1))
            .all(&*self.db)
            .await?;

        let items = rows.into_iter().map(Item::from).collect();
        Ok(split_page(items, limit))
    }

    async fn get_wishlist_item_by_id(&self, id: &ItemId) -> Result<Item, ServiceError> {
        wishlist_item::Entity::find_by_id(id.to_string())
            .one(&*self.db)
            .await?
            .map(Item::from)
            .ok_or(ServiceError::ItemNotFound)
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn upsert_wishlist_item(&self, item: Item) -> Result<(), ServiceError> {
        let model: wishlist_item::ActiveModel = (&item).into();
        wishlist_item::Entity::insert(model)
            .on_conflict(Self::item_conflict())
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, mutation))]
    async fn modify_item(
        &self,
        id: &ItemId,
        mutation: ItemMutation,
    ) -> Result<Item, ServiceError> {
        let id = id.to_string();
        self.access
            .transaction(move |txn| {
                Box::pin(async move {
                    let model = wishlist_item::Entity::find_by_id(id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or(ServiceError::ItemNotFound)?;

                    let stored = Item::from(model);
                    let mut record = stored.clone();
                    if !mutation(&mut record)? {
                        return Ok(stored);
                    }
                    let active: wishlist_item::ActiveModel = (&record).into();
                    active.update(txn).await?;
                    Ok(record)
                })
            })
            .await
    }

    async fn delete_wishlist_item(&self, id: &ItemId) -> Result<(), ServiceError> {
        let result = wishlist_item::Entity::delete_by_id(id.to_string())
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ItemNotFound);
        }
        Ok(())
    }
}
