use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::models::{Item, ItemId, UserId, WishlistId};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wishlist_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(indexed)]
    pub wishlist_id: String,
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub is_booking_available: bool,
    pub is_booked_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wishlist::Entity",
        from = "Column::WishlistId",
        to = "super::wishlist::Column::Id"
    )]
    Wishlist,
}

impl Related<super::wishlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wishlist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Item {
    fn from(model: Model) -> Self {
        Self {
            id: ItemId::from(model.id),
            wishlist_id: WishlistId::from(model.wishlist_id),
            title: model.title,
            description: model.description,
            link: model.link,
            is_booking_available: model.is_booking_available,
            is_booked_by: model.is_booked_by.map(UserId::from),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Item> for ActiveModel {
    fn from(item: &Item) -> Self {
        Self {
            id: Set(item.id.to_string()),
            wishlist_id: Set(item.wishlist_id.to_string()),
            title: Set(item.title.clone()),
            description: Set(item.description.clone()),
            link: Set(item.link.clone()),
            is_booking_available: Set(item.is_booking_available),
            is_booked_by: Set(item.is_booked_by.as_ref().map(ToString::to_string)),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        }
    }
}
