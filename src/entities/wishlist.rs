use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::models::{ImageId, UserId, Wishlist, WishlistId};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wishlists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(indexed)]
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub avatar: Option<String>,
    pub is_default: bool,
    pub is_archived: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wishlist_item::Entity")]
    Items,
}

impl Related<super::wishlist_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Wishlist {
    fn from(model: Model) -> Self {
        Self {
            id: WishlistId::from(model.id),
            user_id: UserId::from(model.user_id),
            title: model.title,
            description: model.description,
            avatar: model.avatar.map(ImageId::from),
            is_default: model.is_default,
            is_archived: model.is_archived,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Wishlist> for ActiveModel {
    fn from(wishlist: &Wishlist) -> Self {
        Self {
            id: Set(wishlist.id.to_string()),
            user_id: Set(wishlist.user_id.to_string()),
            title: Set(wishlist.title.clone()),
            description: Set(wishlist.description.clone()),
            avatar: Set(wishlist.avatar.as_ref().map(ToString::to_string)),
            is_default: Set(wishlist.is_default),
            is_archived: Set(wishlist.is_archived),
            created_at: Set(wishlist.created_at),
            updated_at: Set(wishlist.updated_at),
        }
    }
}
