pub mod wishlist;
pub mod wishlist_item;
