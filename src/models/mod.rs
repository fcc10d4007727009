// Domain models
pub mod ids;
pub mod wishlist;

pub use ids::{ImageId, InvalidId, ItemId, UserId, WishlistId};
pub use wishlist::{Item, Wishlist};
