// Wishlist management
pub mod wishlists;

pub use wishlists::{ItemPage, WishlistService};
