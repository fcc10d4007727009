pub mod common;
pub mod guard;
pub mod items;
pub mod wishlists;

use std::sync::Arc;

use crate::repositories::WishlistRepository;
use crate::services::WishlistService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub wishlists: Arc<WishlistService>,
}

impl AppServices {
    /// Build the service container on top of a storage adapter.
    pub fn new(repository: Arc<dyn WishlistRepository>) -> Self {
        Self {
            wishlists: Arc::new(WishlistService::new(repository)),
        }
    }
}
