#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware,
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use wishlist_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db::{self, DbConfig},
    errors::ServiceError,
    handlers::AppServices,
    models::{Item, ItemId, UserId, Wishlist, WishlistId},
    repositories::{
        InMemoryWishlistRepository, ItemMutation, SeaOrmWishlistRepository, WishlistMutation,
        WishlistRepository,
    },
    AppState,
};

pub const TEST_JWT_SECRET: &str =
    "Zq8vN3rT6yW1uB4xK7mP0sD5fG2hJ9lA_wishlist_test_secret_Xc3Vb6Nm9Qe2Rt";

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_JWT_SECRET.to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.storage_backend = "memory".to_string();
    cfg.api_default_page_size = 2;
    cfg.api_max_page_size = 5;
    cfg
}

/// In-memory SQLite pool with the schema applied.
pub async fn sqlite_pool() -> db::DbPool {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..DbConfig::default()
    })
    .await
    .expect("failed to open sqlite test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");
    pool
}

/// Helper harness for driving the v1 router without a network listener.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
}

impl TestApp {
    /// Application backed by the in-memory repository.
    pub async fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryWishlistRepository::new())).await
    }

    /// Application backed by the sea-orm repository over in-memory SQLite.
    pub async fn sqlite() -> Self {
        let pool = Arc::new(sqlite_pool().await);
        let repository: Arc<dyn WishlistRepository> =
            Arc::new(SeaOrmWishlistRepository::new(pool.clone()));
        Self::build(repository, Some(pool))
    }

    pub async fn with_repository(repository: Arc<dyn WishlistRepository>) -> Self {
        Self::build(repository, None)
    }

    fn build(repository: Arc<dyn WishlistRepository>, db: Option<Arc<db::DbPool>>) -> Self {
        let mut cfg = test_config();
        if db.is_some() {
            cfg.storage_backend = "database".to_string();
        }
        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));

        let state = AppState {
            db,
            config: cfg,
            services: AppServices::new(repository),
        };

        let api_router = wishlist_api::api_v1_routes().layer(middleware::from_fn_with_state(
            auth_service.clone(),
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: Request<Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ));

        Self {
            router: Router::new().nest("/api/v1", api_router).with_state(state.clone()),
            state,
            auth_service,
        }
    }

    /// Bearer token for `user_id`.
    pub fn token_for(&self, user_id: &str) -> String {
        self.auth_service
            .generate_token(&UserId::new(user_id))
            .expect("issue test token")
            .access_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Authenticated request as `user_id`.
    pub async fn request_as(
        &self,
        user_id: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.token_for(user_id);
        self.request(method, uri, body, Some(&token)).await
    }

    /// Authenticated request with a raw, possibly malformed, body.
    pub async fn request_raw_as(
        &self,
        user_id: &str,
        method: Method,
        uri: &str,
        raw_body: &'static str,
    ) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token_for(user_id)))
            .header("content-type", "application/json")
            .body(Body::from(raw_body))
            .expect("failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a wishlist through the API and returns its id.
    pub async fn create_wishlist(&self, owner: &str, title: &str) -> String {
        let response = self
            .request_as(
                owner,
                Method::POST,
                "/api/v1/wishlists",
                Some(serde_json::json!({ "wishlist": { "title": title } })),
            )
            .await;
        assert_eq!(response.status(), 201, "wishlist creation should succeed");
        let body = response_json(response).await;
        body["data"]["id"]
            .as_str()
            .expect("created wishlist id")
            .to_string()
    }

    /// Adds an item through the API and returns its id.
    pub async fn add_item(&self, owner: &str, wishlist_id: &str, item: Value) -> String {
        let response = self
            .request_as(
                owner,
                Method::POST,
                &format!("/api/v1/wishlists/{wishlist_id}/items"),
                Some(serde_json::json!({ "item": item })),
            )
            .await;
        assert_eq!(response.status(), 201, "item creation should succeed");
        let body = response_json(response).await;
        body["data"]["id"]
            .as_str()
            .expect("created item id")
            .to_string()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}

/// Repository wrapper whose reads or writes can be switched to fail, or
/// which lets another writer land right after a read.
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryWishlistRepository,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    /// Archive the wishlist once, right after the next `get` returns.
    pub archive_after_read: AtomicBool,
    /// Book the item for this user once, right after the next item read.
    pub book_after_item_read: Mutex<Option<UserId>>,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryWishlistRepository {
        &self.inner
    }

    fn check_read(&self) -> Result<(), ServiceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ServiceError::StorageError("read failure injected".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), ServiceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::StorageError("write failure injected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl WishlistRepository for FlakyRepository {
    async fn upsert(&self, wishlist: Wishlist) -> Result<(), ServiceError> {
        self.check_write()?;
        self.inner.upsert(wishlist).await
    }

    async fn get(&self, id: &WishlistId) -> Result<Wishlist, ServiceError> {
        self.check_read()?;
        let wishlist = self.inner.get(id).await?;
        if self.archive_after_read.swap(false, Ordering::SeqCst) {
            self.inner
                .modify_wishlist(
                    id,
                    Box::new(|w| {
                        w.archive(chrono::Utc::now());
                        Ok(true)
                    }),
                )
                .await?;
        }
        Ok(wishlist)
    }

    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Vec<Wishlist>, ServiceError> {
        self.check_read()?;
        self.inner.get_by_user_id(user_id).await
    }

    async fn modify_wishlist(
        &self,
        id: &WishlistId,
        mutation: WishlistMutation,
    ) -> Result<Wishlist, ServiceError> {
        self.check_write()?;
        self.inner.modify_wishlist(id, mutation).await
    }

    async fn get_wishlist_items(
        &self,
        wishlist_id: &WishlistId,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Item>, bool), ServiceError> {
        self.check_read()?;
        self.inner
            .get_wishlist_items(wishlist_id, limit, offset)
            .await
    }

    async fn get_wishlist_item_by_id(&self, id: &ItemId) -> Result<Item, ServiceError> {
        self.check_read()?;
        let item = self.inner.get_wishlist_item_by_id(id).await?;
        let booker = self
            .book_after_item_read
            .lock()
            .expect("booker lock")
            .take();
        if let Some(booker) = booker {
            self.inner
                .modify_item(
                    id,
                    Box::new(move |item| item.book(&booker, chrono::Utc::now())),
                )
                .await?;
        }
        Ok(item)
    }

    async fn upsert_wishlist_item(&self, item: Item) -> Result<(), ServiceError> {
        self.check_write()?;
        self.inner.upsert_wishlist_item(item).await
    }

    async fn modify_item(&self, id: &ItemId, mutation: ItemMutation) -> Result<Item, ServiceError> {
        self.check_write()?;
        self.inner.modify_item(id, mutation).await
    }

    async fn delete_wishlist_item(&self, id: &ItemId) -> Result<(), ServiceError> {
        self.check_write()?;
        self.inner.delete_wishlist_item(id).await
    }
}
