use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wishlist API",
        version = "1.0.0",
        description = r#"
# Wishlist API

Users keep wishlists of things they would like to receive. Other users can
book an item to signal they intend to gift it, so nobody buys the same thing
twice.

## Authentication

Every endpoint requires a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures share one body shape:

```json
{
  "error": "Not Found",
  "key": "not_found",
  "message": "incorrect path parameter",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

A malformed id and a missing record produce the same `not_found` response.

## Pagination

Item listings take `limit` (default 20, max 100) and `offset`, and report
`hasMore`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "wishlists", description = "Wishlist management endpoints"),
        (name = "items", description = "Wishlist items and booking")
    ),
    paths(
        // Wishlists
        crate::handlers::wishlists::create_wishlist,
        crate::handlers::wishlists::list_my_wishlists,
        crate::handlers::wishlists::get_wishlist,
        crate::handlers::wishlists::update_wishlist,
        crate::handlers::wishlists::archive_wishlist,
        crate::handlers::wishlists::restore_wishlist,

        // Items
        crate::handlers::items::list_items,
        crate::handlers::items::add_item,
        crate::handlers::items::remove_item,
        crate::handlers::items::book_item,
        crate::handlers::items::unbook_item,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::common::PageParams,

            // Wishlist types
            crate::handlers::wishlists::WishlistResponse,
            crate::handlers::wishlists::CreateWishlistRequest,
            crate::handlers::wishlists::NewWishlist,
            crate::handlers::wishlists::UpdateWishlistRequest,
            crate::handlers::wishlists::WishlistChanges,

            // Item types
            crate::handlers::items::ItemResponse,
            crate::handlers::items::ItemPageResponse,
            crate::handlers::items::AddItemRequest,
            crate::handlers::items::NewItem,

            // Error types
            crate::errors::ErrorResponse,
            crate::errors::ErrorKind
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
