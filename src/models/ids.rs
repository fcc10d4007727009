use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest identifier accepted from a request path.
pub const MAX_ID_LEN: usize = 64;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("id pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidId {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier exceeds {} characters", MAX_ID_LEN)]
    TooLong,
    #[error("identifier contains unsupported characters")]
    Malformed,
}

/// Checks that a raw identifier is non-empty, bounded and URL-safe.
pub fn validate_raw_id(raw: &str) -> Result<(), InvalidId> {
    if raw.is_empty() {
        return Err(InvalidId::Empty);
    }
    if raw.len() > MAX_ID_LEN {
        return Err(InvalidId::TooLong);
    }
    if !ID_PATTERN.is_match(raw) {
        return Err(InvalidId::Malformed);
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Parses an identifier taken from untrusted input.
            pub fn parse(raw: &str) -> Result<Self, InvalidId> {
                validate_raw_id(raw)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a wishlist.
    WishlistId
);
string_id!(
    /// Identifier of an item inside a wishlist.
    ItemId
);
string_id!(
    /// Identifier of a user, taken from the `sub` claim of the access token.
    UserId
);
string_id!(
    /// Reference to an image owned by the image service.
    ImageId
);
