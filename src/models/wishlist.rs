use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ImageId, ItemId, UserId, WishlistId};
use crate::errors::{ServiceError, FOREIGN_BOOKING_MESSAGE};

/// Timestamps never move backwards, even if the wall clock does.
fn next_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous)
}

/// A named collection of items owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub id: WishlistId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub avatar: Option<ImageId>,
    /// At most one default wishlist per user is expected; callers keep that true.
    pub is_default: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wishlist {
    /// Unsaved wishlist; the service assigns the id and timestamps on create.
    pub fn new(user_id: UserId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WishlistId::default(),
            user_id,
            title: title.into(),
            description: String::new(),
            avatar: None,
            is_default: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = next_stamp(self.updated_at, now);
    }

    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.is_archived = true;
        self.touch(now);
    }

    pub fn restore(&mut self, now: DateTime<Utc>) {
        self.is_archived = false;
        self.touch(now);
    }
}

/// A single entry of a wishlist that other users may book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub wishlist_id: WishlistId,
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub is_booking_available: bool,
    pub is_booked_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Unsaved, unbooked item open for booking.
    pub fn new(wishlist_id: WishlistId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::default(),
            wishlist_id,
            title: title.into(),
            description: String::new(),
            link: None,
            is_booking_available: true,
            is_booked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_booked(&self) -> bool {
        self.is_booked_by.is_some()
    }

    pub fn is_booked_by_user(&self, user_id: &UserId) -> bool {
        self.is_booked_by.as_ref() == Some(user_id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = next_stamp(self.updated_at, now);
    }

    /// Books the item for `user_id`.
    ///
    /// Returns `Ok(true)` when the item changed and `Ok(false)` when the same
    /// user already holds the booking. The availability gate is checked first,
    /// so a closed item fails even for its current booker.
    pub fn book(&mut self, user_id: &UserId, now: DateTime<Utc>) -> Result<bool, ServiceError> {
        if !self.is_booking_available {
            return Err(ServiceError::BookingNotAvailable);
        }

        match &self.is_booked_by {
            Some(current) if current == user_id => Ok(false),
            Some(_) => Err(ServiceError::AlreadyBooked),
            None => {
                self.is_booked_by = Some(user_id.clone());
                self.touch(now);
                Ok(true)
            }
        }
    }

    /// Clears any booking. Returns `false` if the item was not booked.
    pub fn unbook(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_booked_by.take().is_none() {
            return false;
        }
        self.touch(now);
        true
    }

    /// Clears the booking on behalf of `user_id`, who must hold it unless
    /// they own the wishlist.
    pub fn unbook_as(
        &mut self,
        user_id: &UserId,
        is_owner: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        match &self.is_booked_by {
            Some(current) if current != user_id && !is_owner => {
                Err(ServiceError::PermissionDenied(FOREIGN_BOOKING_MESSAGE))
            }
            _ => Ok(self.unbook(now)),
        }
    }
}
