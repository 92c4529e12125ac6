//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use cupboard_core::{Email, UserId, Username};

/// A registered storefront user (domain type).
///
/// The password hash is deliberately absent; it is only ever read by the
/// auth service through `UserRepository::get_password_hash`.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Contact email address.
    pub email: Email,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
