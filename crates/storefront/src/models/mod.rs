//! Domain models for storefront.
//!
//! - [`user`] - Registered accounts
//! - [`cup`] - Catalog items
//! - [`session`] - Values kept in the server-side session

pub mod cup;
pub mod session;
pub mod user;

pub use cup::{CatalogFilter, Cup, NewCup};
pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
pub use user::User;
