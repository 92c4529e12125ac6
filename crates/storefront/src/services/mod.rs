//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `catalog` - Filter parsing, facets, and item creation
//! - `uploads` - Image filename sanitization and storage

pub mod auth;
pub mod catalog;
pub mod uploads;
