//! Cupboard Core - Shared domain types.
//!
//! This crate provides the types used across all Cupboard components:
//! - `storefront` - Catalog site, JSON API, and authentication
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no
//! database access, no HTTP. The optional `sqlite` feature adds sqlx
//! encode/decode support for the ID and email newtypes.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, usernames, emails, prices, and
//!   field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
