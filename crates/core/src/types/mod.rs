//! Core types for Cupboard.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod username;
pub mod validation;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use username::{Username, UsernameError};
pub use validation::ValidationErrors;
