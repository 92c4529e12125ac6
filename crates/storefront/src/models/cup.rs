//! Catalog item domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use cupboard_core::{CupId, Price};

/// A cup in the catalog (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cup {
    /// Unique cup ID.
    pub id: CupId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Non-negative price.
    pub price: Price,
    /// Stored filename in the upload directory.
    pub image: String,
    /// Category facet value.
    pub category: String,
    /// Color facet value.
    pub color: String,
    /// When the cup was added.
    pub created_at: DateTime<Utc>,
}

/// A validated cup that has not been stored yet.
///
/// Built by `services::catalog::CupForm::validate`. The stored image name
/// is passed to `CupRepository::create` alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCup {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub color: String,
}

/// Conjunctive catalog filter. `None` means "no constraint".
///
/// Category and color match exactly, so `Some("")` only matches items whose
/// value is the empty string. Price bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub color: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl CatalogFilter {
    /// True when no constraint is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.color.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }
}
