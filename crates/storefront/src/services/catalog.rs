//! Catalog service: filter parsing, item validation, and item creation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::SqlitePool;

use cupboard_core::{Price, ValidationErrors};

use crate::db::{CupRepository, RepositoryError};
use crate::models::{CatalogFilter, Cup, NewCup};
use crate::services::uploads::{ImageStore, UploadError};

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_FACET_CHARS: usize = 50;

/// Raw catalog query parameters, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub color: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl CatalogQuery {
    /// Turn raw parameters into a typed filter.
    ///
    /// Category and color are kept verbatim. Blank price bounds are absent.
    ///
    /// # Errors
    ///
    /// Returns every price bound that is present but not a number.
    pub fn parse(&self) -> Result<CatalogFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let min_price = parse_bound("min_price", self.min_price.as_deref(), &mut errors);
        let max_price = parse_bound("max_price", self.max_price.as_deref(), &mut errors);
        errors.into_result()?;

        Ok(CatalogFilter {
            category: self.category.clone(),
            color: self.color.clone(),
            min_price,
            max_price,
        })
    }
}

fn parse_bound(field: &str, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<Decimal> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Decimal::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, format!("'{raw}' is not a valid price"));
            None
        }
    }
}

/// Raw text fields of the add-cup form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CupForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub color: String,
}

impl CupForm {
    /// Validate every text field, collecting all errors.
    ///
    /// # Errors
    ///
    /// Returns one entry per invalid field.
    pub fn validate(&self) -> Result<NewCup, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required("title", &self.title, MAX_TITLE_CHARS, &mut errors);
        let description = self.description.trim().to_owned();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            errors.add(
                "description",
                format!("description must be at most {MAX_DESCRIPTION_CHARS} characters"),
            );
        }
        let price = Price::parse(&self.price)
            .map_err(|e| errors.add_error("price", &e))
            .ok();
        let category = required("category", &self.category, MAX_FACET_CHARS, &mut errors);
        let color = required("color", &self.color, MAX_FACET_CHARS, &mut errors);

        match price {
            Some(price) if errors.is_empty() => Ok(NewCup {
                title,
                description,
                price,
                category,
                color,
            }),
            _ => Err(errors),
        }
    }
}

fn required(field: &str, raw: &str, max: usize, errors: &mut ValidationErrors) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, format!("{field} is required"));
    } else if value.chars().count() > max {
        errors.add(field, format!("{field} must be at most {max} characters"));
    }
    value.to_owned()
}

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-supplied filename, unsanitized.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Facet values for the filter pickers.
#[derive(Debug, Clone, Default)]
pub struct Facets {
    pub categories: Vec<String>,
    pub colors: Vec<String>,
}

/// Errors from item creation.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Upload(UploadError),
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Catalog operations over the database and image store.
pub struct CatalogService<'a> {
    cups: CupRepository<'a>,
    images: &'a ImageStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, images: &'a ImageStore) -> Self {
        Self {
            cups: CupRepository::new(pool),
            images,
        }
    }

    /// Cups matching `filter`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Cup>, RepositoryError> {
        self.cups.list(filter).await
    }

    /// Distinct categories and colors over the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if either query fails.
    pub async fn facets(&self) -> Result<Facets, RepositoryError> {
        Ok(Facets {
            categories: self.cups.distinct_categories().await?,
            colors: self.cups.distinct_colors().await?,
        })
    }

    /// Validate, store the image, and insert the cup.
    ///
    /// Nothing is written unless every field and the image name are valid.
    /// The stored image is removed again if the insert fails.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` with every invalid field,
    /// `CatalogError::Upload` if the image cannot be written, or
    /// `CatalogError::Repository` if the insert fails.
    pub async fn create(
        &self,
        form: &CupForm,
        image: Option<&ImageUpload>,
    ) -> Result<Cup, CatalogError> {
        let mut errors = ValidationErrors::new();

        let new_cup = form.validate().map_err(|e| errors.extend(e)).ok();

        let image_name = match image {
            None => {
                errors.add("image", "image is required");
                None
            }
            Some(upload) => ImageStore::validate(&upload.filename, &upload.bytes)
                .map_err(|e| errors.add_error("image", &e))
                .ok(),
        };

        let (Some(new_cup), Some(image_name), Some(upload)) = (new_cup, image_name, image) else {
            return Err(CatalogError::Validation(errors));
        };

        let stored = self
            .images
            .store(&image_name, &upload.bytes)
            .await
            .map_err(CatalogError::Upload)?;

        match self.cups.create(&new_cup, &stored).await {
            Ok(cup) => {
                tracing::info!(cup_id = %cup.id, image = %stored, "cup created");
                Ok(cup)
            }
            Err(e) => {
                self.images.remove(&stored).await;
                Err(e.into())
            }
        }
    }
}
