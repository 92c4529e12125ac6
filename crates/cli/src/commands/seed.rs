//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! - title: Mug A
//!   description: Stoneware, 350 ml
//!   price: 9.99
//!   category: mug
//!   color: red
//!   image: images/mug-a.png   # relative to the YAML file
//! ```
//!
//! Every entry is validated with the same rules as the add-cup form before
//! anything is written. Images are copied into the upload directory
//! (`STOREFRONT_UPLOAD_DIR`, default `crates/storefront/static/images`).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use cupboard_storefront::db;
use cupboard_storefront::services::catalog::{CatalogService, CupForm, ImageUpload};
use cupboard_storefront::services::uploads::ImageStore;

const DEFAULT_UPLOAD_DIR: &str = "crates/storefront/static/images";

/// Price as written in YAML: either `9.99` or `"9.99"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedPrice {
    Text(String),
    Number(f64),
}

impl fmt::Display for SeedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One cup entry in the seed file.
#[derive(Debug, Deserialize)]
struct SeedCup {
    title: String,
    #[serde(default)]
    description: String,
    price: SeedPrice,
    category: String,
    color: String,
    image: PathBuf,
}

/// A seed entry ready to insert.
#[derive(Debug)]
struct SeedEntry {
    form: CupForm,
    image: ImageUpload,
}

/// Errors found while loading the seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} invalid entries")]
    Invalid(usize),
}

/// Read and validate every entry, reading image bytes from disk.
async fn load_entries(file: &Path) -> Result<Vec<SeedEntry>, SeedError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| SeedError::Read {
            path: file.to_owned(),
            source,
        })?;
    let cups: Vec<SeedCup> = serde_yaml::from_str(&content)?;
    let base_dir = file.parent().unwrap_or_else(|| Path::new("."));

    let mut entries = Vec::with_capacity(cups.len());
    let mut invalid = 0;

    for (index, cup) in cups.into_iter().enumerate() {
        let form = CupForm {
            title: cup.title,
            description: cup.description,
            price: cup.price.to_string(),
            category: cup.category,
            color: cup.color,
        };

        if let Err(errors) = form.validate() {
            error!(entry = index + 1, title = %form.title, "invalid entry: {errors}");
            invalid += 1;
            continue;
        }

        let image_path = base_dir.join(&cup.image);
        let bytes = match tokio::fs::read(&image_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(entry = index + 1, path = %image_path.display(), "cannot read image: {e}");
                invalid += 1;
                continue;
            }
        };

        let filename = cup.image.to_string_lossy().into_owned();
        if let Err(e) = ImageStore::validate(&filename, &bytes) {
            error!(entry = index + 1, path = %image_path.display(), "invalid image: {e}");
            invalid += 1;
            continue;
        }

        entries.push(SeedEntry {
            form,
            image: ImageUpload { filename, bytes },
        });
    }

    if invalid > 0 {
        return Err(SeedError::Invalid(invalid));
    }
    Ok(entries)
}

/// Seed cups from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, the database
/// URL is missing, or a write fails.
pub async fn run(file: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    info!(path = %file.display(), "Loading cups from file");
    let entries = load_entries(file).await?;
    info!(cups = entries.len(), "Seed file validated");

    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let database_url = super::database_url()?;
    let upload_dir =
        std::env::var("STOREFRONT_UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_owned());

    let pool = db::create_pool(&database_url).await?;
    let images = ImageStore::new(upload_dir);
    let catalog = CatalogService::new(&pool, &images);

    for entry in &entries {
        let cup = catalog.create(&entry.form, Some(&entry.image)).await?;
        info!(cup_id = %cup.id, title = %cup.title, image = %cup.image, "Inserted cup");
    }

    info!("Seeding complete! {} cups inserted", entries.len());
    Ok(())
}
