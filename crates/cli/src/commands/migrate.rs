//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cupboard-cli migrate
//! ```
//!
//! Applies the SQL migrations in `crates/storefront/migrations/` and creates
//! the session table used by the storefront.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `SQLite` connection string,
//!   e.g. `sqlite://cupboard.db`. The file is created if missing.

use tracing::info;

use cupboard_storefront::db;

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = super::database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    db::migrate(&pool).await?;

    info!("Storefront migrations complete!");
    Ok(())
}
