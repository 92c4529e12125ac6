//! Cup repository: catalog listing, facets, and inserts.

use chrono::{DateTime, Utc};
use cupboard_core::{CupId, Price};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::RepositoryError;
use crate::models::{CatalogFilter, Cup, NewCup};

const CUP_COLUMNS: &str = "id, title, description, price_cents, image, category, color, created_at";

#[derive(Debug, FromRow)]
struct CupRow {
    id: CupId,
    title: String,
    description: String,
    price_cents: i64,
    image: String,
    category: String,
    color: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CupRow> for Cup {
    type Error = RepositoryError;

    fn try_from(r: CupRow) -> Result<Self, Self::Error> {
        let price = Price::from_cents(r.price_cents).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for cup {}: {e}", r.id))
        })?;

        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            price,
            image: r.image,
            category: r.category,
            color: r.color,
            created_at: r.created_at,
        })
    }
}

/// Repository for catalog items.
pub struct CupRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CupRepository<'a> {
    /// Create a new cup repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List cups matching every constraint in `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn list(&self, filter: &CatalogFilter) -> Result<Vec<Cup>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {CUP_COLUMNS} FROM cup WHERE 1 = 1"));

        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(color) = &filter.color {
            qb.push(" AND color = ").push_bind(color.as_str());
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND price_cents >= ")
                .push_bind(Price::cents_at_least(min));
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price_cents <= ")
                .push_bind(Price::cents_at_most(max));
        }
        qb.push(" ORDER BY id ASC");

        let rows: Vec<CupRow> = qb.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(Cup::try_from).collect()
    }

    /// Get a cup by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CupId) -> Result<Option<Cup>, RepositoryError> {
        let row: Option<CupRow> =
            sqlx::query_as(&format!("SELECT {CUP_COLUMNS} FROM cup WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(Cup::try_from).transpose()
    }

    /// Insert a validated cup whose image is already stored as `image`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, cup: &NewCup, image: &str) -> Result<Cup, RepositoryError> {
        let row: CupRow = sqlx::query_as(&format!(
            r"
            INSERT INTO cup (title, description, price_cents, image, category, color, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {CUP_COLUMNS}
            "
        ))
        .bind(&cup.title)
        .bind(&cup.description)
        .bind(cup.price.cents())
        .bind(image)
        .bind(&cup.category)
        .bind(&cup.color)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Cup::try_from(row)
    }

    /// Distinct categories over the whole catalog, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn distinct_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let values = sqlx::query_scalar("SELECT DISTINCT category FROM cup ORDER BY category ASC")
            .fetch_all(self.pool)
            .await?;
        Ok(values)
    }

    /// Distinct colors over the whole catalog, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn distinct_colors(&self) -> Result<Vec<String>, RepositoryError> {
        let values = sqlx::query_scalar("SELECT DISTINCT color FROM cup ORDER BY color ASC")
            .fetch_all(self.pool)
            .await?;
        Ok(values)
    }

    /// Total number of cups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM cup")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::db::test_support;

    fn cup(title: &str, price: &str, category: &str, color: &str) -> NewCup {
        NewCup {
            title: title.to_owned(),
            description: String::new(),
            price: Price::parse(price).unwrap(),
            category: category.to_owned(),
            color: color.to_owned(),
        }
    }

    async fn seeded() -> SqlitePool {
        let pool = test_support::pool().await;
        let repo = CupRepository::new(&pool);
        repo.create(&cup("A", "5", "mug", "red"), "a.png").await.unwrap();
        repo.create(&cup("B", "15", "mug", "blue"), "b.png").await.unwrap();
        repo.create(&cup("C", "25", "tea", "red"), "c.png").await.unwrap();
        pool
    }

    fn titles(cups: &[Cup]) -> Vec<&str> {
        cups.iter().map(|c| c.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_without_filter_returns_all_in_id_order() {
        let pool = seeded().await;
        let cups = CupRepository::new(&pool)
            .list(&CatalogFilter::default())
            .await
            .unwrap();
        assert_eq!(titles(&cups), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_list_filters_are_conjunctive() {
        let pool = seeded().await;
        let repo = CupRepository::new(&pool);
        let filter = CatalogFilter {
            category: Some("mug".to_owned()),
            color: Some("red".to_owned()),
            ..CatalogFilter::default()
        };
        assert_eq!(titles(&repo.list(&filter).await.unwrap()), ["A"]);
    }

    #[tokio::test]
    async fn test_list_price_bounds_are_inclusive() {
        let pool = seeded().await;
        let repo = CupRepository::new(&pool);
        let filter = CatalogFilter {
            min_price: Some(Decimal::from(5)),
            max_price: Some(Decimal::from(15)),
            ..CatalogFilter::default()
        };
        assert_eq!(titles(&repo.list(&filter).await.unwrap()), ["A", "B"]);

        let fractional = CatalogFilter {
            min_price: Some(Decimal::from_str("14.999").unwrap()),
            ..CatalogFilter::default()
        };
        assert_eq!(titles(&repo.list(&fractional).await.unwrap()), ["B", "C"]);
    }

    #[tokio::test]
    async fn test_empty_category_is_literal() {
        let pool = seeded().await;
        let filter = CatalogFilter {
            category: Some(String::new()),
            ..CatalogFilter::default()
        };
        let cups = CupRepository::new(&pool).list(&filter).await.unwrap();
        assert!(cups.is_empty());
    }

    #[tokio::test]
    async fn test_facets_are_distinct_and_sorted() {
        let pool = seeded().await;
        let repo = CupRepository::new(&pool);
        assert_eq!(repo.distinct_categories().await.unwrap(), ["mug", "tea"]);
        assert_eq!(repo.distinct_colors().await.unwrap(), ["blue", "red"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let pool = seeded().await;
        let repo = CupRepository::new(&pool);
        assert!(repo.get(CupId::new(99)).await.unwrap().is_none());
        let b = repo.get(CupId::new(2)).await.unwrap().unwrap();
        assert_eq!(b.price.cents(), 1500);
    }
}
