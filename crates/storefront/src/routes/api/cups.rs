//! Catalog JSON endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use cupboard_core::CupId;

use super::ApiError;
use crate::db::CupRepository;
use crate::models::Cup;
use crate::services::catalog::CatalogQuery;
use crate::services::uploads::image_url;
use crate::state::AppState;

/// Wire shape of a cup.
#[derive(Debug, Serialize)]
pub struct CupJson {
    pub id: CupId,
    pub title: String,
    pub description: String,
    pub price: f64,
    /// Absolute URL of the image.
    pub image: String,
    pub category: String,
    pub color: String,
}

impl CupJson {
    fn new(cup: Cup, state: &AppState) -> Self {
        Self {
            id: cup.id,
            price: cup.price.to_f64(),
            image: image_url(&state.config().base_url, &cup.image).into(),
            title: cup.title,
            description: cup.description,
            category: cup.category,
            color: cup.color,
        }
    }
}

/// `GET /api/cups` - cups matching the query filters, oldest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<CupJson>>, ApiError> {
    let filter = query.parse().map_err(ApiError::Validation)?;
    let cups = CupRepository::new(state.pool()).list(&filter).await?;

    Ok(Json(
        cups.into_iter()
            .map(|cup| CupJson::new(cup, &state))
            .collect(),
    ))
}

/// `GET /api/cups/{id}` - a single cup.
///
/// Anything that is not a known integer ID is a 404.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<CupJson>, ApiError> {
    let not_found = || ApiError::NotFound(format!("cup {raw_id} not found"));

    let id = raw_id.parse::<i64>().map(CupId::new).map_err(|_| not_found())?;
    let cup = CupRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(CupJson::new(cup, &state)))
}
