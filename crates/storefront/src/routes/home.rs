//! Catalog page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use cupboard_core::ValidationErrors;

use super::PageContext;
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Cup;
use crate::services::catalog::{CatalogQuery, CatalogService, Facets};
use crate::services::uploads::IMAGES_PATH;
use crate::state::AppState;

/// A cup as shown on the catalog page.
pub struct CupCard {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_src: String,
    pub category: String,
    pub color: String,
}

impl From<Cup> for CupCard {
    fn from(cup: Cup) -> Self {
        Self {
            id: cup.id.as_i64(),
            image_src: format!("{IMAGES_PATH}/{}", urlencoding::encode(&cup.image)),
            price: cup.price.to_string(),
            title: cup.title,
            description: cup.description,
            category: cup.category,
            color: cup.color,
        }
    }
}

/// One entry in a facet picker.
pub struct FacetOption {
    pub value: String,
    pub selected: bool,
}

fn facet_options(values: Vec<String>, current: Option<&str>) -> Vec<FacetOption> {
    values
        .into_iter()
        .map(|value| FacetOption {
            selected: current == Some(value.as_str()),
            value,
        })
        .collect()
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub cups: Vec<CupCard>,
    pub categories: Vec<FacetOption>,
    pub colors: Vec<FacetOption>,
    pub category_chosen: bool,
    pub color_chosen: bool,
    pub min_price: String,
    pub max_price: String,
    pub is_filtered: bool,
    pub errors: ValidationErrors,
}

/// Display the catalog, narrowed by any filters in the query string.
///
/// Facet pickers always list every value in the catalog. An unparseable price
/// bound shows the page with field messages and no items.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, AppError> {
    let catalog = CatalogService::new(state.pool(), state.images());
    let Facets { categories, colors } = catalog.facets().await?;

    let (cups, errors, is_filtered) = match query.parse() {
        Ok(filter) => {
            let cups = catalog.list(&filter).await?;
            (cups, ValidationErrors::new(), !filter.is_empty())
        }
        Err(errors) => (Vec::new(), errors, true),
    };

    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    let categories = facet_options(categories, query.category.as_deref());
    let colors = facet_options(colors, query.color.as_deref());

    let template = IndexTemplate {
        page: PageContext::load(&session, user).await?,
        cups: cups.into_iter().map(CupCard::from).collect(),
        category_chosen: categories.iter().any(|o| o.selected),
        color_chosen: colors.iter().any(|o| o.selected),
        categories,
        colors,
        min_price: query.min_price.unwrap_or_default(),
        max_price: query.max_price.unwrap_or_default(),
        is_filtered,
        errors,
    };

    Ok((status, template).into_response())
}
