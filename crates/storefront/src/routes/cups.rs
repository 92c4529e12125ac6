//! Item creation route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use cupboard_core::ValidationErrors;

use super::PageContext;
use crate::error::AppError;
use crate::filters;
use crate::middleware::session::push_flash;
use crate::middleware::{RequireAuth, verify_csrf};
use crate::models::{Flash, FlashLevel};
use crate::services::catalog::{CatalogError, CatalogService, CupForm, ImageUpload};
use crate::services::uploads::ALLOWED_EXTENSIONS;
use crate::state::AppState;

/// Add-cup form template.
#[derive(Template, WebTemplate)]
#[template(path = "cups/new.html")]
pub struct NewCupTemplate {
    pub page: PageContext,
    pub form: CupForm,
    pub accept: String,
    pub errors: ValidationErrors,
}

impl NewCupTemplate {
    fn new(page: PageContext, form: CupForm, errors: ValidationErrors) -> Self {
        let accept = ALLOWED_EXTENSIONS
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            page,
            form,
            accept,
            errors,
        }
    }
}

/// The decoded multipart body of the add-cup form.
#[derive(Debug, Default)]
struct CupSubmission {
    csrf_token: Option<String>,
    form: CupForm,
    image: Option<ImageUpload>,
}

impl CupSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == "image" {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                // A file input left empty still submits a nameless part
                if !filename.is_empty() || !bytes.is_empty() {
                    submission.image = Some(ImageUpload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let value = field.text().await?;
            let form = &mut submission.form;
            match name.as_str() {
                "csrf_token" => submission.csrf_token = Some(value),
                "title" => form.title = value,
                "description" => form.description = value,
                "price" => form.price = value,
                "category" => form.category = value,
                "color" => form.color = value,
                _ => {}
            }
        }

        Ok(submission)
    }
}

/// Display the add-cup form.
#[instrument(skip_all)]
pub async fn add_cup_page(
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let page = PageContext::load(&session, Some(user)).await?;
    Ok(NewCupTemplate::new(page, CupForm::default(), ValidationErrors::new()).into_response())
}

/// Handle the add-cup form.
///
/// On success the new cup is stored and the user is sent back to the
/// catalog. Invalid input redisplays the form with every problem listed and
/// stores nothing.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_cup(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submission = CupSubmission::read(multipart).await?;
    verify_csrf(&session, submission.csrf_token.as_deref()).await?;

    let catalog = CatalogService::new(state.pool(), state.images());
    match catalog
        .create(&submission.form, submission.image.as_ref())
        .await
    {
        Ok(cup) => {
            push_flash(
                &session,
                Flash::new(FlashLevel::Success, format!("Added \"{}\".", cup.title)),
            )
            .await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(CatalogError::Validation(errors)) => {
            let page = PageContext::load(&session, Some(user)).await?;
            let template = NewCupTemplate::new(page, submission.form, errors);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
