//! Authentication route handlers.
//!
//! Registration, password login with optional "remember me", and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cupboard_core::ValidationErrors;

use super::PageContext;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::{is_safe_next, resolve_next};
use crate::middleware::session::{log_in, log_out, push_flash};
use crate::middleware::{OptionalAuth, RequireAuth, verify_csrf};
use crate::models::{CurrentUser, Flash, FlashLevel};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox: present when ticked.
    pub remember: Option<String>,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub csrf_token: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// `?next=` on the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: Option<String>,
    pub error: Option<String>,
    pub errors: ValidationErrors,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub username: String,
    pub email: String,
    pub errors: ValidationErrors,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(session, user))]
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(LoginTemplate {
        page: PageContext::load(&session, None).await?,
        next: query.next.filter(|n| is_safe_next(n)),
        error: None,
        errors: ValidationErrors::new(),
    }
    .into_response())
}

/// Handle login form submission.
///
/// Wrong username and wrong password render the same page with the same
/// status, and the submitted username is not echoed back.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    let next = form.next.or(query.next).filter(|n| is_safe_next(n));

    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("login failed");
            let template = LoginTemplate {
                page: PageContext::load(&session, None).await?,
                next,
                error: Some(INVALID_CREDENTIALS.to_owned()),
                errors: ValidationErrors::new(),
            };
            return Ok((StatusCode::UNAUTHORIZED, template).into_response());
        }
        Err(AuthError::Validation(errors)) => {
            let template = LoginTemplate {
                page: PageContext::load(&session, None).await?,
                next,
                error: None,
                errors,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser {
        id: user.id,
        username: user.username.to_string(),
    };
    let remember_days = form
        .remember
        .is_some()
        .then_some(state.config().remember_days);
    log_in(&session, &current, remember_days).await?;
    set_sentry_user(&current.id, &current.username);

    tracing::info!(user_id = %current.id, remember = remember_days.is_some(), "user logged in");

    Ok(Redirect::to(resolve_next(next.as_deref())).into_response())
}

/// Log out and return to the catalog.
#[instrument(skip_all)]
pub async fn logout(
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    log_out(&session).await?;
    clear_sentry_user();
    push_flash(
        &session,
        Flash::new(FlashLevel::Info, "You have been logged out."),
    )
    .await?;

    tracing::info!(user_id = %user.id, "user logged out");
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(session, user))]
pub async fn register_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(RegisterTemplate {
        page: PageContext::load(&session, None).await?,
        username: String::new(),
        email: String::new(),
        errors: ValidationErrors::new(),
    }
    .into_response())
}

/// Handle registration form submission.
///
/// Every invalid field is reported at once. On success the user is sent to
/// the login page.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    let registration = Registration {
        username: form.username,
        email: form.email,
        password: form.password,
        confirm_password: form.confirm_password,
    };

    match AuthService::new(state.pool()).register(&registration).await {
        Ok(_) => {
            push_flash(
                &session,
                Flash::new(
                    FlashLevel::Success,
                    "Registration successful. You can now log in.",
                ),
            )
            .await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            let template = RegisterTemplate {
                page: PageContext::load(&session, None).await?,
                username: registration.username,
                email: registration.email,
                errors,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
