//! Authentication service.
//!
//! Password registration and login. Session handling lives in
//! `middleware::session`; this module only decides who the caller is.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use cupboard_core::{Email, Username, ValidationErrors};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash verified when the username is unknown, so both paths cost one
/// argon2 verification.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("cupboard-timing-equalizer").unwrap_or_default());

/// Raw registration form submission.
#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Registration input after shape validation.
struct ValidRegistration {
    username: Username,
    email: Email,
}

impl Registration {
    /// Check every field, collecting all errors.
    fn validate(&self) -> Result<ValidRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = Username::parse(self.username.trim())
            .map_err(|e| errors.add_error("username", &e))
            .ok();

        let email = Email::parse(self.email.trim())
            .map_err(|e| errors.add_error("email", &e))
            .ok();

        if self.password.is_empty() {
            errors.add("password", "password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }

        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "please confirm your password");
        } else if self.confirm_password != self.password {
            errors.add("confirm_password", "passwords do not match");
        }

        match (username, email) {
            (Some(username), Some(email)) if errors.is_empty() => {
                Ok(ValidRegistration { username, email })
            }
            _ => Err(errors),
        }
    }
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// Field shape is checked first; uniqueness of username and email is only
    /// checked once every field is well-formed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` with every invalid field.
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let valid = form.validate()?;

        let mut errors = ValidationErrors::new();
        if self.users.username_exists(&valid.username).await? {
            errors.add("username", "that username is taken");
        }
        if self.users.email_exists(&valid.email).await? {
            errors.add("email", "that email is already registered");
        }
        errors.into_result()?;

        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create_with_password(&valid.username, &valid.email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(detail) if detail.contains("email") => {
                    AuthError::Validation(ValidationErrors::single(
                        "email",
                        "that email is already registered",
                    ))
                }
                RepositoryError::Conflict(_) => AuthError::Validation(ValidationErrors::single(
                    "username",
                    "that username is taken",
                )),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();

        let mut errors = ValidationErrors::new();
        if username.is_empty() {
            errors.add("username", "username is required");
        }
        if password.is_empty() {
            errors.add("password", "password is required");
        }
        errors.into_result()?;

        let Some((user, password_hash)) = self.users.get_password_hash(username).await? else {
            let _ = verify_password(password, &DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support;

    fn registration(username: &str, email: &str, password: &str, confirm: &str) -> Registration {
        Registration {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm.to_owned(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).is_ok());
        assert!(matches!(
            verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_collects_every_field() {
        let errors = registration("abc", "not-an-email", "12345", "54321")
            .validate()
            .err()
            .unwrap();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("password"));
        assert!(errors.has("confirm_password"));
    }

    #[test]
    fn test_validate_mismatched_confirmation_only() {
        let errors = registration("alice", "alice@example.com", "secret1", "secret2")
            .validate()
            .err()
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first("confirm_password"), Some("passwords do not match"));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let pool = test_support::pool().await;
        let auth = AuthService::new(&pool);

        let user = auth
            .register(&registration("alice", "alice@example.com", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.username.as_str(), "alice");

        let logged_in = auth.login("alice", "secret1").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_username_and_email() {
        let pool = test_support::pool().await;
        let auth = AuthService::new(&pool);
        auth.register(&registration("alice", "alice@example.com", "secret1", "secret1"))
            .await
            .unwrap();

        let err = auth
            .register(&registration("alice", "alice@example.com", "secret1", "secret1"))
            .await
            .unwrap_err();
        let AuthError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has("username"));
        assert!(errors.has("email"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let pool = test_support::pool().await;
        let auth = AuthService::new(&pool);
        auth.register(&registration("alice", "alice@example.com", "secret1", "secret1"))
            .await
            .unwrap();

        let wrong_password = auth.login("alice", "nope").await.unwrap_err();
        let unknown_user = auth.login("mallory", "secret1").await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_blank_fields() {
        let pool = test_support::pool().await;
        let err = AuthService::new(&pool).login("  ", "").await.unwrap_err();
        let AuthError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }
}
