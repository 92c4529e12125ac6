//! Session-related types.
//!
//! Types stored in the session for authentication state and one-shot notices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cupboard_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's login name.
    pub username: String,
}

/// Severity of a flash message, used as a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    /// Lowercase name, as rendered into templates.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`FlashLevel`].
#[derive(Debug, thiserror::Error)]
#[error("unknown flash level '{0}' (expected info, success, warning, or error)")]
pub struct UnknownFlashLevel(String);

impl FromStr for FlashLevel {
    type Err = UnknownFlashLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(UnknownFlashLevel(s.to_owned())),
        }
    }
}

/// A one-shot notice shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the per-session CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// Key for pending flash messages.
    pub const FLASHES: &str = "flashes";

    /// Inactivity window in days for a "remember me" login.
    pub const REMEMBER_DAYS: &str = "remember_days";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_level_parse() {
        assert_eq!("info".parse::<FlashLevel>().unwrap(), FlashLevel::Info);
        assert_eq!("WARNING".parse::<FlashLevel>().unwrap(), FlashLevel::Warning);
        assert!("loud".parse::<FlashLevel>().is_err());
    }

    #[test]
    fn test_flash_serde_shape() {
        let flash = Flash::new(FlashLevel::Success, "Cup added");
        let json = serde_json::to_value(&flash).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "level": "success", "message": "Cup added" })
        );
    }
}
