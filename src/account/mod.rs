/// Account management system
///
/// Handles account creation, authentication, session rotation, and profile
/// updates.

pub mod credentials;
mod manager;

pub use manager::AccountManager;

use crate::db::account::AccountView;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Fields collected from the multipart registration form, before media upload
#[derive(Debug, Clone, Validate)]
pub struct Registration {
    #[validate(length(min = 3, max = 32), custom(function = "validate_username"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Usernames are limited to ASCII alphanumerics and underscores
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_shape"))
    }
}

/// A validated registration together with its uploaded media URLs
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub registration: Registration,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Login request: either email or username plus password
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login/refresh response: account view plus the freshly issued pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: AccountView,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token refresh request (token may instead arrive via cookie)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Password change request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// Profile details update request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "ana_v".to_string(),
            email: "ana@example.com".to_string(),
            full_name: "Ana V".to_string(),
            password: "p1-strong-enough".to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn bad_email_rejected() {
        let mut reg = registration();
        reg.email = "not-an-email".to_string();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn username_shape_enforced() {
        let mut reg = registration();
        reg.username = "ana v!".to_string();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn short_password_rejected() {
        let mut reg = registration();
        reg.password = "short".to_string();
        assert!(reg.validate().is_err());
    }
}
