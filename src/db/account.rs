/// Account database models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full account record in the database
///
/// Carries the credential columns; never serialized into a response body.
/// Handlers work with [`AccountView`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: String,
    /// Stored lowercase
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    /// Zero or one live value; the rotation comparison value
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Account view with credential fields stripped
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Minimal public profile used when resolving watch-history owners
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub username: String,
    pub full_name: String,
    pub avatar_url: String,
}

/// Video record referenced by watch history
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
