/// Account manager: the session lifecycle core.
///
/// Uses sqlx runtime query building instead of compile-time macros to avoid
/// needing DATABASE_URL during compilation.
use crate::{
    account::{credentials::PasswordDigest, NewAccount},
    db::account::{Account, AccountView},
    error::{ApiError, ApiResult},
    token::{TokenKind, TokenPair, TokenService},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const VIEW_COLUMNS: &str =
    "id, username, email, full_name, avatar_url, cover_image_url, created_at";

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
     cover_image_url, refresh_token, created_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    tokens: Arc<TokenService>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, tokens: Arc<TokenService>) -> Self {
        Self { db, tokens }
    }

    /// Create a new account
    ///
    /// The username is stored lowercase, so the duplicate check on it is
    /// case-insensitive. The password is hashed before anything is persisted.
    pub async fn register(&self, new_account: NewAccount) -> ApiResult<AccountView> {
        let registration = new_account.registration;
        let username = registration.username.to_lowercase();

        if self.username_exists(&username).await? {
            return Err(ApiError::Conflict(format!(
                "Username {} already taken",
                username
            )));
        }

        if self.email_exists(&registration.email).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let digest = PasswordDigest::new(&registration.password)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO account (id, username, email, full_name, password_hash, avatar_url, cover_image_url, refresh_token, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&registration.email)
        .bind(&registration.full_name)
        .bind(digest.as_str())
        .bind(&new_account.avatar_url)
        .bind(&new_account.cover_image_url)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        // Re-fetch the sanitized view; a miss here means the insert was lost
        self.get_view_optional(&id)
            .await?
            .ok_or_else(|| ApiError::Internal("Account missing after creation".to_string()))
    }

    /// Authenticate by username-or-email and issue a session
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> ApiResult<(AccountView, TokenPair)> {
        let account = self.get_account_by_identifier(identifier).await?;

        let digest = PasswordDigest::from_stored(account.password_hash.clone());
        if !digest.verify(password) {
            return Err(ApiError::Authentication("Invalid password".to_string()));
        }

        let pair = self.issue_session(&account.id).await?;
        let view = self.get_view(&account.id).await?;

        Ok((view, pair))
    }

    /// Issue a fresh token pair and persist the refresh token on the account.
    ///
    /// This is the rotation point: the stored value is overwritten, which
    /// also ends any previously active session for the account.
    pub async fn issue_session(&self, account_id: &str) -> ApiResult<TokenPair> {
        let pair = self.tokens.issue_pair(account_id)?;

        sqlx::query("UPDATE account SET refresh_token = ?1 WHERE id = ?2")
            .bind(&pair.refresh_token)
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(pair)
    }

    /// Clear the stored refresh token (logout). Idempotent.
    pub async fn logout(&self, account_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE account SET refresh_token = NULL WHERE id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Rotate a session from a presented refresh token.
    ///
    /// The token must verify in the refresh domain, its account must still
    /// exist, and it must exactly equal the currently stored value. A
    /// superseded token fails here; it never becomes valid again.
    pub async fn refresh_session(
        &self,
        presented: &str,
    ) -> ApiResult<(AccountView, TokenPair)> {
        let claims = self.tokens.verify(TokenKind::Refresh, presented)?;

        let account = self
            .get_account_optional(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::Authentication("Invalid refresh token".to_string()))?;

        if account.refresh_token.as_deref() != Some(presented) {
            return Err(ApiError::Authentication(
                "Refresh token is expired or already used".to_string(),
            ));
        }

        let pair = self.issue_session(&account.id).await?;
        let view = self.get_view(&account.id).await?;

        Ok((view, pair))
    }

    /// Change the account password after verifying the old one
    pub async fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let account = self
            .get_account_optional(account_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        let digest = PasswordDigest::from_stored(account.password_hash);
        if !digest.verify(old_password) {
            return Err(ApiError::Authentication("Invalid password".to_string()));
        }

        let new_digest = PasswordDigest::new(new_password)?;
        sqlx::query("UPDATE account SET password_hash = ?1 WHERE id = ?2")
            .bind(new_digest.as_str())
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Overwrite the display name and email
    pub async fn update_details(
        &self,
        account_id: &str,
        full_name: &str,
        email: &str,
    ) -> ApiResult<AccountView> {
        let taken: Option<String> =
            sqlx::query_scalar("SELECT id FROM account WHERE email = ?1 AND id != ?2")
                .bind(email)
                .bind(account_id)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::Database)?;

        if taken.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        sqlx::query("UPDATE account SET full_name = ?1, email = ?2 WHERE id = ?3")
            .bind(full_name)
            .bind(email)
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_view(account_id).await
    }

    /// Overwrite the avatar reference
    pub async fn set_avatar(&self, account_id: &str, url: &str) -> ApiResult<AccountView> {
        sqlx::query("UPDATE account SET avatar_url = ?1 WHERE id = ?2")
            .bind(url)
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_view(account_id).await
    }

    /// Overwrite the cover image reference
    pub async fn set_cover_image(&self, account_id: &str, url: &str) -> ApiResult<AccountView> {
        sqlx::query("UPDATE account SET cover_image_url = ?1 WHERE id = ?2")
            .bind(url)
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_view(account_id).await
    }

    /// Get the sanitized view of an account
    pub async fn get_view(&self, account_id: &str) -> ApiResult<AccountView> {
        self.get_view_optional(account_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
    }

    /// Get the sanitized view of an account, if it exists
    pub async fn get_view_optional(&self, account_id: &str) -> ApiResult<Option<AccountView>> {
        let view = sqlx::query_as::<_, AccountView>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            VIEW_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(view)
    }

    /// Find an account by username (case-insensitive) or email
    pub async fn get_account_by_identifier(&self, identifier: &str) -> ApiResult<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE username = ?1 OR email = ?2",
            ACCOUNT_COLUMNS
        ))
        .bind(identifier.to_lowercase())
        .bind(identifier)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        account.ok_or_else(|| ApiError::NotFound("Email or username does not exist".to_string()))
    }

    /// Fetch the full account record by id
    async fn get_account_optional(&self, account_id: &str) -> ApiResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(account)
    }

    /// Read the currently stored refresh token
    pub async fn stored_refresh_token(&self, account_id: &str) -> ApiResult<Option<String>> {
        let token: Option<Option<String>> =
            sqlx::query_scalar("SELECT refresh_token FROM account WHERE id = ?1")
                .bind(account_id)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::Database)?;

        Ok(token.flatten())
    }

    /// Check if a username is taken (expects lowercase input)
    async fn username_exists(&self, username: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(count > 0)
    }

    /// Check if an email is registered
    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(count > 0)
    }
}
