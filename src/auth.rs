/// Authentication extractors
use crate::{
    api::middleware::extract_access_token,
    context::AppContext,
    db::account::AccountView,
    error::ApiError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context: extracts and verifies the access token from the
/// request and resolves the account behind it.
///
/// The token is read from the `accessToken` cookie or the `Authorization`
/// bearer header, the cookie taking precedence. The resolved view carries no
/// credential fields.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: AccountView,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Missing access token".to_string()))?;

        let claims = state
            .tokens
            .verify(crate::token::TokenKind::Access, &token)?;

        // Access tokens are stateless; the account lookup only confirms the
        // subject still exists
        let account = state
            .accounts
            .get_view_optional(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::Authentication("Invalid access token".to_string()))?;

        Ok(AuthContext { account })
    }
}

/// Optional authenticated context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await.ok();
        Ok(OptionalAuthContext { auth })
    }
}
