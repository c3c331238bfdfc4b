/// Account endpoints under /api/v1/users
use crate::{
    account::{
        ChangePasswordRequest, LoginRequest, NewAccount, RefreshRequest, Registration,
        SessionResponse, UpdateAccountRequest,
    },
    auth::{AuthContext, OptionalAuthContext},
    channel::{ChannelProfile, WatchHistoryEntry},
    context::AppContext,
    db::account::AccountView,
    error::{ApiError, ApiResult},
    media::UploadedFile,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use validator::Validate;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refreshToken", post(refresh_token))
        .route("/resetPassword", post(reset_password))
        .route("/currentUser", get(current_user))
        .route("/updateAccount", post(update_account))
        .route("/avatar", post(update_avatar))
        .route("/coverImage", post(update_cover_image))
        .route("/channel/:username", get(channel_profile))
        .route("/watchHistory", get(watch_history))
}

/// Session cookie with the flags required for bearer tokens
fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

/// Expired variant used to clear a session cookie
fn clear_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

fn invalid(errors: validator::ValidationErrors) -> ApiError {
    ApiError::Validation(errors.to_string())
}

/// Register endpoint: multipart form with text fields plus an avatar file
/// (required) and a cover image (optional)
async fn register(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AccountView>)> {
    let mut username = None;
    let mut email = None;
    let mut full_name = None;
    let mut password = None;
    let mut avatar = None;
    let mut cover_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("username") => username = Some(read_text(field).await?),
            Some("email") => email = Some(read_text(field).await?),
            Some("fullName") => full_name = Some(read_text(field).await?),
            Some("password") => password = Some(read_text(field).await?),
            Some("avatar") => avatar = Some(read_file(field).await?),
            Some("coverImage") => cover_image = Some(read_file(field).await?),
            _ => {}
        }
    }

    let registration = Registration {
        username: username
            .ok_or_else(|| ApiError::Validation("username is required".to_string()))?,
        email: email.ok_or_else(|| ApiError::Validation("email is required".to_string()))?,
        full_name: full_name
            .ok_or_else(|| ApiError::Validation("fullName is required".to_string()))?,
        password: password
            .ok_or_else(|| ApiError::Validation("password is required".to_string()))?,
    };
    registration.validate().map_err(invalid)?;

    let avatar =
        avatar.ok_or_else(|| ApiError::Validation("avatar image is required".to_string()))?;

    let avatar_url = ctx.media.upload(avatar).await?.url;
    let cover_image_url = match cover_image {
        Some(file) => Some(ctx.media.upload(file).await?.url),
        None => None,
    };

    let view = ctx
        .accounts
        .register(NewAccount {
            registration,
            avatar_url,
            cover_image_url,
        })
        .await?;

    tracing::info!("registered account {}", view.username);

    Ok((StatusCode::CREATED, Json(view)))
}

/// Login endpoint: email-or-username plus password, tokens delivered as
/// cookies and in the body
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let identifier = [req.username, req.email]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("email or username is required".to_string()))?;
    let password = req
        .password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("password is required".to_string()))?;

    let (user, pair) = ctx.accounts.login(&identifier, &password).await?;

    tracing::info!("account {} logged in", user.username);

    let jar = jar
        .add(token_cookie("accessToken", pair.access_token.clone()))
        .add(token_cookie("refreshToken", pair.refresh_token.clone()));

    Ok((
        jar,
        Json(SessionResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// Logout endpoint: clears the stored refresh token and both cookies
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<serde_json::Value>)> {
    ctx.accounts.logout(&auth.account.id).await?;

    let jar = jar
        .remove(clear_cookie("accessToken"))
        .remove(clear_cookie("refreshToken"));

    Ok((jar, Json(serde_json::json!({ "message": "Logged out" }))))
}

/// Refresh endpoint: rotates the session from a refresh token presented via
/// cookie or request body
async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let presented = jar
        .get("refreshToken")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or_else(|| ApiError::Authentication("Missing refresh token".to_string()))?;

    let (user, pair) = ctx.accounts.refresh_session(&presented).await?;

    let jar = jar
        .add(token_cookie("accessToken", pair.access_token.clone()))
        .add(token_cookie("refreshToken", pair.refresh_token.clone()));

    Ok((
        jar,
        Json(SessionResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// Password change endpoint
async fn reset_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let old_password = req
        .old_password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("oldPassword is required".to_string()))?;
    let new_password = req
        .new_password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("newPassword is required".to_string()))?;

    ctx.accounts
        .change_password(&auth.account.id, &old_password, &new_password)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Password changed" })))
}

/// Current identity endpoint
async fn current_user(auth: AuthContext) -> Json<AccountView> {
    Json(auth.account)
}

/// Profile details update endpoint
async fn update_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<AccountView>> {
    req.validate().map_err(invalid)?;

    let view = ctx
        .accounts
        .update_details(&auth.account.id, &req.full_name, &req.email)
        .await?;

    Ok(Json(view))
}

/// Avatar update endpoint: upload the replacement first, then drop the
/// previous image
async fn update_avatar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<AccountView>> {
    let file = require_file(multipart, "avatar").await?;
    let previous = auth.account.avatar_url.clone();

    let stored = ctx.media.upload(file).await?;
    let view = ctx.accounts.set_avatar(&auth.account.id, &stored.url).await?;

    // The replacement is in place; losing the old object is recoverable
    if let Err(e) = ctx.media.delete(&previous).await {
        tracing::warn!("failed to delete previous avatar {}: {}", previous, e);
    }

    Ok(Json(view))
}

/// Cover image update endpoint
async fn update_cover_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<AccountView>> {
    let file = require_file(multipart, "coverImage").await?;
    let previous = auth.account.cover_image_url.clone();

    let stored = ctx.media.upload(file).await?;
    let view = ctx
        .accounts
        .set_cover_image(&auth.account.id, &stored.url)
        .await?;

    if let Some(previous) = previous {
        if let Err(e) = ctx.media.delete(&previous).await {
            tracing::warn!("failed to delete previous cover image {}: {}", previous, e);
        }
    }

    Ok(Json(view))
}

/// Channel profile endpoint; subscription state is relative to the viewer,
/// if one is authenticated
async fn channel_profile(
    State(ctx): State<AppContext>,
    Path(username): Path<String>,
    viewer: OptionalAuthContext,
) -> ApiResult<Json<ChannelProfile>> {
    let viewer_id = viewer.auth.as_ref().map(|a| a.account.id.as_str());
    let profile = ctx.channels.channel_profile(&username, viewer_id).await?;

    Ok(Json(profile))
}

/// Watch history endpoint
async fn watch_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<WatchHistoryEntry>>> {
    let history = ctx.channels.watch_history(&auth.account.id).await?;

    Ok(Json(history))
}

/// Read a text field from a multipart form
async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart field: {}", e)))
}

/// Read a file field from a multipart form into an [`UploadedFile`]
async fn read_file(field: axum::extract::multipart::Field<'_>) -> ApiResult<UploadedFile> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart field: {}", e)))?
        .to_vec();

    Ok(UploadedFile {
        file_name,
        content_type,
        data,
    })
}

/// Pull a single named file out of a multipart body
async fn require_file(mut multipart: Multipart, name: &str) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(name) {
            return read_file(field).await;
        }
    }

    Err(ApiError::Validation(format!("{} image is required", name)))
}
