/// API routes and handlers
pub mod media;
pub mod middleware;
pub mod user;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .nest("/api/v1/users", user::routes())
        .merge(media::routes())
}
