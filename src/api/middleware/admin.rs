//! Admin session guard.

use axum::{
    extract::{OriginalUri, Request},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::api::middleware::session::current_user;
use crate::error::AppError;

/// Requires an admin in the session.
///
/// # Behavior
///
/// - No user: `GET` requests redirect to `/passport/login?from=<path>`,
///   other methods get `401 Unauthorized`
/// - Non-admin user: `403 Forbidden`
///
/// # Example
///
/// ```rust,ignore
/// let admin = Router::new()
///     .route("/values/list", get(list_variables))
///     .route_layer(middleware::from_fn(admin::layer));
/// ```
pub async fn layer(session: Session, req: Request, next: Next) -> Result<Response, AppError> {
    let Some(user) = current_user(&session).await? else {
        if req.method() == Method::GET {
            let uri = req
                .extensions()
                .get::<OriginalUri>()
                .map(|original| original.0.clone())
                .unwrap_or_else(|| req.uri().clone());
            let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
            let target = format!("/passport/login?from={}", urlencoding::encode(path));
            return Ok(Redirect::to(&target).into_response());
        }

        return Err(AppError::unauthorized(
            "Login required",
            json!({"reason": "No user in session"}),
        ));
    };

    if !user.is_admin {
        return Err(AppError::forbidden(
            "Admin access required",
            json!({"user": user.username}),
        ));
    }

    Ok(next.run(req).await)
}
