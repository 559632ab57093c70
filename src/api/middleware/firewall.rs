//! IP firewall middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::ClientIp;

/// Rejects requests from denied addresses and deny areas.
///
/// Whitelisted addresses always pass. Blocked requests get
/// `403 Forbidden` with the standard error body.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .merge(routes)
///     .layer(middleware::from_fn_with_state(state.clone(), firewall::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    ClientIp(ip): ClientIp,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if st.firewall.is_blocked(ip) {
        info!(%ip, path = %req.uri().path(), "Request blocked by firewall");
        metrics::counter!("firewall_denied_total").increment(1);

        return Err(AppError::forbidden(
            "Access denied",
            json!({"ip": ip.to_string()}),
        ));
    }

    Ok(next.run(req).await)
}
