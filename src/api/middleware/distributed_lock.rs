//! Per-client request lock for mutating endpoints.

use axum::{
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::dto::ResultData;
use crate::infrastructure::cache::CacheService;
use crate::security::csrf::generate_token;
use crate::state::AppState;
use crate::utils::ClientIp;

/// Upper bound on how long a crashed request can hold its lock.
const LOCK_TTL: Duration = Duration::from_secs(30);

pub fn lock_key(method: &str, path: &str, ip: &str) -> String {
    format!("lock:{method}:{path}:{ip}")
}

/// A lock taken by one request, identified by a random owner token.
struct HeldLock {
    cache: Arc<dyn CacheService>,
    key: String,
    token: String,
}

impl HeldLock {
    /// Returns `None` when another request holds the key.
    async fn acquire(cache: Arc<dyn CacheService>, key: String, ttl: Duration) -> Option<Self> {
        let token = generate_token();
        let acquired = match cache.try_lock(&key, &token, ttl).await {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!("Lock backend error for {}: {}", key, e);
                true
            }
        };
        acquired.then_some(Self { cache, key, token })
    }

    /// Leaves the key alone once it has lapsed and been taken by someone else.
    async fn release(self) -> bool {
        match self.cache.release_lock(&self.key, &self.token).await {
            Ok(true) => true,
            Ok(false) => {
                debug!(key = %self.key, "Lock expired before release");
                false
            }
            Err(e) => {
                warn!("Failed to release lock {}: {}", self.key, e);
                false
            }
        }
    }
}

/// Serializes identical requests from one client.
///
/// Takes `lock:<method>:<path>:<ip>` in the shared cache for the duration of
/// the request. A concurrent duplicate gets `429 Too Many Requests`.
///
/// # Example
///
/// ```rust,ignore
/// let locked = Router::new()
///     .route("/login", post(login))
///     .route_layer(middleware::from_fn_with_state(state.clone(), distributed_lock::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    ClientIp(ip): ClientIp,
    req: Request,
    next: Next,
) -> Response {
    // nested routers strip their prefix from the request URI
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let key = lock_key(req.method().as_str(), &path, &ip.to_string());

    let Some(lock) = HeldLock::acquire(st.cache.clone(), key.clone(), LOCK_TTL).await else {
        debug!(%key, "Request lock contended");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            ResultData::fail("Too many requests, please retry later"),
        )
            .into_response();
    };

    let response = next.run(req).await;

    lock.release().await;

    response
}
