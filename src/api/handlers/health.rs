//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: Database, cache or job queue degraded
///
/// # Components Checked
///
/// 1. **Database**: Counts users
/// 2. **Cache**: Backend ping
/// 3. **Job Queue**: Channel open, free slots
/// 4. **Geo**: Whether any geolocation database is loaded (informational)
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "cache": { "status": "ok", "message": "redis connected" },
///     "job_queue": { "status": "ok", "message": "Available: 1000/1000" },
///     "geo": { "status": "ok", "message": "Databases loaded" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;
    let job_queue = check_job_queue(&state);
    let geo = check_geo(&state);

    let all_healthy = database.is_ok() && cache.is_ok() && job_queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            cache,
            job_queue,
            geo,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    if state.user_service.health_check().await {
        CheckStatus::ok("Connected")
    } else {
        CheckStatus::error("Database query failed")
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    let backend = state.cache.backend();
    if state.cache.health_check().await {
        CheckStatus::ok(format!("{backend} connected"))
    } else {
        CheckStatus::error(format!("{backend} connection failed"))
    }
}

fn check_job_queue(state: &AppState) -> CheckStatus {
    if state.jobs.is_closed() {
        CheckStatus::error("Job queue is closed")
    } else {
        CheckStatus::ok(format!(
            "Available: {}/{}",
            state.jobs.available(),
            state.jobs.max_capacity()
        ))
    }
}

/// Missing databases degrade lookups to "unknown" but don't fail the check.
fn check_geo(state: &AppState) -> CheckStatus {
    if state.locator.is_loaded() {
        CheckStatus::ok("Databases loaded")
    } else {
        CheckStatus::ok("No databases loaded, locations resolve as unknown")
    }
}
