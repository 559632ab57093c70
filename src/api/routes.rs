//! API route configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::api::handlers::passport::{
    check_validate_code, get_user_info, login, login_page, logout, logout_redirect, validate_code,
};
use crate::api::handlers::{delete_variable, list_variables, save_variable};
use crate::api::middleware::{admin, distributed_lock};
use crate::state::AppState;

/// Login and session routes, nested under `/passport`.
///
/// # Endpoints
///
/// - `GET  /login`             - Login page (or redirect when already logged in)
/// - `POST /login`             - Credential check (locked)
/// - `GET  /validatecode`      - Captcha image
/// - `POST /checkvalidatecode` - Captcha pre-check (locked)
/// - `GET  /getuserinfo`       - Current session user
/// - `GET  /logout`            - Log out and redirect home
/// - `POST /logout`            - Log out
pub fn passport_routes(state: AppState) -> Router<AppState> {
    let locked = Router::new()
        .route("/login", post(login))
        .route("/checkvalidatecode", post(check_validate_code))
        .route_layer(middleware::from_fn_with_state(
            state,
            distributed_lock::layer,
        ));

    Router::new()
        .route("/login", get(login_page))
        .route("/validatecode", get(validate_code))
        .route("/getuserinfo", get(get_user_info))
        .route("/logout", get(logout_redirect).post(logout))
        .merge(locked)
}

/// Variable administration, nested under `/values`. Admin session required.
///
/// # Endpoints
///
/// - `GET  /list` - All variables
/// - `POST /`     - Upsert by key (locked)
/// - `POST /{id}` - Delete by id (locked)
pub fn variable_routes(state: AppState) -> Router<AppState> {
    let locked = Router::new()
        .route("/", post(save_variable))
        .route("/{id}", post(delete_variable))
        .route_layer(middleware::from_fn_with_state(
            state,
            distributed_lock::layer,
        ));

    Router::new()
        .route("/list", get(list_variables))
        .merge(locked)
        .route_layer(middleware::from_fn(admin::layer))
}
