//! Session layer configuration and typed session accessors.

use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::domain::entities::UserInfo;
use crate::error::AppError;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "blog_session";

/// Idle time after which a session expires.
const SESSION_IDLE_SECONDS: i64 = 30 * 60;

/// Logged-in user.
pub const USER_INFO_KEY: &str = "user_info";
/// Private half of the login challenge key pair.
pub const PRIVATE_KEY_KEY: &str = "private_key";
/// Expected captcha code.
pub const CAPTCHA_KEY: &str = "valid";

/// Builds the session layer over any store.
///
/// Production uses the PostgreSQL store; tests pass a `MemoryStore`.
pub fn create_session_layer<S>(store: S, secure: bool) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(SESSION_IDLE_SECONDS)))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Returns the logged-in user, if any.
pub async fn current_user(session: &Session) -> Result<Option<UserInfo>, AppError> {
    Ok(session.get::<UserInfo>(USER_INFO_KEY).await?)
}

/// Stores the logged-in user under a fresh session id.
pub async fn sign_in(session: &Session, user: &UserInfo) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(USER_INFO_KEY, user).await?;
    Ok(())
}
