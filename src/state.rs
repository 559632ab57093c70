//! Shared application state injected into every handler.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use std::sync::Arc;

use crate::application::services::{FirewallService, UserService, VariableService};
use crate::domain::jobs::JobQueue;
use crate::domain::repositories::{UserRepository, VariableRepository};
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::geo::IpLocator;
use crate::infrastructure::settings::SystemSettings;
use crate::security::CaptchaRenderer;
use crate::utils::watermark::Watermarker;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService<dyn UserRepository>>,
    pub variable_service: Arc<VariableService<dyn VariableRepository>>,
    pub firewall: Arc<FirewallService>,
    pub locator: Arc<IpLocator>,
    pub settings: Arc<SystemSettings>,
    pub cache: Arc<dyn CacheService>,
    pub jobs: JobQueue,
    /// `None` when no font is available to draw captcha images.
    pub captcha: Option<Arc<dyn CaptchaRenderer>>,
    /// Stamps uploaded images with the `Watermark` setting.
    pub watermarker: Arc<Watermarker>,
    /// Signs and encrypts private cookies.
    pub cookie_key: Key,
    /// Read client addresses from forwarding headers.
    pub behind_proxy: bool,
    pub secure_cookies: bool,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
